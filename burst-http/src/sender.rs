use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use typed_builder::TypedBuilder;

use crate::error::RequestFailure;

/// The one capability the dispatcher needs: GET a URL, get back the
/// decoded JSON body or the reason it could not be had.
///
/// Implementations are shared by every request of a bucket and must be
/// safe to call concurrently.
pub trait RequestSender: Send + Sync + 'static {
    fn send(&self, url: &str) -> impl Future<Output = Result<Value, RequestFailure>> + Send;
}

/// [`RequestSender`] backed by a pooled `reqwest` client.
#[derive(Clone, Debug, TypedBuilder)]
pub struct HttpSender {
    #[builder(default = Client::new())]
    pub client: Client,

    /// Per-request deadline. Without one a hung request stalls its bucket.
    #[builder(default = None)]
    pub timeout: Option<Duration>,
}

impl RequestSender for HttpSender {
    async fn send(&self, url: &str) -> Result<Value, RequestFailure> {
        let mut req = self.client.get(url);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let res = req
            .send()
            .await
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(RequestFailure::Status(status.as_u16()));
        }

        let body = res
            .bytes()
            .await
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| RequestFailure::Decode(e.to_string()))
    }
}
