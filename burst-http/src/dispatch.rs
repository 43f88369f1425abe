//! Bucket-by-bucket execution of a request plan.
//!
//! # Flow per bucket
//! 1. Every target of the bucket is spawned as its own tokio task, all at
//!    once. With `max_in_flight` set, tasks additionally wait on a
//!    per-bucket semaphore, which trades burst fidelity for safety.
//! 2. The engine joins every task. This is the barrier: bucket `n + 1` is
//!    never dispatched before all of bucket `n` has resolved.
//! 3. Wall time from the first spawn to the end of the join is recorded in
//!    a [`BucketResult`] together with one [`RequestOutcome`] per target.
//!
//! A failed request is recorded and never retried or escalated. Cancelling
//! through a [`CancelHandle`] stops the run before the next bucket; requests
//! already in flight always drain.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use typed_builder::TypedBuilder;

use crate::error::RequestFailure;
use crate::plan::{Bucket, RequestPlan};
use crate::report::{RequestMetric, RunAggregate};
use crate::sender::RequestSender;
use karga::Aggregate;

/// What happened to one target.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOutcome {
    pub target: String,
    pub latency: Duration,
    pub result: Result<Value, RequestFailure>,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn metric(&self) -> RequestMetric {
        match self.result {
            Ok(_) => RequestMetric::Success(self.latency),
            Err(_) => RequestMetric::Failure,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BucketResult {
    /// Position of the bucket in the plan.
    pub index: usize,
    pub elapsed: Duration,
    /// In the bucket's target order.
    pub outcomes: Vec<RequestOutcome>,
}

impl BucketResult {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Run-level stop flag, checked only between buckets.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Executes buckets strictly one after another, fanning each bucket out
/// in full.
///
/// ```no_run
/// # async fn run() -> burst_http::Result<()> {
/// use std::sync::Arc;
/// use burst_http::{DispatchEngine, HttpSender, PlanBuilder, RateSpec};
///
/// let spec = RateSpec::builder()
///     .base_url("http://localhost:3000")
///     .mean_requests(100)
///     .duration_secs(10)
///     .build();
/// let engine = DispatchEngine::builder()
///     .sender(Arc::new(HttpSender::builder().build()))
///     .build();
/// let results = engine.execute(PlanBuilder::new(spec)?.build()?).await;
/// assert_eq!(results.len(), 10);
/// # Ok(())
/// # }
/// ```
#[derive(TypedBuilder)]
pub struct DispatchEngine<S: RequestSender> {
    sender: Arc<S>,

    /// Caps concurrent requests within a bucket. `None` fires every
    /// target of a bucket at once.
    #[builder(default = None)]
    max_in_flight: Option<NonZeroUsize>,

    #[builder(default)]
    cancel: CancelHandle,
}

impl<S: RequestSender> DispatchEngine<S> {
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Dispatches one bucket and waits for every request in it.
    pub async fn execute_bucket(&self, index: usize, bucket: Bucket) -> BucketResult {
        let limiter = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n.get())));
        tracing::debug!("Dispatching bucket {index} ({} requests)", bucket.len());

        let started = Instant::now();
        let (targets, handles): (Vec<_>, Vec<_>) = bucket
            .targets
            .into_iter()
            .map(|target| {
                let sender = Arc::clone(&self.sender);
                let limiter = limiter.clone();
                let url = target.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match limiter {
                        Some(limiter) => limiter.acquire_owned().await.ok(),
                        None => None,
                    };
                    let sent_at = Instant::now();
                    let result = sender.send(&url).await;
                    (sent_at.elapsed(), result)
                });
                (target, handle)
            })
            .unzip();

        let outcomes = join_all(handles)
            .await
            .into_iter()
            .zip(targets)
            .map(|(res, target)| {
                let (latency, result) = match res {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::error!("Dispatch task for {target} died: {e}");
                        (Duration::ZERO, Err(RequestFailure::Aborted(e.to_string())))
                    }
                };
                if let Err(e) = &result {
                    tracing::warn!("Request to {target} failed: {e}");
                }
                RequestOutcome {
                    target,
                    latency,
                    result,
                }
            })
            .collect();
        let elapsed = started.elapsed();

        tracing::debug!("Bucket {index} resolved in {elapsed:?}");
        BucketResult {
            index,
            elapsed,
            outcomes,
        }
    }

    /// Streams buckets through the engine, handing each result to
    /// `on_bucket` as soon as its barrier completes. Works with a lazy
    /// bucket producer as well as a loaded plan.
    pub async fn run<I, F>(&self, buckets: I, mut on_bucket: F) -> RunAggregate
    where
        I: IntoIterator<Item = Bucket>,
        F: FnMut(BucketResult),
    {
        let mut agg = RunAggregate::new();
        let started = Instant::now();
        tracing::info!("Starting run");

        for (index, bucket) in buckets.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("Run cancelled before bucket {index}");
                break;
            }
            let result = self.execute_bucket(index, bucket).await;
            agg.record_bucket(&result);
            on_bucket(result);
        }

        agg.wall_time = started.elapsed();
        tracing::info!("Run finished after {} buckets", agg.buckets);
        agg
    }

    /// Executes a whole plan and collects every bucket result.
    pub async fn execute(&self, plan: RequestPlan) -> Vec<BucketResult> {
        let mut results = Vec::with_capacity(plan.buckets.len());
        self.run(plan, |result| results.push(result)).await;
        results
    }
}
