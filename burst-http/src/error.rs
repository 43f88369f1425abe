use std::path::PathBuf;

/// Errors that stop plan construction or plan persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The rate spec or a generator argument is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Reading or writing a plan file failed.
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A plan could not be encoded as JSON.
    #[error("failed to encode plan for {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A plan file is not a JSON array of arrays of URLs.
    #[error("malformed plan in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single dispatched request did not produce a decoded body.
///
/// These never abort a bucket or a run; they are recorded next to the
/// target that produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestFailure {
    /// Connection, TLS or timeout error reported by the client.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-2xx status.
    #[error("unexpected status {0}")]
    Status(u16),
    /// The body was not valid JSON.
    #[error("undecodable body: {0}")]
    Decode(String),
    /// The dispatch task died before reporting.
    #[error("dispatch aborted: {0}")]
    Aborted(String),
}
