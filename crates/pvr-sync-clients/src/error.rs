use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong talking to a PVR server. All variants are
/// fatal to the current run; callers abort on first error and rely on the
/// cache for cheap resumption.
#[derive(Debug, Error)]
pub enum PvrError {
    #[error("unsupported pvr type provided: {0:?}")]
    UnknownBackend(String),

    #[error("unsupported version of {backend} pvr: {version}")]
    IncompatibleVersion {
        backend: &'static str,
        version: String,
    },

    #[error("api key contains characters not valid in an http header")]
    InvalidApiKey,

    #[error("pvr client used before a successful initialize")]
    NotInitialized,

    #[error("request to {endpoint} failed after retries: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus {
        endpoint: String,
        status: StatusCode,
    },

    #[error("failed decoding response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("search failed with status {status:?}, message: {message:?}")]
    RemoteJobFailed { status: String, message: String },

    #[error("command {command_id} did not reach a terminal state before the deadline")]
    DeadlineExceeded { command_id: i64 },

    #[error("wait for command {command_id} was cancelled")]
    Cancelled { command_id: i64 },
}
