use thiserror::Error;

/// Errors surfaced by task scheduling and delivery.
///
/// `Transport` and `Remote` are the transient kinds the retry wrapper is
/// allowed to retry; everything else is fatal on first occurrence. The
/// only swallowed outcome in the whole crate is the blocked-remote-task
/// no-op, which is logged and reported as a success variant, never as an
/// error.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("maximum number of tasks in batch cannot exceed 1000 (got {0})")]
    BatchTooLarge(usize),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote queue returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Task scheduling limit exhausted: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<DispatchError>,
    },

    #[error("body decode error: {0}")]
    Decode(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("handler secret mismatch")]
    Unauthorized,

    #[error("task failed: {0}")]
    Task(String),

    #[error("batch request failed: {0}")]
    Batch(String),
}
