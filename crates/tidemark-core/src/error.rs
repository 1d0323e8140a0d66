use thiserror::Error;

/// Errors from the Sum/Calendar binary codec.
///
/// Decoding a persisted blob must never panic: truncated or tampered input
/// surfaces as [`SummaryError::Decode`] or [`SummaryError::Corrupt`] and is
/// handled by the rollup/read caller.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary encode error: {0}")]
    Encode(#[source] bincode::Error),

    #[error("summary decode error: {0}")]
    Decode(#[source] bincode::Error),

    #[error("corrupt calendar blob: {0}")]
    Corrupt(String),
}
