//! Error taxonomy shared by the execution and generation clients.
//!
//! Every backend or transport failure is converted into one of these kinds at the
//! client boundary. Each variant carries a detail string that is safe to show to the
//! user as-is. Nothing here is retried automatically; the caller decides whether to
//! re-initiate the operation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Local validation failure, never reaches the network
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
    #[error("Polling failed: {0}")]
    PollFailed(String),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Code generation failed: {0}")]
    GenerationFailed(String),
    #[error("Code explanation failed: {0}")]
    ExplanationFailed(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Cancelled before a result was available")]
    Cancelled,
    #[error("The same operation is already in progress")]
    RunInProgress,
    #[error("Configuration error: {0}")]
    Config(String),
}
