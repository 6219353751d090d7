use thiserror::Error;

/// Failures a caller is expected to branch on.
///
/// Plumbing errors travel as `anyhow::Error`; this enum covers the cases that
/// change behavior: retrying a connection, skipping an utterance, or showing
/// a rejected input to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// Remote log unreachable or subscription lost (retry with backoff)
    #[error("connection error: {0}")]
    Connection(String),

    /// Speech engine failed on one utterance (skip it, keep draining)
    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    /// User input rejected
    #[error("{0}")]
    Validation(String),

    /// Local file or process I/O failed
    #[error("I/O error: {0}")]
    Io(String),

    /// The session actor is gone
    #[error("session closed")]
    SessionClosed,
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error should be shown to the user as a rejected input
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
