//! Backend submission errors.

/// Errors surfaced by the provisioning backend at submission time.
///
/// These are synchronous rejections only; failures of the asynchronous
/// work itself arrive as lifecycle events, never as errors here.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The backend rejected the request.
    #[error("Submission rejected: {message}")]
    Rejected {
        /// Backend-supplied rejection reason.
        message: String,
    },

    /// The referenced stack is unknown to the backend.
    #[error("Unknown stack: {stack_id}")]
    UnknownStack {
        /// The stack id that could not be resolved.
        stack_id: String,
    },

    /// The backend could not be reached.
    #[error("Backend unavailable: {message}")]
    Unavailable {
        /// Description of the connectivity failure.
        message: String,
    },
}

impl SubmissionError {
    /// Creates a new `Rejected` error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownStack` error.
    #[must_use]
    pub fn unknown_stack(stack_id: impl Into<String>) -> Self {
        Self::UnknownStack {
            stack_id: stack_id.into(),
        }
    }

    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns `true` if the backend rejected the request outright.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}
