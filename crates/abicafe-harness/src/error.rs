//! Harness error types.

use abicafe_capture::{CaptureError, Representation, UsageFault};
use abicafe_caller::CallerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("usage fault: {0}")]
    Usage(#[from] UsageFault),
    #[error("caller: {0}")]
    Caller(#[from] CallerError),
    #[error("no callee exported for {signature} ({representation})")]
    MissingCallee {
        signature: String,
        representation: Representation,
    },
    #[error("no caller compiled for {signature} ({representation})")]
    MissingCaller {
        signature: String,
        representation: Representation,
    },
    #[error("test {test}: configured signature {signature} does not match the compiled fixture")]
    SignatureMismatch { test: String, signature: String },
    #[error("unknown signature {0}")]
    UnknownSignature(String),
    #[error("unknown test {0}")]
    UnknownTest(String),
    #[error("unknown variant {0}")]
    UnknownVariant(String),
    #[error("invalid expectation pattern {pattern:?}: {reason}")]
    InvalidExpectation { pattern: String, reason: String },
}

impl MatrixError {
    /// Whether this error is a link/symbol fault rather than an I/O or input problem.
    #[must_use]
    pub const fn is_symbol_fault(&self) -> bool {
        matches!(
            self,
            Self::MissingCallee { .. }
                | Self::MissingCaller { .. }
                | Self::SignatureMismatch { .. }
                | Self::Caller(_)
        )
    }
}
