//! Capture error types.

use thiserror::Error;

use crate::buffer::BufferId;
use crate::call::CallPhase;

/// A programming error in a fixture or driver. Fatal for the affected call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageFault {
    #[error("write to {buffer} after its call was closed")]
    WriteAfterClose { buffer: BufferId },
    #[error("{buffer} closed twice")]
    DoubleClose { buffer: BufferId },
    #[error("close_call paired {inputs} with {outputs}")]
    MismatchedPair { inputs: BufferId, outputs: BufferId },
    #[error("{buffer} closed with {count} field record(s) not terminated by close_value")]
    DanglingRecords { buffer: BufferId, count: usize },
    #[error("write to {buffer} not permitted while the call is {phase}")]
    PhaseViolation { buffer: BufferId, phase: CallPhase },
    #[error("call finished while {phase}; the caller never closed it")]
    CallNotClosed { phase: CallPhase },
    #[error("a capture scope is already active on this thread")]
    NestedScope,
    #[error("unknown buffer id {raw}")]
    UnknownBuffer { raw: u32 },
}

/// Anything a [`CaptureSink`](crate::CaptureSink) can fail with.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Usage(#[from] UsageFault),
    #[error("capture sink io: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture stream line {line}: {source}")]
    Stream {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl CaptureError {
    /// The usage fault behind this error, if that is what it is.
    #[must_use]
    pub fn usage_fault(&self) -> Option<&UsageFault> {
        match self {
            Self::Usage(fault) => Some(fault),
            _ => None,
        }
    }
}
