//! In-memory capture of one call and its state machine.
//!
//! ```text
//! idle -> recording-inputs -> boundary-crossed -> recording-outputs -> closed
//! ```
//!
//! The caller's first input write enters `recording-inputs`, the first
//! callee-side operation crosses the boundary, the first caller output write
//! enters `recording-outputs`, and the caller's `close_call` ends the call.
//! Steps may be skipped (a callee with no arguments, an uninstrumented
//! callee) but never revisited.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buffer::{BufferId, CaptureBuffer, Side};
use crate::error::{CaptureError, UsageFault};
use crate::sink::CaptureSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallPhase {
    Idle,
    RecordingInputs,
    BoundaryCrossed,
    RecordingOutputs,
    Closed,
}

impl CallPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RecordingInputs => "recording-inputs",
            Self::BoundaryCrossed => "boundary-crossed",
            Self::RecordingOutputs => "recording-outputs",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four fresh buffers for exactly one call.
#[derive(Debug)]
pub struct CallCapture {
    caller_inputs: CaptureBuffer,
    caller_outputs: CaptureBuffer,
    callee_inputs: CaptureBuffer,
    callee_outputs: CaptureBuffer,
    phase: CallPhase,
}

impl Default for CallCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CallCapture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            caller_inputs: CaptureBuffer::new(BufferId::CallerInputs),
            caller_outputs: CaptureBuffer::new(BufferId::CallerOutputs),
            callee_inputs: CaptureBuffer::new(BufferId::CalleeInputs),
            callee_outputs: CaptureBuffer::new(BufferId::CalleeOutputs),
            phase: CallPhase::Idle,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> CallPhase {
        self.phase
    }

    #[must_use]
    pub const fn buffer(&self, id: BufferId) -> &CaptureBuffer {
        match id {
            BufferId::CallerInputs => &self.caller_inputs,
            BufferId::CallerOutputs => &self.caller_outputs,
            BufferId::CalleeInputs => &self.callee_inputs,
            BufferId::CalleeOutputs => &self.callee_outputs,
        }
    }

    fn buffer_mut(&mut self, id: BufferId) -> &mut CaptureBuffer {
        match id {
            BufferId::CallerInputs => &mut self.caller_inputs,
            BufferId::CallerOutputs => &mut self.caller_outputs,
            BufferId::CalleeInputs => &mut self.callee_inputs,
            BufferId::CalleeOutputs => &mut self.callee_outputs,
        }
    }

    fn advance(&mut self, buffer: BufferId) -> Result<(), UsageFault> {
        use CallPhase::{BoundaryCrossed, Closed, Idle, RecordingInputs, RecordingOutputs};

        let next = match (buffer, self.phase) {
            (_, Closed) => return Err(UsageFault::WriteAfterClose { buffer }),
            (BufferId::CallerInputs, Idle | RecordingInputs) => RecordingInputs,
            (
                BufferId::CalleeInputs | BufferId::CalleeOutputs,
                Idle | RecordingInputs | BoundaryCrossed,
            ) => BoundaryCrossed,
            (BufferId::CallerOutputs, Idle | RecordingInputs | BoundaryCrossed | RecordingOutputs) => {
                RecordingOutputs
            }
            (buffer, phase) => return Err(UsageFault::PhaseViolation { buffer, phase }),
        };
        self.phase = next;
        Ok(())
    }

    fn close_pair(&mut self, inputs: BufferId, outputs: BufferId) -> Result<(), UsageFault> {
        let same_side = inputs.side() == outputs.side();
        if !(inputs.is_inputs() && !outputs.is_inputs() && same_side) {
            return Err(UsageFault::MismatchedPair { inputs, outputs });
        }
        if self.phase == CallPhase::Closed {
            return Err(UsageFault::DoubleClose { buffer: inputs });
        }
        match inputs.side() {
            Side::Callee => {
                if self.phase == CallPhase::RecordingOutputs {
                    return Err(UsageFault::PhaseViolation {
                        buffer: inputs,
                        phase: self.phase,
                    });
                }
                self.buffer_mut(inputs).close()?;
                self.buffer_mut(outputs).close()?;
                self.phase = CallPhase::BoundaryCrossed;
            }
            Side::Caller => {
                self.buffer_mut(inputs).close()?;
                self.buffer_mut(outputs).close()?;
                self.phase = CallPhase::Closed;
            }
        }
        Ok(())
    }

    /// Consume the capture once the caller has closed the call.
    ///
    /// A callee that never closed its side is not a usage fault here; its
    /// buffers are handed over as they are and the comparator reports the gap.
    pub fn finish(self) -> Result<CallRecord, UsageFault> {
        if self.phase != CallPhase::Closed {
            return Err(UsageFault::CallNotClosed { phase: self.phase });
        }
        Ok(CallRecord {
            caller_inputs: self.caller_inputs,
            caller_outputs: self.caller_outputs,
            callee_inputs: self.callee_inputs,
            callee_outputs: self.callee_outputs,
        })
    }
}

impl CaptureSink for CallCapture {
    fn append(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), CaptureError> {
        self.advance(buffer)?;
        self.buffer_mut(buffer).append(bytes)?;
        Ok(())
    }

    fn close_value(&mut self, buffer: BufferId) -> Result<(), CaptureError> {
        self.advance(buffer)?;
        self.buffer_mut(buffer).close_value()?;
        Ok(())
    }

    fn close_call(&mut self, inputs: BufferId, outputs: BufferId) -> Result<(), CaptureError> {
        self.close_pair(inputs, outputs)?;
        Ok(())
    }
}

/// The read-only result of one call: what each side sent and received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub caller_inputs: CaptureBuffer,
    pub caller_outputs: CaptureBuffer,
    pub callee_inputs: CaptureBuffer,
    pub callee_outputs: CaptureBuffer,
}

impl CallRecord {
    #[must_use]
    pub const fn buffer(&self, id: BufferId) -> &CaptureBuffer {
        match id {
            BufferId::CallerInputs => &self.caller_inputs,
            BufferId::CallerOutputs => &self.caller_outputs,
            BufferId::CalleeInputs => &self.callee_inputs,
            BufferId::CalleeOutputs => &self.callee_outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(err: CaptureError) -> UsageFault {
        err.usage_fault().cloned().expect("usage fault")
    }

    fn record_one(cap: &mut CallCapture, buffer: BufferId, bytes: &[u8]) {
        cap.append(buffer, bytes).unwrap();
        cap.close_value(buffer).unwrap();
    }

    #[test]
    fn full_call_walks_every_phase() {
        let mut cap = CallCapture::new();
        assert_eq!(cap.phase(), CallPhase::Idle);

        record_one(&mut cap, BufferId::CallerInputs, &[1, 2]);
        assert_eq!(cap.phase(), CallPhase::RecordingInputs);

        record_one(&mut cap, BufferId::CalleeInputs, &[1, 2]);
        assert_eq!(cap.phase(), CallPhase::BoundaryCrossed);
        record_one(&mut cap, BufferId::CalleeOutputs, &[7]);
        cap.close_call(BufferId::CalleeInputs, BufferId::CalleeOutputs)
            .unwrap();
        assert_eq!(cap.phase(), CallPhase::BoundaryCrossed);

        record_one(&mut cap, BufferId::CallerOutputs, &[7]);
        assert_eq!(cap.phase(), CallPhase::RecordingOutputs);
        cap.close_call(BufferId::CallerInputs, BufferId::CallerOutputs)
            .unwrap();
        assert_eq!(cap.phase(), CallPhase::Closed);

        let record = cap.finish().unwrap();
        assert!(BufferId::ALL.iter().all(|id| record.buffer(*id).is_closed()));
        assert_eq!(record.callee_inputs.shape(), vec![vec![2]]);
    }

    #[test]
    fn caller_inputs_after_boundary_is_a_phase_violation() {
        let mut cap = CallCapture::new();
        record_one(&mut cap, BufferId::CalleeInputs, &[0]);
        let err = usage(cap.append(BufferId::CallerInputs, &[0]).unwrap_err());
        assert_eq!(
            err,
            UsageFault::PhaseViolation {
                buffer: BufferId::CallerInputs,
                phase: CallPhase::BoundaryCrossed
            }
        );
    }

    #[test]
    fn callee_write_after_return_is_a_phase_violation() {
        let mut cap = CallCapture::new();
        record_one(&mut cap, BufferId::CallerOutputs, &[0]);
        let err = usage(cap.append(BufferId::CalleeOutputs, &[0]).unwrap_err());
        assert!(matches!(err, UsageFault::PhaseViolation { .. }));
    }

    #[test]
    fn write_after_close_and_double_close_are_faults() {
        let mut cap = CallCapture::new();
        cap.close_call(BufferId::CallerInputs, BufferId::CallerOutputs)
            .unwrap();
        assert_eq!(
            usage(cap.append(BufferId::CallerOutputs, &[1]).unwrap_err()),
            UsageFault::WriteAfterClose {
                buffer: BufferId::CallerOutputs
            }
        );
        assert_eq!(
            usage(
                cap.close_call(BufferId::CallerInputs, BufferId::CallerOutputs)
                    .unwrap_err()
            ),
            UsageFault::DoubleClose {
                buffer: BufferId::CallerInputs
            }
        );
    }

    #[test]
    fn callee_cannot_write_after_closing_its_pair() {
        let mut cap = CallCapture::new();
        cap.close_call(BufferId::CalleeInputs, BufferId::CalleeOutputs)
            .unwrap();
        assert_eq!(
            usage(cap.append(BufferId::CalleeInputs, &[1]).unwrap_err()),
            UsageFault::WriteAfterClose {
                buffer: BufferId::CalleeInputs
            }
        );
    }

    #[test]
    fn mismatched_pairs_are_rejected() {
        let mut cap = CallCapture::new();
        for (inputs, outputs) in [
            (BufferId::CallerInputs, BufferId::CalleeOutputs),
            (BufferId::CallerOutputs, BufferId::CallerInputs),
            (BufferId::CalleeInputs, BufferId::CalleeInputs),
        ] {
            assert_eq!(
                usage(cap.close_call(inputs, outputs).unwrap_err()),
                UsageFault::MismatchedPair { inputs, outputs }
            );
        }
        assert_eq!(cap.phase(), CallPhase::Idle);
    }

    #[test]
    fn unfinished_call_cannot_be_taken() {
        let mut cap = CallCapture::new();
        record_one(&mut cap, BufferId::CallerInputs, &[1]);
        assert_eq!(
            cap.finish().unwrap_err(),
            UsageFault::CallNotClosed {
                phase: CallPhase::RecordingInputs
            }
        );
    }

    #[test]
    fn uninstrumented_callee_still_yields_a_record() {
        let mut cap = CallCapture::new();
        record_one(&mut cap, BufferId::CallerInputs, &[1]);
        record_one(&mut cap, BufferId::CallerOutputs, &[2]);
        cap.close_call(BufferId::CallerInputs, BufferId::CallerOutputs)
            .unwrap();
        let record = cap.finish().unwrap();
        assert!(record.callee_inputs.values().is_empty());
        assert!(!record.callee_inputs.is_closed());
    }
}
