//! Byte-exact comparison of a captured call.
//!
//! Buffers are matched positionally: value `i`, field `j` on the sending side
//! against value `i`, field `j` on the receiving side. Every difference is
//! collected, never just the first.

use std::fmt;

use abicafe_capture::hex;
use abicafe_capture::{BufferId, CallRecord, CaptureBuffer, PointerCapture};
use serde::{Deserialize, Serialize};

use crate::fixtures::{Shape, Signature};

/// Which pair of buffers a mismatch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferPair {
    /// CALLER_INPUTS (expected) vs CALLEE_INPUTS (actual).
    Inputs,
    /// CALLEE_OUTPUTS (expected) vs CALLER_OUTPUTS (actual).
    Outputs,
}

impl BufferPair {
    pub const ALL: [Self; 2] = [Self::Inputs, Self::Outputs];

    /// The sending side, whose bytes are authoritative.
    #[must_use]
    pub const fn expected(self) -> BufferId {
        match self {
            Self::Inputs => BufferId::CallerInputs,
            Self::Outputs => BufferId::CalleeOutputs,
        }
    }

    /// The receiving side.
    #[must_use]
    pub const fn actual(self) -> BufferId {
        match self {
            Self::Inputs => BufferId::CalleeInputs,
            Self::Outputs => BufferId::CallerOutputs,
        }
    }

    #[must_use]
    pub const fn of(buffer: BufferId) -> Self {
        if buffer.is_inputs() {
            Self::Inputs
        } else {
            Self::Outputs
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inputs => "inputs",
            Self::Outputs => "outputs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchClass {
    /// Counts or lengths differ.
    Structural,
    /// Same shape, different bytes.
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchKind {
    ValueCount {
        expected: usize,
        actual: usize,
    },
    FieldCount {
        value: usize,
        expected: usize,
        actual: usize,
    },
    FieldLength {
        value: usize,
        field: usize,
        expected: usize,
        actual: usize,
    },
    Content {
        value: usize,
        field: usize,
        /// First differing byte.
        offset: usize,
        #[serde(with = "abicafe_capture::hex")]
        expected: Vec<u8>,
        #[serde(with = "abicafe_capture::hex")]
        actual: Vec<u8>,
    },
    /// A buffer does not have the shape its signature implies.
    Shape {
        buffer: BufferId,
        expected: Shape,
        actual: Shape,
    },
}

/// One difference between the two sides of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub pair: BufferPair,
    #[serde(flatten)]
    pub kind: MismatchKind,
}

impl Mismatch {
    #[must_use]
    pub const fn class(&self) -> MismatchClass {
        match self.kind {
            MismatchKind::Content { .. } => MismatchClass::Content,
            _ => MismatchClass::Structural,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (exp, act) = (self.pair.expected(), self.pair.actual());
        match &self.kind {
            MismatchKind::ValueCount { expected, actual } => write!(
                f,
                "{exp} has {expected} value(s), {act} has {actual}"
            ),
            MismatchKind::FieldCount {
                value,
                expected,
                actual,
            } => write!(
                f,
                "value {value}: {exp} has {expected} field(s), {act} has {actual}"
            ),
            MismatchKind::FieldLength {
                value,
                field,
                expected,
                actual,
            } => write!(
                f,
                "value {value} field {field}: {exp} is {expected} byte(s), {act} is {actual}"
            ),
            MismatchKind::Content {
                value,
                field,
                offset,
                expected,
                actual,
            } => write!(
                f,
                "value {value} field {field} byte {offset}: {exp}={} {act}={}",
                hex::encode(expected),
                hex::encode(actual)
            ),
            MismatchKind::Shape {
                buffer,
                expected,
                actual,
            } => write!(f, "{buffer} shape {actual:?}, signature implies {expected:?}"),
        }
    }
}

/// The shapes a well-formed call of some signature must produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedShape {
    pub inputs: Shape,
    pub outputs: Shape,
}

impl ExpectedShape {
    #[must_use]
    pub fn of(signature: &Signature, mode: PointerCapture) -> Self {
        Self {
            inputs: signature.input_shape(mode),
            outputs: signature.output_shape(),
        }
    }

    fn for_buffer(&self, buffer: BufferId) -> &Shape {
        if buffer.is_inputs() {
            &self.inputs
        } else {
            &self.outputs
        }
    }
}

fn first_diff_offset(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected
        .iter()
        .zip(actual)
        .position(|(a, b)| a != b)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())))
}

/// Compare one buffer pair, collecting every mismatch.
#[must_use]
pub fn compare_buffers(
    pair: BufferPair,
    expected: &CaptureBuffer,
    actual: &CaptureBuffer,
) -> Vec<Mismatch> {
    let mut out = Vec::new();
    let mut push = |kind| out.push(Mismatch { pair, kind });

    let (exp_values, act_values) = (expected.values(), actual.values());
    if exp_values.len() != act_values.len() {
        push(MismatchKind::ValueCount {
            expected: exp_values.len(),
            actual: act_values.len(),
        });
    }

    for (value, (exp, act)) in exp_values.iter().zip(act_values).enumerate() {
        if exp.records.len() != act.records.len() {
            push(MismatchKind::FieldCount {
                value,
                expected: exp.records.len(),
                actual: act.records.len(),
            });
        }
        for (field, (e, a)) in exp.records.iter().zip(&act.records).enumerate() {
            if e.len() != a.len() {
                push(MismatchKind::FieldLength {
                    value,
                    field,
                    expected: e.len(),
                    actual: a.len(),
                });
            } else if let Some(offset) = first_diff_offset(&e.bytes, &a.bytes) {
                push(MismatchKind::Content {
                    value,
                    field,
                    offset,
                    expected: e.bytes.clone(),
                    actual: a.bytes.clone(),
                });
            }
        }
    }
    out
}

/// Compare every buffer of a call and, when given, check each against the
/// shape its signature implies.
#[must_use]
pub fn compare_call(record: &CallRecord, shape: Option<&ExpectedShape>) -> Vec<Mismatch> {
    let mut out = Vec::new();
    if let Some(shape) = shape {
        for buffer in BufferId::ALL {
            let expected = shape.for_buffer(buffer);
            let actual = record.buffer(buffer).shape();
            if &actual != expected {
                out.push(Mismatch {
                    pair: BufferPair::of(buffer),
                    kind: MismatchKind::Shape {
                        buffer,
                        expected: expected.clone(),
                        actual,
                    },
                });
            }
        }
    }
    for pair in BufferPair::ALL {
        out.extend(compare_buffers(
            pair,
            record.buffer(pair.expected()),
            record.buffer(pair.actual()),
        ));
    }
    out
}

/// Counts by class.
#[must_use]
pub fn classify(mismatches: &[Mismatch]) -> (usize, usize) {
    let structural = mismatches
        .iter()
        .filter(|m| m.class() == MismatchClass::Structural)
        .count();
    (structural, mismatches.len() - structural)
}
