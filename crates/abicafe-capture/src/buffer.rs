//! Append-only capture buffers.
//!
//! A buffer holds an ordered list of value groups. Each group is the set of
//! field records written between two `close_value` calls, so a struct
//! argument keeps one record per field and a comparator can point at the
//! exact field that diverged.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UsageFault;

/// Which side of the call boundary produced a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Caller,
    Callee,
}

/// The four buffers of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BufferId {
    /// Arguments as the caller sent them.
    CallerInputs,
    /// Result as the caller received it.
    CallerOutputs,
    /// Arguments as the callee received them.
    CalleeInputs,
    /// Result as the callee produced it.
    CalleeOutputs,
}

impl BufferId {
    pub const ALL: [Self; 4] = [
        Self::CallerInputs,
        Self::CallerOutputs,
        Self::CalleeInputs,
        Self::CalleeOutputs,
    ];

    /// Stable label used in reports and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CallerInputs => "CALLER_INPUTS",
            Self::CallerOutputs => "CALLER_OUTPUTS",
            Self::CalleeInputs => "CALLEE_INPUTS",
            Self::CalleeOutputs => "CALLEE_OUTPUTS",
        }
    }

    #[must_use]
    pub const fn side(self) -> Side {
        match self {
            Self::CallerInputs | Self::CallerOutputs => Side::Caller,
            Self::CalleeInputs | Self::CalleeOutputs => Side::Callee,
        }
    }

    #[must_use]
    pub const fn is_inputs(self) -> bool {
        matches!(self, Self::CallerInputs | Self::CalleeInputs)
    }

    /// Numeric id used by the C-callable primitives.
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::CallerInputs => 0,
            Self::CallerOutputs => 1,
            Self::CalleeInputs => 2,
            Self::CalleeOutputs => 3,
        }
    }

    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::CallerInputs),
            1 => Some(Self::CallerOutputs),
            2 => Some(Self::CalleeInputs),
            3 => Some(Self::CalleeOutputs),
            _ => None,
        }
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured field: an immutable copy of raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRecord {
    #[serde(with = "crate::hex")]
    pub bytes: Vec<u8>,
}

impl ValueRecord {
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The field records of one logical value (argument or result).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueGroup {
    pub records: Vec<ValueRecord>,
}

impl ValueGroup {
    /// Build a group from raw field byte slices.
    #[must_use]
    pub fn from_fields(fields: &[&[u8]]) -> Self {
        Self {
            records: fields.iter().map(|bytes| ValueRecord::new(bytes)).collect(),
        }
    }

    /// Byte length of each field, in order.
    #[must_use]
    pub fn byte_lengths(&self) -> Vec<usize> {
        self.records.iter().map(ValueRecord::len).collect()
    }
}

/// Append-only sequence of value groups for one buffer of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureBuffer {
    id: BufferId,
    values: Vec<ValueGroup>,
    #[serde(skip)]
    pending: Vec<ValueRecord>,
    closed: bool,
}

impl CaptureBuffer {
    /// Create an empty, open buffer.
    #[must_use]
    pub fn new(id: BufferId) -> Self {
        Self {
            id,
            values: Vec::new(),
            pending: Vec::new(),
            closed: false,
        }
    }

    /// Rebuild a finished buffer from already-captured groups.
    #[must_use]
    pub fn from_values(id: BufferId, values: Vec<ValueGroup>) -> Self {
        Self {
            id,
            values,
            pending: Vec::new(),
            closed: true,
        }
    }

    #[must_use]
    pub const fn id(&self) -> BufferId {
        self.id
    }

    /// Completed value groups, in write order.
    #[must_use]
    pub fn values(&self) -> &[ValueGroup] {
        &self.values
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Field records written since the last `close_value`.
    #[must_use]
    pub fn pending_records(&self) -> usize {
        self.pending.len()
    }

    /// Per-group field byte lengths; the structural fingerprint of the buffer.
    #[must_use]
    pub fn shape(&self) -> Vec<Vec<usize>> {
        self.values.iter().map(ValueGroup::byte_lengths).collect()
    }

    /// Append a copy of `bytes` as a new field record of the current value.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), UsageFault> {
        if self.closed {
            return Err(UsageFault::WriteAfterClose { buffer: self.id });
        }
        self.pending.push(ValueRecord::new(bytes));
        Ok(())
    }

    /// Close the current value. With nothing pending this records an empty value.
    pub fn close_value(&mut self) -> Result<(), UsageFault> {
        if self.closed {
            return Err(UsageFault::WriteAfterClose { buffer: self.id });
        }
        let records = std::mem::take(&mut self.pending);
        self.values.push(ValueGroup { records });
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<(), UsageFault> {
        if self.closed {
            return Err(UsageFault::DoubleClose { buffer: self.id });
        }
        if !self.pending.is_empty() {
            return Err(UsageFault::DanglingRecords {
                buffer: self.id,
                count: self.pending.len(),
            });
        }
        self.closed = true;
        Ok(())
    }
}
