//! Callee-side spellings of the 128-bit wide integer.
//!
//! These are deliberately not shared with the caller crate: each side
//! declares its own layout, as two separately compiled objects would.

use abicafe_capture::AsRawBytes;

/// Builtin 128-bit integer.
pub type NativeWide = i128;

/// Two 64-bit halves forced to the native 16-byte alignment.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedWide {
    pub low: u64,
    pub high: u64,
}

/// Two 64-bit halves at natural (8-byte) alignment.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnalignedWide {
    pub low: u64,
    pub high: u64,
}

// SAFETY: two u64 fields fill all 16 bytes; no padding.
unsafe impl AsRawBytes for AlignedWide {}
// SAFETY: as above.
unsafe impl AsRawBytes for UnalignedWide {}

/// A wide integer that can be built from its two 64-bit halves.
pub trait WideValue: AsRawBytes {
    fn from_words(low: u64, high: u64) -> Self;
}

impl WideValue for NativeWide {
    fn from_words(low: u64, high: u64) -> Self {
        ((u128::from(high) << 64) | u128::from(low)) as i128
    }
}

impl WideValue for AlignedWide {
    fn from_words(low: u64, high: u64) -> Self {
        Self { low, high }
    }
}

impl WideValue for UnalignedWide {
    fn from_words(low: u64, high: u64) -> Self {
        Self { low, high }
    }
}
