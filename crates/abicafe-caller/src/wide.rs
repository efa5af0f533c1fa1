//! Caller-side wide-integer declarations, independent of the callee crate.

use abicafe_capture::AsRawBytes;

#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedI128 {
    pub lo: u64,
    pub hi: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnalignedI128 {
    pub lo: u64,
    pub hi: u64,
}

// SAFETY: 16 bytes of u64 halves, no padding.
unsafe impl AsRawBytes for AlignedI128 {}
// SAFETY: as above.
unsafe impl AsRawBytes for UnalignedI128 {}

pub trait WideValue: AsRawBytes {
    fn from_words(lo: u64, hi: u64) -> Self;
}

impl WideValue for i128 {
    fn from_words(lo: u64, hi: u64) -> Self {
        ((u128::from(hi) << 64) | u128::from(lo)) as i128
    }
}

impl WideValue for AlignedI128 {
    fn from_words(lo: u64, hi: u64) -> Self {
        Self { lo, hi }
    }
}

impl WideValue for UnalignedI128 {
    fn from_words(lo: u64, hi: u64) -> Self {
        Self { lo, hi }
    }
}
