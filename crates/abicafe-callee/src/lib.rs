// Exported fixtures take raw pointers straight from the caller under test.
#![allow(clippy::missing_safety_doc)]
#![allow(improper_ctypes_definitions)]
//! # abicafe-callee
//!
//! Callee half of the ABI fixtures. Compiled on its own, against its own
//! wide-integer types, and exported as `extern "C"` symbols:
//!
//! ```text
//! abicafe_callee_<signature>_<representation>
//! ```
//!
//! The caller crate never links these by type. The harness hands it a
//! [`CalleeSymbol`] from [`symbols`] or [`lookup`], and the caller
//! reinterprets the address as its own declaration of the signature.

#[macro_use]
mod macros;

pub mod fixtures;
pub mod wide;

use abicafe_capture::{CalleeSymbol, Representation};

use crate::fixtures::{PAIR_BY_REF_AND_VALUE, Pair};
use crate::wide::{AlignedWide, NativeWide, UnalignedWide};

wide_callees! {
    Native => NativeWide {
        six_args: abicafe_callee_i128_six_args_native,
        by_ref: abicafe_callee_i128_by_ref_native,
    },
    EmulatedAligned => AlignedWide {
        six_args: abicafe_callee_i128_six_args_emulated_aligned,
        by_ref: abicafe_callee_i128_by_ref_emulated_aligned,
    },
    EmulatedUnaligned => UnalignedWide {
        six_args: abicafe_callee_i128_six_args_emulated_unaligned,
        by_ref: abicafe_callee_i128_by_ref_emulated_unaligned,
    },
}

callee_fn! {
    /// Callee for `pair_by_ref_and_value`.
    fn abicafe_callee_pair_by_ref_and_value_native(by_ref: *const Pair, by_value: Pair) -> u64 {
        fixtures::pair_body(by_ref, by_value)
    }
}

/// Every exported callee, in a stable order.
#[must_use]
pub fn symbols() -> Vec<CalleeSymbol> {
    let mut out = wide_symbols();
    // SAFETY: declared with `Pair` by pointer and by value, returning u64.
    out.push(unsafe {
        CalleeSymbol::new(
            "abicafe_callee_pair_by_ref_and_value_native",
            PAIR_BY_REF_AND_VALUE,
            Representation::Native,
            abicafe_callee_pair_by_ref_and_value_native as *const (),
        )
    });
    out
}

/// Find the callee for `signature` in `representation`.
#[must_use]
pub fn lookup(signature: &str, representation: Representation) -> Option<CalleeSymbol> {
    symbols()
        .into_iter()
        .find(|s| s.signature() == signature && s.representation() == representation)
}
