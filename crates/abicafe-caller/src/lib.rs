//! # abicafe-caller
//!
//! Caller half of the ABI fixtures. This crate has no dependency on the
//! callee crate: it declares its own wide-integer types and crosses the
//! boundary only through a [`CalleeSymbol`]'s raw address, reinterpreted as
//! the caller's own `extern "C"` function type.
//!
//! Every caller variant is listed in [`entries`], keyed by signature and
//! representation.

pub mod error;
pub mod fixtures;
pub mod wide;

use abicafe_capture::{CalleeSymbol, Representation};

pub use error::CallerError;

use crate::fixtures::{I128_BY_REF, I128_SIX_ARGS, PAIR_BY_REF_AND_VALUE};
use crate::wide::{AlignedI128, UnalignedI128};

/// Runs one caller variant against a callee. The driver supplies the capture scope.
pub type CallerFn = fn(CalleeSymbol) -> Result<(), CallerError>;

/// One compiled caller variant.
#[derive(Debug, Clone, Copy)]
pub struct CallerEntry {
    pub name: &'static str,
    pub signature: &'static str,
    pub representation: Representation,
    pub run: CallerFn,
}

macro_rules! caller_entries {
    ($( $name:literal, $sig:expr, $repr:ident => $run:expr; )+) => {
        vec![$(
            CallerEntry {
                name: $name,
                signature: $sig,
                representation: Representation::$repr,
                run: $run,
            },
        )+]
    };
}

/// Every caller variant, in a stable order.
#[must_use]
pub fn entries() -> Vec<CallerEntry> {
    caller_entries! {
        "i128_six_args_native", I128_SIX_ARGS, Native => fixtures::six_args::<i128>;
        "i128_six_args_emulated_aligned", I128_SIX_ARGS, EmulatedAligned => fixtures::six_args::<AlignedI128>;
        "i128_six_args_emulated_unaligned", I128_SIX_ARGS, EmulatedUnaligned => fixtures::six_args::<UnalignedI128>;
        "i128_by_ref_native", I128_BY_REF, Native => fixtures::by_ref::<i128>;
        "i128_by_ref_emulated_aligned", I128_BY_REF, EmulatedAligned => fixtures::by_ref::<AlignedI128>;
        "i128_by_ref_emulated_unaligned", I128_BY_REF, EmulatedUnaligned => fixtures::by_ref::<UnalignedI128>;
        "pair_by_ref_and_value_native", PAIR_BY_REF_AND_VALUE, Native => fixtures::pair_by_ref_and_value;
    }
}

#[must_use]
pub fn lookup(signature: &str, representation: Representation) -> Option<CallerEntry> {
    entries()
        .into_iter()
        .find(|e| e.signature == signature && e.representation == representation)
}
