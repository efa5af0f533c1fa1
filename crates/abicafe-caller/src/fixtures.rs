//! Caller fixture bodies.
//!
//! Each body records its outbound arguments into CALLER_INPUTS, crosses into
//! the callee through the symbol's raw address, records what came back into
//! CALLER_OUTPUTS and closes the caller side.

use std::mem::transmute_copy;

use abicafe_capture::{BufferId, CalleeSymbol, StructRecorder, finish_call, record_value};

use crate::error::CallerError;
use crate::wide::WideValue;

pub const I128_SIX_ARGS: &str = "i128_six_args";
pub const I128_BY_REF: &str = "i128_by_ref";
pub const PAIR_BY_REF_AND_VALUE: &str = "pair_by_ref_and_value";

/// `(low, high)` halves of the four wide arguments of `i128_six_args`.
pub const SIX_ARGS_WIDE: [(u64, u64); 4] = [
    (0x1111_1111_1111_1111, 0x2222_2222_2222_2222),
    (0x3333_3333_3333_3333, 0x4444_4444_4444_4444),
    (0x5555_5555_5555_5555, 0x6666_6666_6666_6666),
    (0x7777_7777_7777_7777, 0x8888_8888_8888_8888),
];
pub const SIX_ARGS_FLOAT: f32 = 1234.456;
pub const SIX_ARGS_BYTE: u8 = 235;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Pair {
    pub value: u64,
    pub target: *const u64,
}

static PAIR_TARGETS: [u64; 2] = [0x0123_4567_89AB_CDEF, 0xFEDC_BA98_7654_3210];

type SixArgsFn<W> = unsafe extern "C" fn(W, W, f32, W, u8, W) -> W;
type ByRefFn<W> = unsafe extern "C" fn(*const W, *const W, *const W) -> W;
type PairFn = unsafe extern "C" fn(*const Pair, Pair) -> u64;

fn expect_signature(callee: &CalleeSymbol, expected: &'static str) -> Result<(), CallerError> {
    if callee.signature() != expected {
        return Err(CallerError::SignatureMismatch {
            symbol: callee.name(),
            expected,
            found: callee.signature(),
        });
    }
    if callee.address().is_null() {
        return Err(CallerError::NullSymbol {
            symbol: callee.name(),
        });
    }
    Ok(())
}

fn close_caller_side() {
    finish_call(BufferId::CallerInputs, BufferId::CallerOutputs);
}

pub(crate) fn six_args<W: WideValue>(callee: CalleeSymbol) -> Result<(), CallerError> {
    expect_signature(&callee, I128_SIX_ARGS)?;
    let [w0, w1, w3, w5] = SIX_ARGS_WIDE.map(|(lo, hi)| W::from_words(lo, hi));

    let inputs = BufferId::CallerInputs;
    record_value(inputs, &w0);
    record_value(inputs, &w1);
    record_value(inputs, &SIX_ARGS_FLOAT);
    record_value(inputs, &w3);
    record_value(inputs, &SIX_ARGS_BYTE);
    record_value(inputs, &w5);

    // SAFETY: the symbol was exported for this signature; the wide spelling
    // may differ, which is exactly what the call observes.
    let out = unsafe {
        let f: SixArgsFn<W> = transmute_copy(&callee.address());
        f(w0, w1, SIX_ARGS_FLOAT, w3, SIX_ARGS_BYTE, w5)
    };

    record_value(BufferId::CallerOutputs, &out);
    close_caller_side();
    Ok(())
}

pub(crate) fn by_ref<W: WideValue>(callee: CalleeSymbol) -> Result<(), CallerError> {
    expect_signature(&callee, I128_BY_REF)?;
    let [a0, a1, a2, _] = SIX_ARGS_WIDE.map(|(lo, hi)| W::from_words(lo, hi));

    for value in [&a0, &a1, &a2] {
        record_value(BufferId::CallerInputs, value);
    }

    // SAFETY: as in `six_args`; the pointees live on this frame for the call.
    let out = unsafe {
        let f: ByRefFn<W> = transmute_copy(&callee.address());
        f(&a0, &a1, &a2)
    };

    record_value(BufferId::CallerOutputs, &out);
    close_caller_side();
    Ok(())
}

fn record_pair(pair: &Pair) {
    let mut rec = StructRecorder::begin(BufferId::CallerInputs);
    rec.field(&pair.value);
    // SAFETY: targets point into `PAIR_TARGETS`.
    unsafe { rec.pointer_field(pair.target) };
    rec.finish();
}

pub(crate) fn pair_by_ref_and_value(callee: CalleeSymbol) -> Result<(), CallerError> {
    expect_signature(&callee, PAIR_BY_REF_AND_VALUE)?;
    let by_ref = Pair {
        value: 0x1111_1111_1111_1111,
        target: &PAIR_TARGETS[0],
    };
    let by_value = Pair {
        value: 0x3333_3333_3333_3333,
        target: &PAIR_TARGETS[1],
    };

    record_pair(&by_ref);
    record_pair(&by_value);

    // SAFETY: the symbol was exported for this signature.
    let out = unsafe {
        let f: PairFn = transmute_copy(&callee.address());
        f(&by_ref, by_value)
    };

    record_value(BufferId::CallerOutputs, &out);
    close_caller_side();
    Ok(())
}
