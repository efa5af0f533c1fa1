//! Callee fixture bodies.
//!
//! Every body records its arguments in order into CALLEE_INPUTS, one value
//! per argument, returns a fixed result recorded into CALLEE_OUTPUTS, and
//! closes the callee side of the call.

use abicafe_capture::{BufferId, StructRecorder, finish_call, finish_value, record_value};

use crate::wide::WideValue;

pub const I128_SIX_ARGS: &str = "i128_six_args";
pub const I128_BY_REF: &str = "i128_by_ref";
pub const PAIR_BY_REF_AND_VALUE: &str = "pair_by_ref_and_value";

pub const RESULT_LOW: u64 = 0x9999_9999_9999_9999;
pub const RESULT_HIGH: u64 = 0xAAAA_AAAA_AAAA_AAAA;
pub const PAIR_RESULT: u64 = 0xAAAA_AAAA_9999_9999;

/// A value alongside a pointer to related data.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Pair {
    pub value: u64,
    pub target: *const u64,
}

fn close_callee_side() {
    finish_call(BufferId::CalleeInputs, BufferId::CalleeOutputs);
}

fn wide_result<W: WideValue>() -> W {
    let out = W::from_words(RESULT_LOW, RESULT_HIGH);
    record_value(BufferId::CalleeOutputs, &out);
    close_callee_side();
    out
}

pub(crate) fn six_args_body<W: WideValue>(a0: W, a1: W, a2: f32, a3: W, a4: u8, a5: W) -> W {
    let inputs = BufferId::CalleeInputs;
    record_value(inputs, &a0);
    record_value(inputs, &a1);
    record_value(inputs, &a2);
    record_value(inputs, &a3);
    record_value(inputs, &a4);
    record_value(inputs, &a5);
    wide_result()
}

/// # Safety
///
/// Each pointer is null or valid for reads of `W`; alignment is not required.
pub(crate) unsafe fn by_ref_body<W: WideValue>(a0: *const W, a1: *const W, a2: *const W) -> W {
    for ptr in [a0, a1, a2] {
        if ptr.is_null() {
            finish_value(BufferId::CalleeInputs);
            continue;
        }
        // SAFETY: non-null and readable per the caller's contract.
        let value = unsafe { ptr.read_unaligned() };
        record_value(BufferId::CalleeInputs, &value);
    }
    wide_result()
}

/// # Safety
///
/// A non-null `pair` must be valid for reads, and so must the `target` of
/// each pair when the active scope captures pointees.
unsafe fn record_pair(pair: Option<Pair>) {
    let mut rec = StructRecorder::begin(BufferId::CalleeInputs);
    if let Some(pair) = pair {
        rec.field(&pair.value);
        // SAFETY: forwarded to the caller.
        unsafe { rec.pointer_field(pair.target) };
    }
    rec.finish();
}

/// # Safety
///
/// See [`record_pair`].
pub(crate) unsafe fn pair_body(by_ref: *const Pair, by_value: Pair) -> u64 {
    let pointee = if by_ref.is_null() {
        None
    } else {
        // SAFETY: non-null and readable per the caller's contract.
        Some(unsafe { by_ref.read_unaligned() })
    };
    // SAFETY: forwarded to the caller.
    unsafe {
        record_pair(pointee);
        record_pair(Some(by_value));
    }
    record_value(BufferId::CalleeOutputs, &PAIR_RESULT);
    close_callee_side();
    PAIR_RESULT
}
