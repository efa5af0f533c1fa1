//! Integration test: callee fixtures record what they receive.
//!
//! Validates:
//! 1. Every signature is exported for the expected representations, under
//!    `abicafe_callee_<signature>_<representation>`.
//! 2. A direct call records six one-field values and a 16-byte result.
//! 3. The callee closes its own side of the call.
//! 4. Pair arguments are recorded field by field.

use abicafe_callee::fixtures::{
    I128_BY_REF, I128_SIX_ARGS, PAIR_BY_REF_AND_VALUE, PAIR_RESULT, Pair, RESULT_HIGH, RESULT_LOW,
};
use abicafe_callee::wide::{AlignedWide, WideValue};
use abicafe_callee::{
    abicafe_callee_i128_by_ref_emulated_unaligned, abicafe_callee_i128_six_args_emulated_aligned,
    abicafe_callee_i128_six_args_native, abicafe_callee_pair_by_ref_and_value_native, lookup,
    symbols,
};
use abicafe_capture::{
    BufferId, CallCapture, CallPhase, CaptureOptions, PointerCapture, Representation,
    capture_scope,
};

#[test]
fn symbol_table_covers_the_catalogue() {
    let all = symbols();
    assert_eq!(all.len(), 7);
    for repr in Representation::ALL {
        assert!(lookup(I128_SIX_ARGS, repr).is_some(), "{repr} six_args");
        assert!(lookup(I128_BY_REF, repr).is_some(), "{repr} by_ref");
    }
    assert!(lookup(PAIR_BY_REF_AND_VALUE, Representation::Native).is_some());
    assert!(lookup(PAIR_BY_REF_AND_VALUE, Representation::EmulatedAligned).is_none());

    let six = lookup(I128_SIX_ARGS, Representation::EmulatedUnaligned).unwrap();
    assert_eq!(six.name(), "abicafe_callee_i128_six_args_emulated_unaligned");
    assert!(!six.address().is_null());
}

#[test]
fn exported_names_spell_signature_and_representation() {
    for symbol in symbols() {
        let expected = format!(
            "abicafe_callee_{}_{}",
            symbol.signature(),
            symbol.representation().as_str().replace('-', "_")
        );
        assert_eq!(symbol.name(), expected);
    }
}

#[test]
fn native_six_args_records_every_argument() {
    let wide = |low, high| i128::from_words(low, high);
    let mut cap = CallCapture::new();
    let out = capture_scope(&mut cap, CaptureOptions::default(), || unsafe {
        abicafe_callee_i128_six_args_native(
            wide(0x1111_1111_1111_1111, 0x2222_2222_2222_2222),
            wide(0x3333_3333_3333_3333, 0x4444_4444_4444_4444),
            1234.456,
            wide(0x5555_5555_5555_5555, 0x6666_6666_6666_6666),
            235,
            wide(0x7777_7777_7777_7777, 0x8888_8888_8888_8888),
        )
    })
    .unwrap();

    assert_eq!(out, wide(RESULT_LOW, RESULT_HIGH));
    assert_eq!(cap.phase(), CallPhase::BoundaryCrossed);
    let inputs = cap.buffer(BufferId::CalleeInputs);
    assert!(inputs.is_closed());
    assert_eq!(
        inputs.shape(),
        vec![vec![16], vec![16], vec![4], vec![16], vec![1], vec![16]]
    );
    assert_eq!(inputs.values()[4].records[0].bytes, vec![235]);
    assert_eq!(
        cap.buffer(BufferId::CalleeOutputs).values()[0].records[0].bytes,
        out.to_ne_bytes().to_vec()
    );
}

#[test]
fn aligned_six_args_returns_the_fixed_result() {
    let arg = AlignedWide::from_words(1, 2);
    let mut cap = CallCapture::new();
    let out = capture_scope(&mut cap, CaptureOptions::default(), || unsafe {
        abicafe_callee_i128_six_args_emulated_aligned(arg, arg, 0.5, arg, 1, arg)
    })
    .unwrap();
    assert_eq!(out, AlignedWide::from_words(RESULT_LOW, RESULT_HIGH));
}

#[test]
fn by_ref_reads_through_pointers_and_records_null_as_empty() {
    let a = abicafe_callee::wide::UnalignedWide::from_words(7, 8);
    let mut cap = CallCapture::new();
    capture_scope(&mut cap, CaptureOptions::default(), || unsafe {
        abicafe_callee_i128_by_ref_emulated_unaligned(&a, std::ptr::null(), &a);
    })
    .unwrap();
    assert_eq!(
        cap.buffer(BufferId::CalleeInputs).shape(),
        vec![vec![16], vec![], vec![16]]
    );
}

#[test]
fn pair_fields_are_recorded_separately() {
    let target = 42u64;
    let pair = Pair {
        value: 5,
        target: &target,
    };
    let mut cap = CallCapture::new();
    let out = capture_scope(
        &mut cap,
        CaptureOptions::default().with_pointer_capture(PointerCapture::Pointee),
        || unsafe { abicafe_callee_pair_by_ref_and_value_native(&pair, pair) },
    )
    .unwrap();
    assert_eq!(out, PAIR_RESULT);

    let inputs = cap.buffer(BufferId::CalleeInputs);
    assert_eq!(inputs.shape(), vec![vec![8, 8], vec![8, 8]]);
    assert_eq!(
        inputs.values()[1].records[1].bytes,
        42u64.to_ne_bytes().to_vec()
    );
}
