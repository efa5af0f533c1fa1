//! Integration test: caller variants crossing into callee symbols.
//!
//! Validates:
//! 1. Same-representation calls leave matching input and output buffers.
//! 2. The pair fixture records two groups of two fields on both sides.
//! 3. Record shape is identical for every representation pairing.

use abicafe_capture::{
    CallCapture, CallRecord, CaptureOptions, PointerCapture, Representation, capture_scope,
};
use abicafe_caller::fixtures::{I128_BY_REF, I128_SIX_ARGS, PAIR_BY_REF_AND_VALUE};

fn run(
    signature: &str,
    caller: Representation,
    callee: Representation,
    mode: PointerCapture,
) -> CallRecord {
    let entry = abicafe_caller::lookup(signature, caller).expect("caller variant");
    let symbol = abicafe_callee::lookup(signature, callee).expect("callee symbol");
    let mut cap = CallCapture::new();
    capture_scope(
        &mut cap,
        CaptureOptions::default().with_pointer_capture(mode),
        || (entry.run)(symbol),
    )
    .expect("scope")
    .expect("caller");
    cap.finish().expect("closed call")
}

fn assert_equivalent(record: &CallRecord) {
    assert_eq!(record.caller_inputs.values(), record.callee_inputs.values());
    assert_eq!(record.callee_outputs.values(), record.caller_outputs.values());
}

#[test]
fn same_representation_round_trips_for_wide_signatures() {
    for signature in [I128_SIX_ARGS, I128_BY_REF] {
        for repr in Representation::ALL {
            let record = run(signature, repr, repr, PointerCapture::Address);
            assert_equivalent(&record);
        }
    }
}

#[test]
fn native_six_args_matches_the_literal_inputs() {
    let record = run(
        I128_SIX_ARGS,
        Representation::Native,
        Representation::Native,
        PointerCapture::Address,
    );
    assert_equivalent(&record);
    let first = &record.callee_inputs.values()[0].records[0].bytes;
    let expected = ((0x2222_2222_2222_2222u128 << 64) | 0x1111_1111_1111_1111u128) as i128;
    assert_eq!(first, &expected.to_ne_bytes().to_vec());
    assert_eq!(
        record.callee_inputs.values()[2].records[0].bytes,
        1234.456f32.to_ne_bytes().to_vec()
    );
}

#[test]
fn structure_is_invariant_across_all_pairings() {
    for signature in [I128_SIX_ARGS, I128_BY_REF] {
        for caller in Representation::ALL {
            for callee in Representation::ALL {
                let record = run(signature, caller, callee, PointerCapture::Address);
                assert_eq!(
                    record.caller_inputs.shape(),
                    record.callee_inputs.shape(),
                    "{signature} {caller}->{callee}"
                );
                assert_eq!(record.caller_outputs.shape(), vec![vec![16]]);
            }
        }
    }
}

#[test]
fn pair_records_two_groups_of_two_fields() {
    let ptr = std::mem::size_of::<*const u64>();
    let record = run(
        PAIR_BY_REF_AND_VALUE,
        Representation::Native,
        Representation::Native,
        PointerCapture::Address,
    );
    assert_eq!(record.caller_inputs.shape(), vec![vec![8, ptr], vec![8, ptr]]);
    assert_equivalent(&record);

    let both = run(
        PAIR_BY_REF_AND_VALUE,
        Representation::Native,
        Representation::Native,
        PointerCapture::Both,
    );
    assert_eq!(
        both.callee_inputs.shape(),
        vec![vec![8, ptr], vec![8], vec![8, ptr], vec![8]]
    );
    assert_equivalent(&both);
    assert_eq!(
        both.callee_outputs.values()[0].records[0].bytes,
        both.caller_outputs.values()[0].records[0].bytes
    );
}
