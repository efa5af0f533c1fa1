//! C-callable recording primitives.
//!
//! Fixtures written in other languages link against these symbols (see
//! `include/abicafe_capture.h`). Buffer ids follow [`BufferId::to_raw`]:
//! 0 caller inputs, 1 caller outputs, 2 callee inputs, 3 callee outputs.
//! An unknown id latches an [`UsageFault::UnknownBuffer`] on the active scope.

use crate::buffer::BufferId;
use crate::error::UsageFault;
use crate::recorder::{finish_call, finish_value, write_bytes};
use crate::scope::latch_fault;

fn resolve(raw: u32) -> Option<BufferId> {
    let id = BufferId::from_raw(raw);
    if id.is_none() {
        latch_fault(UsageFault::UnknownBuffer { raw }.into());
    }
    id
}

/// Append `len` bytes at `data` as one field of the open value in `buffer`.
///
/// # Safety
///
/// `data` must be valid for reads of `len` bytes, or null with `len == 0`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn abicafe_write_field(buffer: u32, data: *const u8, len: u32) {
    let Some(id) = resolve(buffer) else {
        return;
    };
    let bytes = if data.is_null() || len == 0 {
        &[][..]
    } else {
        // SAFETY: validity of `data..data+len` is the caller's contract.
        unsafe { std::slice::from_raw_parts(data, len as usize) }
    };
    write_bytes(id, bytes);
}

#[unsafe(no_mangle)]
pub extern "C" fn abicafe_finished_val(buffer: u32) {
    if let Some(id) = resolve(buffer) {
        finish_value(id);
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn abicafe_finished_func(inputs: u32, outputs: u32) {
    if let (Some(inputs), Some(outputs)) = (resolve(inputs), resolve(outputs)) {
        finish_call(inputs, outputs);
    }
}

/// Function-pointer table for fixtures that are handed the primitives
/// instead of linking them by name.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CaptureCallbacks {
    pub write_field: unsafe extern "C" fn(u32, *const u8, u32),
    pub finished_val: extern "C" fn(u32),
    pub finished_func: extern "C" fn(u32, u32),
}

#[must_use]
pub fn callbacks() -> CaptureCallbacks {
    CaptureCallbacks {
        write_field: abicafe_write_field,
        finished_val: abicafe_finished_val,
        finished_func: abicafe_finished_func,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallCapture;
    use crate::scope::{CaptureOptions, capture_scope};

    #[test]
    fn callbacks_drive_a_full_caller_side() {
        let table = callbacks();
        let mut cap = CallCapture::new();
        let arg = 235u8;
        capture_scope(&mut cap, CaptureOptions::default(), || unsafe {
            (table.write_field)(0, &arg, 1);
            (table.finished_val)(0);
            (table.write_field)(1, std::ptr::null(), 0);
            (table.finished_val)(1);
            (table.finished_func)(0, 1);
        })
        .unwrap();
        let record = cap.finish().unwrap();
        assert_eq!(record.caller_inputs.values()[0].records[0].bytes, vec![235]);
        assert_eq!(record.caller_outputs.shape(), vec![vec![0]]);
    }

    #[test]
    fn unknown_buffer_id_faults_the_scope() {
        let mut cap = CallCapture::new();
        let err = capture_scope(&mut cap, CaptureOptions::default(), || {
            abicafe_finished_val(9);
        })
        .unwrap_err();
        assert_eq!(err.usage_fault(), Some(&UsageFault::UnknownBuffer { raw: 9 }));
    }
}
