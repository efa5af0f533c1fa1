//! Recording primitives called from fixture code.
//!
//! These never fail at the call site. Outside a [`capture_scope`] they do
//! nothing; inside one, errors latch on the scope and surface when it ends.
//!
//! [`capture_scope`]: crate::capture_scope

use std::mem::size_of;

use crate::buffer::BufferId;
use crate::scope::{PointerCapture, current_options, with_sink};

/// Types whose in-memory representation can be copied out byte for byte.
///
/// # Safety
///
/// Implementors must have no padding bytes and no interior mutability, so
/// every byte of `size_of::<Self>()` is initialized for any value.
pub unsafe trait AsRawBytes: Copy {
    fn raw_bytes(&self) -> &[u8] {
        // SAFETY: guaranteed by the trait contract; the slice borrows `self`.
        unsafe { std::slice::from_raw_parts((self as *const Self).cast::<u8>(), size_of::<Self>()) }
    }
}

macro_rules! impl_as_raw_bytes {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive scalar, no padding.
            unsafe impl AsRawBytes for $ty {}
        )*
    };
}

impl_as_raw_bytes!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
);

// SAFETY: thin pointers are a single address-sized word.
unsafe impl<T> AsRawBytes for *const T {}
// SAFETY: as above.
unsafe impl<T> AsRawBytes for *mut T {}

/// Append the bytes of `value` as one field of the open value in `buffer`.
pub fn write_field<T: AsRawBytes>(buffer: BufferId, value: &T) {
    write_bytes(buffer, value.raw_bytes());
}

/// Append `bytes` as one field of the open value in `buffer`.
pub fn write_bytes(buffer: BufferId, bytes: &[u8]) {
    with_sink(|sink| sink.append(buffer, bytes));
}

/// Close the open value in `buffer`.
pub fn finish_value(buffer: BufferId) {
    with_sink(|sink| sink.close_value(buffer));
}

/// Close one side of the call. `inputs` and `outputs` must belong to the same side.
pub fn finish_call(inputs: BufferId, outputs: BufferId) {
    with_sink(|sink| sink.close_call(inputs, outputs));
}

/// Record a scalar as a complete single-field value.
pub fn record_value<T: AsRawBytes>(buffer: BufferId, value: &T) {
    write_field(buffer, value);
    finish_value(buffer);
}

/// Records a struct one field at a time so each field stays separately comparable.
#[derive(Debug)]
pub struct StructRecorder {
    buffer: BufferId,
    mode: PointerCapture,
    pointees: Vec<Vec<u8>>,
}

impl StructRecorder {
    /// Start a struct value; pointer handling follows the active scope's options.
    #[must_use]
    pub fn begin(buffer: BufferId) -> Self {
        Self {
            buffer,
            mode: current_options().pointer_capture,
            pointees: Vec::new(),
        }
    }

    pub fn field<T: AsRawBytes>(&mut self, value: &T) -> &mut Self {
        write_field(self.buffer, value);
        self
    }

    /// Record a pointer-typed field.
    ///
    /// A null pointer's pointee is recorded as an empty field.
    ///
    /// # Safety
    ///
    /// When the mode reads through the pointer, a non-null `ptr` must be
    /// valid for reads of `T`.
    pub unsafe fn pointer_field<T: AsRawBytes>(&mut self, ptr: *const T) -> &mut Self {
        match self.mode {
            PointerCapture::Address => write_field(self.buffer, &ptr),
            PointerCapture::Pointee => {
                // SAFETY: forwarded to the caller.
                let bytes = unsafe { pointee_bytes(ptr) };
                write_bytes(self.buffer, &bytes);
            }
            PointerCapture::Both => {
                write_field(self.buffer, &ptr);
                // SAFETY: forwarded to the caller.
                self.pointees.push(unsafe { pointee_bytes(ptr) });
            }
        }
        self
    }

    /// Close the struct value, then emit one extra value per queued pointee.
    pub fn finish(self) {
        finish_value(self.buffer);
        for bytes in &self.pointees {
            write_bytes(self.buffer, bytes);
            finish_value(self.buffer);
        }
    }
}

/// # Safety
///
/// A non-null `ptr` must be valid for reads of `T`.
unsafe fn pointee_bytes<T: AsRawBytes>(ptr: *const T) -> Vec<u8> {
    if ptr.is_null() {
        return Vec::new();
    }
    // SAFETY: non-null and readable per the caller's contract.
    let value = unsafe { ptr.read_unaligned() };
    value.raw_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallCapture;
    use crate::scope::{CaptureOptions, capture_scope};

    #[repr(C)]
    #[derive(Clone, Copy)]
    struct Pair {
        value: u64,
        target: *const u64,
    }

    fn record_pair(mode: PointerCapture, pair: &Pair) -> CallCapture {
        let mut cap = CallCapture::new();
        capture_scope(
            &mut cap,
            CaptureOptions::default().with_pointer_capture(mode),
            || {
                let mut rec = StructRecorder::begin(BufferId::CallerInputs);
                rec.field(&pair.value);
                // SAFETY: `target` points at a live u64 or is null.
                unsafe { rec.pointer_field(pair.target) };
                rec.finish();
            },
        )
        .unwrap();
        cap
    }

    #[test]
    fn scalar_value_is_one_group_of_one_field() {
        let mut cap = CallCapture::new();
        capture_scope(&mut cap, CaptureOptions::default(), || {
            record_value(BufferId::CallerInputs, &235u8);
            record_value(BufferId::CallerInputs, &1234.456f32);
        })
        .unwrap();
        let buf = cap.buffer(BufferId::CallerInputs);
        assert_eq!(buf.shape(), vec![vec![1], vec![4]]);
        assert_eq!(buf.values()[0].records[0].bytes, vec![235]);
        assert_eq!(
            buf.values()[1].records[0].bytes,
            1234.456f32.to_ne_bytes().to_vec()
        );
    }

    #[test]
    fn wide_scalar_keeps_native_byte_order() {
        let mut cap = CallCapture::new();
        let value: i128 = 0x2222_2222_2222_2222_1111_1111_1111_1111;
        capture_scope(&mut cap, CaptureOptions::default(), || {
            record_value(BufferId::CalleeInputs, &value);
        })
        .unwrap();
        let bytes = &cap.buffer(BufferId::CalleeInputs).values()[0].records[0].bytes;
        assert_eq!(bytes, &value.to_ne_bytes().to_vec());
    }

    #[test]
    fn pointer_modes_shape_the_struct_differently() {
        let target = 0xDEAD_BEEF_u64;
        let pair = Pair {
            value: 7,
            target: &target,
        };
        let ptr_len = size_of::<*const u64>();

        let address = record_pair(PointerCapture::Address, &pair);
        assert_eq!(
            address.buffer(BufferId::CallerInputs).shape(),
            vec![vec![8, ptr_len]]
        );

        let pointee = record_pair(PointerCapture::Pointee, &pair);
        let buf = pointee.buffer(BufferId::CallerInputs);
        assert_eq!(buf.shape(), vec![vec![8, 8]]);
        assert_eq!(
            buf.values()[0].records[1].bytes,
            target.to_ne_bytes().to_vec()
        );

        let both = record_pair(PointerCapture::Both, &pair);
        let buf = both.buffer(BufferId::CallerInputs);
        assert_eq!(buf.shape(), vec![vec![8, ptr_len], vec![8]]);
    }

    #[test]
    fn null_pointee_is_an_empty_field() {
        let pair = Pair {
            value: 1,
            target: std::ptr::null(),
        };
        let cap = record_pair(PointerCapture::Pointee, &pair);
        assert_eq!(cap.buffer(BufferId::CallerInputs).shape(), vec![vec![8, 0]]);
    }

    #[test]
    fn primitives_without_scope_do_nothing() {
        record_value(BufferId::CallerInputs, &1u64);
        finish_call(BufferId::CallerInputs, BufferId::CallerOutputs);
    }
}
