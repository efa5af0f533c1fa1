//! The capability a driver hands to fixture code for one call.

use crate::buffer::BufferId;
use crate::error::CaptureError;

/// Where recorded bytes go.
///
/// Fixtures only ever see this through [`capture_scope`](crate::capture_scope),
/// so what they record is independent of how it is stored: in memory
/// ([`CallCapture`](crate::CallCapture)), as a JSON-lines stream
/// ([`StreamSink`](crate::StreamSink)), or anything else implementing it.
pub trait CaptureSink {
    /// Append one field record to the open value of `buffer`.
    fn append(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), CaptureError>;

    /// Close the open value of `buffer`.
    fn close_value(&mut self, buffer: BufferId) -> Result<(), CaptureError>;

    /// Finish one side of the call; both buffers reject writes afterwards.
    fn close_call(&mut self, inputs: BufferId, outputs: BufferId) -> Result<(), CaptureError>;
}

impl<S: CaptureSink + ?Sized> CaptureSink for &mut S {
    fn append(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), CaptureError> {
        (**self).append(buffer, bytes)
    }

    fn close_value(&mut self, buffer: BufferId) -> Result<(), CaptureError> {
        (**self).close_value(buffer)
    }

    fn close_call(&mut self, inputs: BufferId, outputs: BufferId) -> Result<(), CaptureError> {
        (**self).close_call(inputs, outputs)
    }
}
