//! # abicafe-capture
//!
//! Byte-exact capture of values crossing a compiled call boundary.
//!
//! A fixture records every argument it sends (caller) or receives (callee)
//! into one of four buffers, then closes its side of the call:
//!
//! ```text
//! caller: CALLER_INPUTS  --call-->  callee: CALLEE_INPUTS
//!         CALLER_OUTPUTS <--ret---          CALLEE_OUTPUTS
//! ```
//!
//! Fixtures never own buffers. The driver injects a [`CaptureSink`] for one
//! invocation with [`capture_scope`], and fixture code writes through the
//! free-function primitives in [`recorder`] (or the C-callable adapters in
//! [`ffi`]). The in-memory [`CallCapture`] sink enforces the per-call state
//! machine and yields a read-only [`CallRecord`] for comparison.
//!
//! Nothing here decodes the captured bytes; comparison lives in the harness.

pub mod buffer;
pub mod call;
pub mod error;
pub mod ffi;
pub mod hex;
pub mod recorder;
pub mod representation;
pub mod scope;
pub mod sink;
pub mod stream;
pub mod symbol;

pub use buffer::{BufferId, CaptureBuffer, Side, ValueGroup, ValueRecord};
pub use call::{CallCapture, CallPhase, CallRecord};
pub use error::{CaptureError, UsageFault};
pub use recorder::{
    AsRawBytes, StructRecorder, finish_call, finish_value, record_value, write_field,
};
pub use representation::Representation;
pub use scope::{CaptureOptions, PointerCapture, capture_scope, current_options};
pub use sink::CaptureSink;
pub use stream::{StreamEvent, StreamSink, replay};
pub use symbol::CalleeSymbol;
