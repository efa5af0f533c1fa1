//! Per-invocation capture scope.
//!
//! Fixture code cannot take a sink argument without changing the signature
//! under test, so the driver installs one for the duration of a single
//! invocation on the current thread. Recording primitives route through
//! whatever is installed and drop writes when nothing is.
//!
//! The first error raised by the sink latches: later writes in the same
//! scope are ignored and [`capture_scope`] returns that error once the
//! invocation finishes.

use std::cell::RefCell;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, UsageFault};
use crate::sink::CaptureSink;

/// How pointer-typed fields of a struct are recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointerCapture {
    /// The address value only.
    #[default]
    Address,
    /// The pointed-to bytes in place of the address.
    Pointee,
    /// The address, plus one extra value group with the pointee after the struct.
    Both,
}

impl PointerCapture {
    pub const ALL: [Self; 3] = [Self::Address, Self::Pointee, Self::Both];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Pointee => "pointee",
            Self::Both => "both",
        }
    }

    /// Parse permissively (case-insensitive, accepts a few aliases).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "address" | "addr" | "ptr" => Some(Self::Address),
            "pointee" | "deref" | "target" => Some(Self::Pointee),
            "both" | "all" => Some(Self::Both),
            _ => None,
        }
    }
}

impl fmt::Display for PointerCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs visible to fixture code while a scope is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub pointer_capture: PointerCapture,
}

impl CaptureOptions {
    #[must_use]
    pub const fn with_pointer_capture(mut self, mode: PointerCapture) -> Self {
        self.pointer_capture = mode;
        self
    }
}

struct ActiveScope {
    sink: *mut (dyn CaptureSink + 'static),
    options: CaptureOptions,
    fault: Option<CaptureError>,
}

thread_local! {
    static ACTIVE: RefCell<Option<ActiveScope>> = const { RefCell::new(None) };
}

struct ScopeGuard;

impl ScopeGuard {
    fn take_fault(self) -> Option<CaptureError> {
        let fault = ACTIVE.with_borrow_mut(|active| active.as_mut().and_then(|s| s.fault.take()));
        drop(self);
        fault
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        ACTIVE.with_borrow_mut(|active| *active = None);
    }
}

/// Run `f` with `sink` installed as the destination for every recording
/// primitive called on this thread.
///
/// Returns `f`'s result, or the first error the sink raised while `f` ran.
/// Scopes do not nest.
pub fn capture_scope<R>(
    sink: &mut dyn CaptureSink,
    options: CaptureOptions,
    f: impl FnOnce() -> R,
) -> Result<R, CaptureError> {
    if is_active() {
        return Err(UsageFault::NestedScope.into());
    }
    let raw: *mut (dyn CaptureSink + '_) = sink;
    // SAFETY: only the trait-object lifetime bound changes. The pointer is
    // cleared by `ScopeGuard` before this function returns or unwinds, so
    // it never outlives the borrow of `sink`.
    let raw: *mut (dyn CaptureSink + 'static) = unsafe { std::mem::transmute(raw) };
    ACTIVE.with_borrow_mut(|active| {
        *active = Some(ActiveScope {
            sink: raw,
            options,
            fault: None,
        });
    });
    let guard = ScopeGuard;
    let out = f();
    match guard.take_fault() {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

/// Whether a capture scope is installed on this thread.
#[must_use]
pub fn is_active() -> bool {
    ACTIVE.with_borrow(Option::is_some)
}

/// Options of the active scope, or the defaults outside of one.
#[must_use]
pub fn current_options() -> CaptureOptions {
    ACTIVE.with_borrow(|active| active.as_ref().map(|s| s.options).unwrap_or_default())
}

/// Record `err` as the scope's fault unless one is already latched.
pub(crate) fn latch_fault(err: CaptureError) {
    ACTIVE.with_borrow_mut(|active| {
        if let Some(scope) = active.as_mut() {
            scope.fault.get_or_insert(err);
        }
    });
}

/// Apply `op` to the active sink. No scope, or a latched fault, makes this a no-op.
pub(crate) fn with_sink(op: impl FnOnce(&mut dyn CaptureSink) -> Result<(), CaptureError>) {
    let sink = ACTIVE.with_borrow(|active| match active {
        Some(scope) if scope.fault.is_none() => Some(scope.sink),
        _ => None,
    });
    let Some(sink) = sink else {
        return;
    };
    // SAFETY: the pointer was installed by `capture_scope` on this thread
    // and stays valid until its guard drops. The thread-local borrow is
    // released before the sink runs.
    let result = op(unsafe { &mut *sink });
    if let Err(err) = result {
        latch_fault(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferId;
    use crate::call::CallCapture;

    #[test]
    fn writes_outside_a_scope_are_dropped() {
        assert!(!is_active());
        with_sink(|sink| sink.append(BufferId::CallerInputs, &[1]));
        assert_eq!(current_options(), CaptureOptions::default());
    }

    #[test]
    fn scope_routes_writes_and_clears_afterwards() {
        let mut cap = CallCapture::new();
        let options = CaptureOptions::default().with_pointer_capture(PointerCapture::Both);
        let seen = capture_scope(&mut cap, options, || {
            with_sink(|sink| sink.append(BufferId::CallerInputs, &[7, 7]));
            with_sink(|sink| sink.close_value(BufferId::CallerInputs));
            current_options().pointer_capture
        })
        .unwrap();
        assert_eq!(seen, PointerCapture::Both);
        assert!(!is_active());
        assert_eq!(cap.buffer(BufferId::CallerInputs).shape(), vec![vec![2]]);
    }

    #[test]
    fn nested_scope_is_rejected() {
        let mut outer = CallCapture::new();
        let inner_result = capture_scope(&mut outer, CaptureOptions::default(), || {
            let mut inner = CallCapture::new();
            capture_scope(&mut inner, CaptureOptions::default(), || ())
                .unwrap_err()
                .usage_fault()
                .cloned()
        })
        .unwrap();
        assert_eq!(inner_result, Some(UsageFault::NestedScope));
    }

    #[test]
    fn first_fault_latches_and_later_writes_are_ignored() {
        let mut cap = CallCapture::new();
        let err = capture_scope(&mut cap, CaptureOptions::default(), || {
            with_sink(|sink| sink.close_call(BufferId::CallerInputs, BufferId::CalleeOutputs));
            with_sink(|sink| sink.append(BufferId::CallerInputs, &[1]));
        })
        .unwrap_err();
        assert!(matches!(
            err.usage_fault(),
            Some(UsageFault::MismatchedPair { .. })
        ));
        assert_eq!(cap.buffer(BufferId::CallerInputs).pending_records(), 0);
    }

    #[test]
    fn pointer_capture_parses_loosely() {
        assert_eq!(
            PointerCapture::from_str_loose(" Pointee "),
            Some(PointerCapture::Pointee)
        );
        assert_eq!(PointerCapture::from_str_loose("addr"), Some(PointerCapture::Address));
        assert_eq!(PointerCapture::from_str_loose("neither"), None);
    }
}
