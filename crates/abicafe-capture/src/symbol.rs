//! Opaque handle to a separately compiled callee.

use std::fmt;

use crate::representation::Representation;

/// An exported callee entry point, identified by signature and representation.
///
/// The caller side never sees the callee's Rust types. It receives this
/// handle, checks the signature name, and reinterprets `address` as its own
/// declaration of the function type.
#[derive(Clone, Copy)]
pub struct CalleeSymbol {
    name: &'static str,
    signature: &'static str,
    representation: Representation,
    address: *const (),
}

// SAFETY: the address points at immutable code.
unsafe impl Send for CalleeSymbol {}
// SAFETY: as above.
unsafe impl Sync for CalleeSymbol {}

impl CalleeSymbol {
    /// # Safety
    ///
    /// `address` must be an `extern "C"` function whose parameter and return
    /// types match what every caller of `signature` declares, except for the
    /// wide-integer spelling selected by `representation`.
    #[must_use]
    pub const unsafe fn new(
        name: &'static str,
        signature: &'static str,
        representation: Representation,
        address: *const (),
    ) -> Self {
        Self {
            name,
            signature,
            representation,
            address,
        }
    }

    /// Exported symbol name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn signature(&self) -> &'static str {
        self.signature
    }

    #[must_use]
    pub const fn representation(&self) -> Representation {
        self.representation
    }

    #[must_use]
    pub const fn address(&self) -> *const () {
        self.address
    }
}

impl fmt::Debug for CalleeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalleeSymbol")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("representation", &self.representation)
            .field("address", &self.address)
            .finish()
    }
}
