//! Resolution of test cases to compiled caller and callee variants.

use abicafe_caller::CallerEntry;
use abicafe_capture::{CalleeSymbol, Representation};

use crate::error::MatrixError;
use crate::fixtures::{TestCase, builtin_signature};

/// Every caller variant and callee symbol available to the driver.
#[derive(Debug, Clone)]
pub struct FixtureRegistry {
    callers: Vec<CallerEntry>,
    callees: Vec<CalleeSymbol>,
}

impl FixtureRegistry {
    #[must_use]
    pub fn new(callers: Vec<CallerEntry>, callees: Vec<CalleeSymbol>) -> Self {
        Self { callers, callees }
    }

    /// The fixtures linked into this binary.
    #[must_use]
    pub fn linked() -> Self {
        Self::new(abicafe_caller::entries(), abicafe_callee::symbols())
    }

    #[must_use]
    pub fn callers(&self) -> &[CallerEntry] {
        &self.callers
    }

    #[must_use]
    pub fn callees(&self) -> &[CalleeSymbol] {
        &self.callees
    }

    pub fn caller(
        &self,
        signature: &str,
        representation: Representation,
    ) -> Result<CallerEntry, MatrixError> {
        self.callers
            .iter()
            .find(|e| e.signature == signature && e.representation == representation)
            .copied()
            .ok_or_else(|| MatrixError::MissingCaller {
                signature: signature.to_string(),
                representation,
            })
    }

    pub fn callee(
        &self,
        signature: &str,
        representation: Representation,
    ) -> Result<CalleeSymbol, MatrixError> {
        self.callees
            .iter()
            .find(|s| s.signature() == signature && s.representation() == representation)
            .copied()
            .ok_or_else(|| MatrixError::MissingCallee {
                signature: signature.to_string(),
                representation,
            })
    }

    /// Check that `case` describes a compiled signature and that every one
    /// of its variants links on both sides.
    pub fn validate(&self, case: &TestCase) -> Result<(), MatrixError> {
        let name = &case.signature.name;
        let compiled =
            builtin_signature(name).ok_or_else(|| MatrixError::UnknownSignature(name.clone()))?;
        if compiled != case.signature {
            return Err(MatrixError::SignatureMismatch {
                test: case.name.clone(),
                signature: case.signature.to_string(),
            });
        }
        for repr in &case.variants {
            self.caller(name, *repr)?;
            self.callee(name, *repr)?;
        }
        Ok(())
    }
}
