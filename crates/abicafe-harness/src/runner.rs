//! Test execution engine: one combination, one fresh capture.

use abicafe_capture::{CallCapture, CallRecord, CaptureOptions, Representation, capture_scope};

use crate::error::MatrixError;
use crate::fixtures::TestCase;
use crate::registry::FixtureRegistry;

/// Runs single (caller, callee) combinations of a test case.
pub struct TestRunner<'a> {
    registry: &'a FixtureRegistry,
    options: CaptureOptions,
}

impl<'a> TestRunner<'a> {
    #[must_use]
    pub fn new(registry: &'a FixtureRegistry, options: CaptureOptions) -> Self {
        Self { registry, options }
    }

    #[must_use]
    pub const fn options(&self) -> CaptureOptions {
        self.options
    }

    /// Link `caller` against `callee`, run the call in its own capture scope,
    /// and return the closed call record.
    pub fn run(
        &self,
        case: &TestCase,
        caller: Representation,
        callee: Representation,
    ) -> Result<CallRecord, MatrixError> {
        let signature = case.signature.name.as_str();
        let entry = self.registry.caller(signature, caller)?;
        let symbol = self.registry.callee(signature, callee)?;

        let mut capture = CallCapture::new();
        capture_scope(&mut capture, self.options, || (entry.run)(symbol))??;
        Ok(capture.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{I128_SIX_ARGS, PAIR_BY_REF_AND_VALUE, TestSuite};
    use abicafe_capture::{BufferId, PointerCapture};

    #[test]
    fn native_pair_produces_a_closed_record() {
        let registry = FixtureRegistry::linked();
        let runner = TestRunner::new(&registry, CaptureOptions::default());
        let suite = TestSuite::builtin();
        let case = suite.case(I128_SIX_ARGS).unwrap();

        let record = runner
            .run(case, Representation::Native, Representation::Native)
            .unwrap();
        for id in BufferId::ALL {
            assert!(record.buffer(id).is_closed(), "{id}");
        }
        assert_eq!(record.caller_inputs.values().len(), 6);
    }

    #[test]
    fn unlinked_combination_is_reported_before_calling() {
        let registry = FixtureRegistry::linked();
        let runner = TestRunner::new(
            &registry,
            CaptureOptions::default().with_pointer_capture(PointerCapture::Both),
        );
        let suite = TestSuite::builtin();
        let case = suite.case(PAIR_BY_REF_AND_VALUE).unwrap();
        let err = runner
            .run(case, Representation::Native, Representation::EmulatedAligned)
            .unwrap_err();
        assert!(err.is_symbol_fault());
    }
}
