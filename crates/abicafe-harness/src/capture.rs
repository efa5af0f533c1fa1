//! Persisted captures.
//!
//! A matrix run can be written out as a [`CapturedRun`] and re-checked
//! offline with [`compare_captured`]. Record bytes are stored as lowercase
//! hex in write order, so nothing is lost and no byte order is applied.

use std::path::Path;

use abicafe_capture::{CallRecord, PointerCapture, Representation};
use serde::{Deserialize, Serialize};

use crate::error::MatrixError;
use crate::expectations::Expectations;
use crate::fixtures::TestSuite;
use crate::matrix::{Combination, MatrixReport};

/// One persisted combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedCall {
    pub test: String,
    pub caller: Representation,
    pub callee: Representation,
    pub record: CallRecord,
}

/// Every closed call of a matrix run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedRun {
    pub schema_version: String,
    pub suite: String,
    pub pointer_capture: PointerCapture,
    pub calls: Vec<CapturedCall>,
}

impl CapturedRun {
    /// Collect the records of a finished report. Skipped and errored
    /// combinations have none and are left out.
    #[must_use]
    pub fn from_report(report: &MatrixReport) -> Self {
        let calls = report
            .cases
            .iter()
            .filter_map(|row| {
                row.record.as_ref().map(|record| CapturedCall {
                    test: row.test.clone(),
                    caller: row.caller,
                    callee: row.callee,
                    record: record.clone(),
                })
            })
            .collect();
        Self {
            schema_version: "v1".to_string(),
            suite: report.suite.clone(),
            pointer_capture: report.pointer_capture,
            calls,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, MatrixError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), MatrixError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Re-check a persisted run against the signatures of `suite`.
pub fn compare_captured(
    run: &CapturedRun,
    suite: &TestSuite,
    expectations: &Expectations,
    strict: bool,
) -> Result<MatrixReport, MatrixError> {
    let mut rows = Vec::with_capacity(run.calls.len());
    for call in &run.calls {
        let case = suite
            .case(&call.test)
            .ok_or_else(|| MatrixError::UnknownTest(call.test.clone()))?;
        let (expectation, reason) = expectations.lookup(&call.test, call.caller, call.callee);
        let combination = Combination {
            case,
            caller: call.caller,
            callee: call.callee,
            expectation,
            reason: reason.map(str::to_string),
        };
        let trace_id = combination.trace_id(&run.suite);
        rows.push(combination.conclude(
            trace_id,
            Ok(call.record.clone()),
            run.pointer_capture,
            strict,
            0,
        ));
    }
    Ok(MatrixReport::from_rows(
        &run.suite,
        run.pointer_capture,
        strict,
        rows,
    ))
}
