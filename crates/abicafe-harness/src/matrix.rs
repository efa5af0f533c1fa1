//! Equivalence matrix generation.
//!
//! For every selected test case this runs each ordered (caller, callee)
//! pair of its variants, compares the four captured buffers and emits a
//! machine-readable matrix with pair-level aggregation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use abicafe_capture::{CallRecord, CaptureOptions, PointerCapture, Representation};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::check::{ExpectedShape, Mismatch, classify, compare_call};
use crate::error::MatrixError;
use crate::expectations::{Conclusion, Expectation, Expectations, conclude};
use crate::fixtures::{TestCase, TestSuite};
use crate::registry::FixtureRegistry;
use crate::runner::TestRunner;
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

/// Knobs for one matrix run.
#[derive(Debug, Clone)]
pub struct MatrixOptions {
    pub capture: CaptureOptions,
    /// Treat every mismatch as a failure regardless of expectations.
    pub strict: bool,
    /// Worker threads; `0` and `1` both mean sequential.
    pub jobs: usize,
    /// Restrict every case to these variants.
    pub variants: Option<Vec<Representation>>,
    /// Run only these tests; empty means all.
    pub tests: Vec<String>,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            capture: CaptureOptions::default(),
            strict: false,
            jobs: 1,
            variants: None,
            tests: Vec::new(),
        }
    }
}

/// One (test, caller, callee) combination in the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationRow {
    pub trace_id: String,
    pub test: String,
    pub caller: Representation,
    pub callee: Representation,
    pub expectation: Expectation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub conclusion: Conclusion,
    pub mismatches: Vec<Mismatch>,
    pub structural: usize,
    pub content: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_us: u64,
    /// Closed record of the call, kept for persistence.
    #[serde(skip)]
    pub record: Option<CallRecord>,
}

impl CombinationRow {
    #[must_use]
    pub fn is_same_variant(&self) -> bool {
        self.caller == self.callee
    }
}

/// Aggregate row for one (caller, callee) pair across all tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairMatrixRow {
    pub caller: Representation,
    pub callee: Representation,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub busted: u64,
    pub skipped: u64,
    pub errors: u64,
    pub pass_rate_percent: f64,
}

/// Matrix summary counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrixSummary {
    pub total_combinations: u64,
    pub passed: u64,
    pub failed: u64,
    pub busted: u64,
    pub skipped: u64,
    pub errors: u64,
    pub structural_mismatches: u64,
    pub content_mismatches: u64,
    /// Passed over executed (non-skipped) combinations.
    pub pass_rate_percent: f64,
}

/// Top-level matrix report payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixReport {
    pub schema_version: String,
    pub suite: String,
    pub pointer_capture: PointerCapture,
    pub strict: bool,
    pub summary: MatrixSummary,
    pub pair_matrix: Vec<PairMatrixRow>,
    pub cases: Vec<CombinationRow>,
}

impl MatrixReport {
    /// Assemble a report from finished rows, sorting them by
    /// (test, caller, callee).
    #[must_use]
    pub fn from_rows(
        suite: &str,
        pointer_capture: PointerCapture,
        strict: bool,
        mut rows: Vec<CombinationRow>,
    ) -> Self {
        rows.sort_by(|a, b| {
            a.test
                .cmp(&b.test)
                .then_with(|| a.caller.cmp(&b.caller))
                .then_with(|| a.callee.cmp(&b.callee))
        });

        let mut summary = MatrixSummary::default();
        let mut pair_buckets: BTreeMap<(Representation, Representation), [u64; 6]> =
            BTreeMap::new();
        for row in &rows {
            let slot = match row.conclusion {
                Conclusion::Passed => 1,
                Conclusion::Failed => 2,
                Conclusion::Busted => 3,
                Conclusion::Skipped => 4,
                Conclusion::Error => 5,
            };
            let bucket = pair_buckets.entry((row.caller, row.callee)).or_default();
            bucket[0] = bucket[0].saturating_add(1);
            bucket[slot] = bucket[slot].saturating_add(1);

            summary.total_combinations += 1;
            match row.conclusion {
                Conclusion::Passed => summary.passed += 1,
                Conclusion::Failed => summary.failed += 1,
                Conclusion::Busted => summary.busted += 1,
                Conclusion::Skipped => summary.skipped += 1,
                Conclusion::Error => summary.errors += 1,
            }
            summary.structural_mismatches += row.structural as u64;
            summary.content_mismatches += row.content as u64;
        }
        summary.pass_rate_percent = ratio_percent(
            summary.passed,
            summary.total_combinations.saturating_sub(summary.skipped),
        );

        let pair_matrix = pair_buckets
            .into_iter()
            .map(
                |((caller, callee), [total, passed, failed, busted, skipped, errors])| {
                    PairMatrixRow {
                        caller,
                        callee,
                        total,
                        passed,
                        failed,
                        busted,
                        skipped,
                        errors,
                        pass_rate_percent: ratio_percent(passed, total.saturating_sub(skipped)),
                    }
                },
            )
            .collect();

        Self {
            schema_version: "v1".to_string(),
            suite: suite.to_string(),
            pointer_capture,
            strict,
            summary,
            pair_matrix,
            cases: rows,
        }
    }

    /// Returns true when no failures/errors are present.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.summary.failed == 0 && self.summary.errors == 0
    }

    /// Whether any combination should fail the run.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.cases.iter().any(|row| row.conclusion.is_fatal())
    }

    #[must_use]
    pub fn row(
        &self,
        test: &str,
        caller: Representation,
        callee: Representation,
    ) -> Option<&CombinationRow> {
        self.cases
            .iter()
            .find(|r| r.test == test && r.caller == caller && r.callee == callee)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A combination scheduled to run, with its resolved expectation.
#[derive(Debug, Clone)]
pub(crate) struct Combination<'a> {
    pub case: &'a TestCase,
    pub caller: Representation,
    pub callee: Representation,
    pub expectation: Expectation,
    pub reason: Option<String>,
}

impl Combination<'_> {
    pub(crate) fn trace_id(&self, suite: &str) -> String {
        format!(
            "{suite}::{test}::{caller}->{callee}",
            test = self.case.name,
            caller = self.caller,
            callee = self.callee
        )
    }

    fn skipped(self, trace_id: String) -> CombinationRow {
        CombinationRow {
            trace_id,
            test: self.case.name.clone(),
            caller: self.caller,
            callee: self.callee,
            expectation: self.expectation,
            reason: self.reason,
            conclusion: Conclusion::Skipped,
            mismatches: Vec::new(),
            structural: 0,
            content: 0,
            error: None,
            duration_us: 0,
            record: None,
        }
    }

    /// Compare a finished call (or its fault) and conclude.
    pub(crate) fn conclude(
        self,
        trace_id: String,
        outcome: Result<CallRecord, MatrixError>,
        mode: PointerCapture,
        strict: bool,
        duration_us: u64,
    ) -> CombinationRow {
        let shape = ExpectedShape::of(&self.case.signature, mode);
        let expectation = self.expectation;
        let mut row = self.skipped(trace_id);
        row.duration_us = duration_us;
        match outcome {
            Ok(record) => {
                let mismatches = compare_call(&record, Some(&shape));
                let (structural, content) = classify(&mismatches);
                row.conclusion = conclude(expectation, !mismatches.is_empty(), strict);
                row.mismatches = mismatches;
                row.structural = structural;
                row.content = content;
                row.record = Some(record);
            }
            Err(err) => {
                row.conclusion = Conclusion::Error;
                row.error = Some(err.to_string());
            }
        }
        row
    }
}

/// The cases named in `tests`, or every case when it is empty.
fn select_cases<'a>(
    suite: &'a TestSuite,
    tests: &[String],
) -> Result<Vec<&'a TestCase>, MatrixError> {
    if tests.is_empty() {
        return Ok(suite.cases.iter().collect());
    }
    tests
        .iter()
        .map(|name| {
            suite
                .case(name)
                .ok_or_else(|| MatrixError::UnknownTest(name.clone()))
        })
        .collect()
}

/// Every ordered (caller, callee) pair of the case's variants that survives
/// the variant filter.
fn combinations<'a>(
    case: &'a TestCase,
    filter: Option<&[Representation]>,
    expectations: &Expectations,
) -> Vec<Combination<'a>> {
    let variants: Vec<Representation> = case
        .variants
        .iter()
        .copied()
        .filter(|v| filter.is_none_or(|allowed| allowed.contains(v)))
        .collect();
    let mut out = Vec::with_capacity(variants.len() * variants.len());
    for &caller in &variants {
        for &callee in &variants {
            let (expectation, reason) = expectations.lookup(&case.name, caller, callee);
            out.push(Combination {
                case,
                caller,
                callee,
                expectation,
                reason: reason.map(str::to_string),
            });
        }
    }
    out
}

/// Run the equivalence matrix.
///
/// Every selected case is validated against the linked fixtures before any
/// call is made. Usage faults during a call become `error` rows; the rest
/// of the matrix still runs.
pub fn build_matrix(
    suite: &TestSuite,
    registry: &FixtureRegistry,
    expectations: &Expectations,
    options: &MatrixOptions,
    log: Option<&Mutex<LogEmitter>>,
) -> Result<MatrixReport, MatrixError> {
    let cases = select_cases(suite, &options.tests)?;
    for case in &cases {
        registry.validate(case)?;
    }
    let work: Vec<Combination<'_>> = cases
        .iter()
        .flat_map(|case| combinations(case, options.variants.as_deref(), expectations))
        .collect();

    let mode = options.capture.pointer_capture;
    if let Some(log) = log {
        let entry = LogEntry::new("", LogLevel::Info, "matrix_start")
            .with_pointer_capture(mode.as_str())
            .with_details(serde_json::json!({
                "suite": suite.suite,
                "cases": cases.len(),
                "combinations": work.len(),
                "strict": options.strict,
                "jobs": options.jobs,
            }));
        log.lock().emit_entry(entry)?;
    }

    let runner = TestRunner::new(registry, options.capture);
    let cursor = AtomicUsize::new(0);
    let rows = Mutex::new(Vec::with_capacity(work.len()));
    let log_error = Mutex::new(None::<std::io::Error>);

    let run_worker = || {
        loop {
            let idx = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(combination) = work.get(idx).cloned() else {
                break;
            };
            let trace_id = combination.trace_id(&suite.suite);
            let row = if combination.expectation == Expectation::Skip {
                combination.skipped(trace_id)
            } else {
                let started = Instant::now();
                let outcome = runner.run(combination.case, combination.caller, combination.callee);
                let duration_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
                combination.conclude(trace_id, outcome, mode, options.strict, duration_us)
            };
            if let Some(log) = log
                && let Err(err) = log_row(log, &row, mode)
            {
                log_error.lock().get_or_insert(err);
            }
            rows.lock().push(row);
        }
    };

    let jobs = options.jobs.clamp(1, work.len().max(1));
    if jobs == 1 {
        run_worker();
    } else {
        std::thread::scope(|scope| {
            for _ in 0..jobs {
                scope.spawn(run_worker);
            }
        });
    }

    if let Some(err) = log_error.into_inner() {
        return Err(err.into());
    }
    let report = MatrixReport::from_rows(
        &suite.suite,
        mode,
        options.strict,
        rows.into_inner(),
    );

    if let Some(log) = log {
        let s = &report.summary;
        let entry = LogEntry::new("", LogLevel::Info, "matrix_complete")
            .with_pointer_capture(mode.as_str())
            .with_details(serde_json::json!({
                "total": s.total_combinations,
                "passed": s.passed,
                "failed": s.failed,
                "busted": s.busted,
                "skipped": s.skipped,
                "errors": s.errors,
            }));
        let mut emitter = log.lock();
        emitter.emit_entry(entry)?;
        emitter.flush()?;
    }
    Ok(report)
}

fn log_row(
    log: &Mutex<LogEmitter>,
    row: &CombinationRow,
    mode: PointerCapture,
) -> std::io::Result<()> {
    let level = match row.conclusion {
        Conclusion::Passed | Conclusion::Skipped => LogLevel::Info,
        Conclusion::Busted => LogLevel::Warn,
        Conclusion::Failed | Conclusion::Error => LogLevel::Error,
    };
    let mut entry = LogEntry::new(row.trace_id.clone(), level, "combination")
        .with_combination(&row.test, row.caller.as_str(), row.callee.as_str())
        .with_pointer_capture(mode.as_str())
        .with_expectation(row.expectation.as_str())
        .with_outcome(Outcome::from(row.conclusion))
        .with_mismatches(row.mismatches.len() as u64)
        .with_duration_us(row.duration_us);
    if let Some(err) = &row.error {
        entry = entry.with_details(serde_json::json!({ "error": err }));
    } else if let Some(first) = row.mismatches.first() {
        entry = entry.with_details(serde_json::json!({
            "first_mismatch": first.to_string(),
            "structural": row.structural,
            "content": row.content,
        }));
    }
    log.lock().emit_entry(entry)
}

fn ratio_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 * 100.0) / denominator as f64
}
