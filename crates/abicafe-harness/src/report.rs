//! Report generation for matrix results.

use std::fmt::Write as _;

use abicafe_capture::Representation;

use crate::check::MismatchKind;
use crate::diff::render_bytes_diff;
use crate::expectations::Conclusion;
use crate::matrix::{CombinationRow, MatrixReport};

fn cell(conclusion: Conclusion) -> &'static str {
    match conclusion {
        Conclusion::Passed => "PASS",
        Conclusion::Failed => "FAIL",
        Conclusion::Busted => "BUSTED",
        Conclusion::Skipped => "SKIP",
        Conclusion::Error => "ERROR",
    }
}

impl MatrixReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;
        let _ = writeln!(out, "# ABI equivalence matrix: {}\n", self.suite);
        let _ = writeln!(out, "- Pointer capture: {}", self.pointer_capture);
        let _ = writeln!(out, "- Strict: {}", self.strict);
        let _ = writeln!(out, "- Total: {}", s.total_combinations);
        let _ = writeln!(out, "- Passed: {}", s.passed);
        let _ = writeln!(out, "- Failed: {}", s.failed);
        let _ = writeln!(out, "- Busted: {}", s.busted);
        let _ = writeln!(out, "- Skipped: {}", s.skipped);
        let _ = writeln!(out, "- Errors: {}", s.errors);
        let _ = writeln!(
            out,
            "- Mismatches: {} structural, {} content\n",
            s.structural_mismatches, s.content_mismatches
        );

        let mut tests: Vec<&str> = self.cases.iter().map(|r| r.test.as_str()).collect();
        tests.dedup();
        for test in tests {
            self.render_grid(&mut out, test);
        }

        let troubled: Vec<&CombinationRow> = self
            .cases
            .iter()
            .filter(|r| r.error.is_some() || !r.mismatches.is_empty())
            .collect();
        if !troubled.is_empty() {
            out.push_str("## Details\n\n");
            for row in troubled {
                render_details(&mut out, row);
            }
        }
        out
    }

    fn render_grid(&self, out: &mut String, test: &str) {
        let rows: Vec<&CombinationRow> = self.cases.iter().filter(|r| r.test == test).collect();
        let mut variants: Vec<Representation> = rows.iter().map(|r| r.caller).collect();
        variants.dedup();

        let _ = writeln!(out, "## {test}\n");
        out.push_str("| caller \\ callee |");
        for v in &variants {
            let _ = write!(out, " {v} |");
        }
        out.push_str("\n|---|");
        out.push_str(&"---|".repeat(variants.len()));
        out.push('\n');
        for caller in &variants {
            let _ = write!(out, "| {caller} |");
            for callee in &variants {
                let label = rows
                    .iter()
                    .find(|r| r.caller == *caller && r.callee == *callee)
                    .map_or("-", |r| cell(r.conclusion));
                let _ = write!(out, " {label} |");
            }
            out.push('\n');
        }
        out.push('\n');
    }
}

fn render_details(out: &mut String, row: &CombinationRow) {
    let _ = writeln!(
        out,
        "### {} `{}` -> `{}`: {} (expected {})\n",
        row.test,
        row.caller,
        row.callee,
        cell(row.conclusion),
        row.expectation
    );
    if let Some(reason) = &row.reason {
        let _ = writeln!(out, "> {reason}\n");
    }
    if let Some(err) = &row.error {
        let _ = writeln!(out, "- error: {err}\n");
        return;
    }
    for mismatch in &row.mismatches {
        let _ = writeln!(out, "- {}: {mismatch}", mismatch.pair.as_str());
    }
    out.push('\n');
    for mismatch in &row.mismatches {
        if let MismatchKind::Content {
            value,
            field,
            expected,
            actual,
            ..
        } = &mismatch.kind
        {
            let _ = writeln!(
                out,
                "```diff\n# {} value {value} field {field}\n{}```\n",
                mismatch.pair.as_str(),
                render_bytes_diff(expected, actual)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{BufferPair, Mismatch};
    use crate::expectations::Expectation;
    use abicafe_capture::PointerCapture;

    fn row(caller: Representation, callee: Representation, conclusion: Conclusion) -> CombinationRow {
        CombinationRow {
            trace_id: format!("unit::t::{caller}->{callee}"),
            test: "t".to_string(),
            caller,
            callee,
            expectation: Expectation::Pass,
            reason: None,
            conclusion,
            mismatches: Vec::new(),
            structural: 0,
            content: 0,
            error: None,
            duration_us: 1,
            record: None,
        }
    }

    #[test]
    fn markdown_has_grid_and_details() {
        use Representation::{EmulatedUnaligned, Native};
        let mut bad = row(Native, EmulatedUnaligned, Conclusion::Failed);
        bad.mismatches.push(Mismatch {
            pair: BufferPair::Inputs,
            kind: MismatchKind::Content {
                value: 5,
                field: 0,
                offset: 0,
                expected: vec![1, 2],
                actual: vec![3, 2],
            },
        });
        bad.content = 1;
        let report = MatrixReport::from_rows(
            "unit",
            PointerCapture::Address,
            false,
            vec![
                row(Native, Native, Conclusion::Passed),
                bad,
                row(EmulatedUnaligned, Native, Conclusion::Passed),
                row(EmulatedUnaligned, EmulatedUnaligned, Conclusion::Passed),
            ],
        );
        let md = report.to_markdown();
        assert!(md.contains("# ABI equivalence matrix: unit"));
        assert!(md.contains("| caller \\ callee | native | emulated-unaligned |"));
        assert!(md.contains("| native | PASS | FAIL |"));
        assert!(md.contains("### t `native` -> `emulated-unaligned`: FAIL (expected pass)"));
        assert!(md.contains("-01 02\n+03 02"));
    }

    #[test]
    fn clean_report_has_no_details_section() {
        let report = MatrixReport::from_rows(
            "unit",
            PointerCapture::Pointee,
            true,
            vec![row(Representation::Native, Representation::Native, Conclusion::Passed)],
        );
        let md = report.to_markdown();
        assert!(!md.contains("## Details"));
        assert!(md.contains("- Pointer capture: pointee"));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["summary"]["passed"], 1);
        assert_eq!(json["pointer_capture"], "pointee");
    }
}
