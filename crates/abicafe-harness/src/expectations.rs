//! Per-combination expectations and how they turn results into conclusions.
//!
//! A combination is keyed `test::caller->callee`, for example
//! `i128_six_args::native->emulated-unaligned`. Rules match keys with `*`
//! wildcards; the last matching rule wins and the default is `pass`.

use std::fmt;

use abicafe_capture::Representation;
use serde::{Deserialize, Serialize};

use crate::error::MatrixError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    /// Both sides must agree.
    #[default]
    Pass,
    /// The sides must disagree (a negative control).
    Fail,
    /// The sides disagree because of a known defect; reported but not fatal.
    Busted,
    /// Run and report, ignore the verdict.
    Random,
    /// Do not run.
    Skip,
}

impl Expectation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Busted => "busted",
            Self::Random => "random",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Passed,
    Failed,
    /// A known-defect combination observed failing.
    Busted,
    Skipped,
    /// A usage or symbol fault stopped the combination.
    Error,
}

impl Conclusion {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Busted => "busted",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }

    /// Whether this conclusion should fail the run.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn an observed result into a conclusion.
///
/// `strict` ignores every rule except `skip`: any mismatch fails.
#[must_use]
pub fn conclude(expectation: Expectation, mismatched: bool, strict: bool) -> Conclusion {
    let expectation = match expectation {
        Expectation::Skip => return Conclusion::Skipped,
        _ if strict => Expectation::Pass,
        other => other,
    };
    match (expectation, mismatched) {
        (Expectation::Pass, false) | (Expectation::Fail, true) | (Expectation::Random, _) => {
            Conclusion::Passed
        }
        (Expectation::Busted, true) => Conclusion::Busted,
        _ => Conclusion::Failed,
    }
}

#[must_use]
pub fn combination_key(test: &str, caller: Representation, callee: Representation) -> String {
    format!("{test}::{caller}->{callee}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationRule {
    pub pattern: String,
    pub expect: Expectation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// On-disk form of an expectations file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationFile {
    pub version: String,
    pub rules: Vec<ExpectationRule>,
}

/// An ordered rule list.
#[derive(Debug, Clone, Default)]
pub struct Expectations {
    rules: Vec<ExpectationRule>,
}

impl Expectations {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Rules known to hold on the target this binary was built for.
    #[must_use]
    pub fn builtin() -> Self {
        let mut rules = Vec::new();
        if cfg!(all(target_arch = "x86_64", target_os = "linux")) {
            let reason = "SysV places 16-byte-aligned wide integers at the next 16-byte stack \
                          slot; the unaligned struct does not";
            for pattern in [
                "i128_six_args::native->emulated-unaligned",
                "i128_six_args::emulated-unaligned->native",
                "i128_six_args::emulated-aligned->emulated-unaligned",
                "i128_six_args::emulated-unaligned->emulated-aligned",
            ] {
                rules.push(ExpectationRule {
                    pattern: pattern.to_string(),
                    expect: Expectation::Busted,
                    reason: Some(reason.to_string()),
                });
            }
        }
        Self { rules }
    }

    pub fn from_json(json: &str) -> Result<Self, MatrixError> {
        let file: ExpectationFile = serde_json::from_str(json)?;
        for rule in &file.rules {
            validate_pattern(&rule.pattern)?;
        }
        Ok(Self { rules: file.rules })
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, MatrixError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Append `other`'s rules so they take precedence over these.
    #[must_use]
    pub fn overlay(mut self, other: Self) -> Self {
        self.rules.extend(other.rules);
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[ExpectationRule] {
        &self.rules
    }

    /// Expectation for one combination, with the reason of the rule that set it.
    #[must_use]
    pub fn lookup(
        &self,
        test: &str,
        caller: Representation,
        callee: Representation,
    ) -> (Expectation, Option<&str>) {
        let key = combination_key(test, caller, callee);
        self.rules
            .iter()
            .rev()
            .find(|rule| glob_match(&rule.pattern, &key))
            .map_or((Expectation::Pass, None), |rule| {
                (rule.expect, rule.reason.as_deref())
            })
    }
}

fn validate_pattern(pattern: &str) -> Result<(), MatrixError> {
    let invalid = |reason: &str| MatrixError::InvalidExpectation {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };
    if pattern.trim().is_empty() {
        return Err(invalid("empty pattern"));
    }
    if pattern != "*" && !pattern.contains("::") {
        return Err(invalid("expected test::caller->callee"));
    }
    Ok(())
}

/// `*` matches any run of characters, everything else matches itself.
fn glob_match(pattern: &str, text: &str) -> bool {
    let (p, t) = (pattern.as_bytes(), text.as_bytes());
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use Representation::{EmulatedAligned, EmulatedUnaligned, Native};

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("i128_*::native->*", "i128_by_ref::native->emulated-aligned"));
        assert!(!glob_match("i128_*::native->*", "i128_by_ref::emulated-aligned->native"));
        assert!(glob_match("a*b*c", "aXXbYc"));
        assert!(!glob_match("a*b", "aXXbY"));
    }

    #[test]
    fn conclusions_follow_the_rule_unless_strict() {
        assert_eq!(conclude(Expectation::Pass, false, false), Conclusion::Passed);
        assert_eq!(conclude(Expectation::Pass, true, false), Conclusion::Failed);
        assert_eq!(conclude(Expectation::Fail, true, false), Conclusion::Passed);
        assert_eq!(conclude(Expectation::Fail, false, false), Conclusion::Failed);
        assert_eq!(conclude(Expectation::Busted, true, false), Conclusion::Busted);
        assert_eq!(conclude(Expectation::Busted, false, false), Conclusion::Failed);
        assert_eq!(conclude(Expectation::Random, true, false), Conclusion::Passed);
        assert_eq!(conclude(Expectation::Skip, true, true), Conclusion::Skipped);

        assert_eq!(conclude(Expectation::Busted, true, true), Conclusion::Failed);
        assert_eq!(conclude(Expectation::Fail, false, true), Conclusion::Passed);
    }

    #[test]
    fn later_rules_override_earlier_ones() {
        let custom = Expectations::from_json(
            r#"{"version":"v1","rules":[
                {"pattern":"*::*->emulated-unaligned","expect":"random"},
                {"pattern":"i128_by_ref::*->*","expect":"skip","reason":"slow"}
            ]}"#,
        )
        .unwrap();
        let rules = Expectations::builtin().overlay(custom);

        assert_eq!(
            rules.lookup("i128_six_args", Native, EmulatedUnaligned).0,
            Expectation::Random
        );
        assert_eq!(
            rules.lookup("i128_by_ref", Native, Native),
            (Expectation::Skip, Some("slow"))
        );
        assert_eq!(
            rules.lookup("i128_six_args", EmulatedAligned, Native).0,
            Expectation::Pass
        );
    }

    #[cfg(all(target_arch = "x86_64", target_os = "linux"))]
    #[test]
    fn builtin_marks_unaligned_six_args_as_known_failure() {
        let rules = Expectations::builtin();
        assert_eq!(
            rules.lookup("i128_six_args", EmulatedUnaligned, Native).0,
            Expectation::Busted
        );
        assert_eq!(
            rules.lookup("i128_six_args", EmulatedUnaligned, EmulatedUnaligned).0,
            Expectation::Pass
        );
        assert_eq!(
            rules.lookup("i128_by_ref", Native, EmulatedUnaligned).0,
            Expectation::Pass
        );
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        let err = Expectations::from_json(r#"{"version":"v1","rules":[{"pattern":"native","expect":"fail"}]}"#)
            .unwrap_err();
        assert!(matches!(err, MatrixError::InvalidExpectation { .. }));
    }
}
