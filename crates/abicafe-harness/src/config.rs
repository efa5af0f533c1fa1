//! Harness configuration.
//!
//! Defaults come from the environment and are overridden by CLI flags:
//! - `ABICAFE_POINTER_CAPTURE`: `address` (default), `pointee` or `both`.
//! - `ABICAFE_JOBS`: worker threads for the matrix; defaults to the
//!   available parallelism.
//! - `ABICAFE_STRICT`: `1|true|yes|on` ignores expectation rules.
//!
//! Unparseable values fall back to the default rather than failing.

use abicafe_capture::{CaptureOptions, PointerCapture};

use crate::matrix::MatrixOptions;

pub const ENV_POINTER_CAPTURE: &str = "ABICAFE_POINTER_CAPTURE";
pub const ENV_JOBS: &str = "ABICAFE_JOBS";
pub const ENV_STRICT: &str = "ABICAFE_STRICT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    pub pointer_capture: PointerCapture,
    pub jobs: usize,
    pub strict: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            pointer_capture: PointerCapture::default(),
            jobs: default_jobs(),
            strict: false,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

fn parse_bool_loose(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl HarnessConfig {
    /// Resolve from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(mode) = lookup(ENV_POINTER_CAPTURE)
            .as_deref()
            .and_then(PointerCapture::from_str_loose)
        {
            config.pointer_capture = mode;
        }
        if let Some(jobs) = lookup(ENV_JOBS)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|jobs| *jobs > 0)
        {
            config.jobs = jobs;
        }
        if let Some(strict) = lookup(ENV_STRICT).as_deref().and_then(parse_bool_loose) {
            config.strict = strict;
        }
        config
    }

    #[must_use]
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions::default().with_pointer_capture(self.pointer_capture)
    }

    /// Matrix options for a run over every test and variant.
    #[must_use]
    pub fn matrix_options(&self) -> MatrixOptions {
        MatrixOptions {
            capture: self.capture_options(),
            strict: self.strict,
            jobs: self.jobs,
            ..MatrixOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = HarnessConfig::from_lookup(lookup(&[]));
        assert_eq!(config.pointer_capture, PointerCapture::Address);
        assert!(!config.strict);
        assert!(config.jobs >= 1);
    }

    #[test]
    fn variables_are_parsed_loosely() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (ENV_POINTER_CAPTURE, " Both "),
            (ENV_JOBS, "3"),
            (ENV_STRICT, "YES"),
        ]));
        assert_eq!(config.pointer_capture, PointerCapture::Both);
        assert_eq!(config.jobs, 3);
        assert!(config.strict);

        let options = config.matrix_options();
        assert_eq!(options.capture.pointer_capture, PointerCapture::Both);
        assert!(options.strict);
        assert!(options.tests.is_empty());
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (ENV_POINTER_CAPTURE, "everything"),
            (ENV_JOBS, "0"),
            (ENV_STRICT, "maybe"),
        ]));
        let default = HarnessConfig::default();
        assert_eq!(config.pointer_capture, default.pointer_capture);
        assert_eq!(config.jobs, default.jobs);
        assert_eq!(config.strict, default.strict);
    }
}
