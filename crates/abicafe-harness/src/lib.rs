//! Equivalence matrix harness for abicafe fixtures.
//!
//! This crate provides:
//! - Test suites: signature descriptors and the variants each test runs in
//! - Registry: resolution of (signature, representation) to linked fixtures
//! - Runner: one call per combination, each inside its own capture scope
//! - Check: byte-exact comparison of the four captured buffers
//! - Expectations: per-combination rules and the conclusions they yield
//! - Matrix: every ordered caller/callee pair, aggregated per pair
//! - Capture: persisted runs for offline comparison
//! - Report generation: human-readable + machine-readable matrix reports

#![forbid(unsafe_code)]

pub mod capture;
pub mod check;
pub mod config;
pub mod diff;
pub mod error;
pub mod expectations;
pub mod fixtures;
pub mod matrix;
pub mod registry;
pub mod report;
pub mod runner;
pub mod structured_log;

pub use capture::{CapturedRun, compare_captured};
pub use check::{BufferPair, Mismatch, MismatchClass, MismatchKind};
pub use config::HarnessConfig;
pub use error::MatrixError;
pub use expectations::{Conclusion, Expectation, Expectations};
pub use fixtures::{Signature, TestCase, TestSuite};
pub use matrix::{CombinationRow, MatrixOptions, MatrixReport, build_matrix};
pub use registry::FixtureRegistry;
pub use runner::TestRunner;
