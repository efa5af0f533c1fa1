//! CLI entrypoint for the abicafe equivalence matrix.

use std::path::{Path, PathBuf};

use abicafe_capture::{PointerCapture, Representation};
use abicafe_harness::structured_log::{ArtifactIndex, LogEmitter, LogEntry, LogLevel};
use abicafe_harness::{
    CapturedRun, Expectations, FixtureRegistry, HarnessConfig, MatrixError, MatrixReport,
    TestSuite, build_matrix, compare_captured,
};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;

/// ABI equivalence tooling for wide-integer representations.
#[derive(Debug, Parser)]
#[command(name = "harness")]
#[command(about = "Capture and compare values crossing a compiled call boundary")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List test cases and the variants they run in.
    List {
        /// Test suite JSON (defaults to the built-in suite).
        #[arg(long)]
        suite: Option<PathBuf>,
    },
    /// Run the equivalence matrix.
    Run {
        /// Test suite JSON (defaults to the built-in suite).
        #[arg(long)]
        suite: Option<PathBuf>,
        /// Only run these tests (repeatable).
        #[arg(long = "test")]
        tests: Vec<String>,
        /// Restrict to these variants (comma separated).
        #[arg(long, value_delimiter = ',')]
        variants: Vec<String>,
        /// How pointer fields are recorded: address, pointee or both.
        #[arg(long)]
        pointer_capture: Option<String>,
        /// Expectations JSON overlaid on the built-in rules.
        #[arg(long)]
        expectations: Option<PathBuf>,
        /// Treat every mismatch as a failure.
        #[arg(long)]
        strict: bool,
        /// Worker threads.
        #[arg(long)]
        jobs: Option<usize>,
        /// Output report path (markdown; JSON is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Persist every captured call to this JSON file.
        #[arg(long)]
        capture_out: Option<PathBuf>,
    },
    /// Re-check a persisted run offline.
    Compare {
        /// Captured run JSON written by `run --capture-out`.
        #[arg(long)]
        captured: PathBuf,
        /// Test suite JSON (defaults to the built-in suite).
        #[arg(long)]
        suite: Option<PathBuf>,
        /// Expectations JSON overlaid on the built-in rules.
        #[arg(long)]
        expectations: Option<PathBuf>,
        /// Treat every mismatch as a failure.
        #[arg(long)]
        strict: bool,
        /// Output report path (markdown; JSON is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::List { suite } => {
            let suite = load_suite(suite.as_deref())?;
            println!("suite {} ({})", suite.suite, suite.version);
            for case in &suite.cases {
                let variants: Vec<&str> = case.variants.iter().map(|v| v.as_str()).collect();
                println!("{}: {} [{}]", case.name, case.signature, variants.join(", "));
                if !case.description.is_empty() {
                    println!("    {}", case.description);
                }
            }
        }
        Command::Run {
            suite,
            tests,
            variants,
            pointer_capture,
            expectations,
            strict,
            jobs,
            report,
            log,
            capture_out,
        } => {
            let suite = load_suite(suite.as_deref())?;
            let expectations = load_expectations(expectations.as_deref())?;

            let config = HarnessConfig::from_env();
            let mut options = config.matrix_options();
            if let Some(raw) = pointer_capture {
                let mode = PointerCapture::from_str_loose(&raw).ok_or_else(|| {
                    format!("Unsupported pointer capture '{raw}', expected address|pointee|both")
                })?;
                options.capture = options.capture.with_pointer_capture(mode);
            }
            options.strict |= strict;
            if let Some(jobs) = jobs {
                options.jobs = jobs;
            }
            options.tests = tests;
            if !variants.is_empty() {
                options.variants = Some(parse_variants(&variants)?);
            }

            let run_id = format!("abicafe-{}", std::process::id());
            let emitter = match &log {
                Some(path) => Some(Mutex::new(LogEmitter::to_file(path, &run_id)?)),
                None => None,
            };

            eprintln!(
                "Running suite {} (pointer capture {}, jobs {})",
                suite.suite, options.capture.pointer_capture, options.jobs
            );
            let matrix = build_matrix(
                &suite,
                &FixtureRegistry::linked(),
                &expectations,
                &options,
                emitter.as_ref(),
            )?;
            print_summary(&matrix);

            let mut index = ArtifactIndex::new(&run_id);
            if let Some(path) = &report {
                write_report(&matrix, path, &mut index)?;
            } else {
                print!("{}", matrix.to_markdown());
            }
            if let Some(path) = &capture_out {
                CapturedRun::from_report(&matrix).write_file(path)?;
                index.add_file(path, "captures")?;
                eprintln!("Wrote captures to {}", path.display());
            }
            if let Some(path) = &log {
                if let Some(emitter) = &emitter {
                    let refs = index.artifacts.iter().map(|a| a.path.clone()).collect();
                    let entry = LogEntry::new("", LogLevel::Info, "artifacts_written")
                        .with_pointer_capture(options.capture.pointer_capture.as_str())
                        .with_artifacts(refs);
                    let mut emitter = emitter.lock();
                    emitter.emit_entry(entry)?;
                    emitter.flush()?;
                }
                index.add_file(path, "log")?;
            }
            if let Some(anchor) = log.as_ref().or(report.as_ref()).or(capture_out.as_ref()) {
                let index_path = anchor.with_extension("artifacts.json");
                std::fs::write(&index_path, index.to_json()?)?;
                eprintln!("Wrote artifact index to {}", index_path.display());
            }

            if matrix.has_fatal() {
                return Err("Equivalence matrix has failed combinations".into());
            }
        }
        Command::Compare {
            captured,
            suite,
            expectations,
            strict,
            report,
        } => {
            let run = CapturedRun::from_file(&captured)?;
            let suite = load_suite(suite.as_deref())?;
            let expectations = load_expectations(expectations.as_deref())?;
            let strict = strict || HarnessConfig::from_env().strict;

            eprintln!(
                "Comparing {} captured call(s) from {}",
                run.calls.len(),
                captured.display()
            );
            let matrix = compare_captured(&run, &suite, &expectations, strict)?;
            print_summary(&matrix);

            if let Some(path) = &report {
                let mut index = ArtifactIndex::new(format!("compare-{}", std::process::id()));
                index.add_file(&captured, "captures")?;
                write_report(&matrix, path, &mut index)?;
                std::fs::write(path.with_extension("artifacts.json"), index.to_json()?)?;
            } else {
                print!("{}", matrix.to_markdown());
            }

            if matrix.has_fatal() {
                return Err("Offline comparison has failed combinations".into());
            }
        }
    }

    Ok(())
}

fn load_suite(path: Option<&Path>) -> Result<TestSuite, Box<dyn std::error::Error>> {
    match path {
        Some(path) => TestSuite::from_file(path),
        None => Ok(TestSuite::builtin()),
    }
}

fn load_expectations(path: Option<&Path>) -> Result<Expectations, MatrixError> {
    let builtin = Expectations::builtin();
    match path {
        Some(path) => Ok(builtin.overlay(Expectations::from_file(path)?)),
        None => Ok(builtin),
    }
}

fn parse_variants(raw: &[String]) -> Result<Vec<Representation>, MatrixError> {
    raw.iter()
        .map(|v| {
            Representation::from_str_loose(v).ok_or_else(|| MatrixError::UnknownVariant(v.clone()))
        })
        .collect()
}

fn print_summary(matrix: &MatrixReport) {
    let s = &matrix.summary;
    eprintln!(
        "Matrix complete: total={}, passed={}, failed={}, busted={}, skipped={}, errors={}",
        s.total_combinations, s.passed, s.failed, s.busted, s.skipped, s.errors
    );
}

fn write_report(
    matrix: &MatrixReport,
    path: &Path,
    index: &mut ArtifactIndex,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    eprintln!("Writing report to {}", path.display());
    std::fs::write(path, matrix.to_markdown())?;
    let json_path = path.with_extension("json");
    std::fs::write(&json_path, matrix.to_json()?)?;
    index.add_file(path, "report_md")?;
    index.add_file(&json_path, "report_json")?;
    Ok(())
}
