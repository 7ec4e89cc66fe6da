// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events emitted during a run, and the statistics derived from them.

use crate::{
    build::{BuildTarget, HygieneReport},
    compare::OutputMismatch,
    errors::{
        CoverageRelocateError, DisplayErrorChain, HygieneScanError, ReferenceReadError,
        ReferenceWriteError, ScenarioExecError,
    },
};
use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use golden_trace_metadata::GoldenTraceExitCode;
use std::{fmt, time::Duration};

/// An event sent to a [`Reporter`](super::Reporter).
#[derive(Debug)]
pub enum ReporterEvent<'a> {
    /// The run started.
    RunStarted {
        /// What kind of run this is.
        mode: RunMode,

        /// The number of units that will be reported.
        unit_count: usize,

        /// When the run started.
        start_time: DateTime<FixedOffset>,
    },

    /// A unit started.
    UnitStarted {
        /// The unit.
        unit: &'a UnitId,
    },

    /// A unit finished.
    UnitFinished {
        /// The unit.
        unit: &'a UnitId,

        /// Its result.
        result: &'a UnitResult,
    },

    /// The run finished.
    RunFinished {
        /// Final statistics.
        stats: RunStats,

        /// How long the run took.
        elapsed: Duration,
    },
}

/// The kind of run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunMode {
    /// Output is compared against references.
    Verify,

    /// References are overwritten with fresh output.
    Regenerate,

    /// Only the clean and hygiene check run.
    Clean,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify => write!(f, "verify"),
            Self::Regenerate => write!(f, "regenerate"),
            Self::Clean => write!(f, "clean"),
        }
    }
}

/// One reported step of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UnitId {
    /// A build.
    Build {
        /// What is built.
        target: BuildTarget,

        /// Whether the XML backend is compiled in.
        xml_backend: bool,
    },

    /// A scenario, by name.
    Scenario(String),

    /// The clean followed by the scan for leftover artifacts.
    Hygiene,
}

impl UnitId {
    /// Returns the group this unit belongs to, used as the JUnit suite name.
    pub fn group(&self) -> &str {
        match self {
            Self::Build { .. } => "build",
            Self::Scenario(name) => name.split_once("::").map_or(name.as_str(), |(group, _)| group),
            Self::Hygiene => "hygiene",
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build {
                target: BuildTarget::Standalone,
                ..
            } => write!(f, "build::standalone"),
            Self::Build {
                target: BuildTarget::LibraryTest,
                xml_backend: true,
            } => write!(f, "build::library"),
            Self::Build {
                target: BuildTarget::LibraryTest,
                xml_backend: false,
            } => write!(f, "build::library_no_xml"),
            Self::Scenario(name) => write!(f, "{name}"),
            Self::Hygiene => write!(f, "hygiene::clean"),
        }
    }
}

/// The result of a unit.
#[derive(Debug)]
pub struct UnitResult {
    /// The status.
    pub status: UnitStatus,

    /// How long the unit took.
    pub time_taken: Duration,
}

/// The status of a finished unit.
#[derive(Debug)]
pub enum UnitStatus {
    /// The unit passed.
    Passed,

    /// The scenario's reference file was rewritten.
    Regenerated {
        /// The reference file.
        reference: Utf8PathBuf,
    },

    /// The unit was deliberately not run.
    Skipped {
        /// Why.
        reason: SkipReason,
    },

    /// The unit could not run because something it depends on failed. Counts as a failure.
    NotRun {
        /// Why.
        reason: NotRunReason,
    },

    /// The unit failed.
    Failed(Box<FailureDetail>),
}

impl UnitStatus {
    /// Returns true if this status counts as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::NotRun { .. })
    }
}

/// Why a unit was skipped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// The scenario has no reference file to regenerate.
    NoReference,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReference => write!(f, "no reference file"),
        }
    }
}

/// Why a unit was not run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NotRunReason {
    /// A build the unit depends on failed.
    BuildFailed(UnitId),
}

impl fmt::Display for NotRunReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildFailed(build) => write!(f, "{build} failed"),
        }
    }
}

/// Details about a failed unit.
#[derive(Debug)]
pub enum FailureDetail {
    /// The build system returned a non-zero exit code.
    BuildFailed {
        /// The command line.
        command: String,

        /// The exit code, if the build system wasn't killed by a signal.
        exit_code: Option<i32>,
    },

    /// The clean returned a non-zero exit code.
    CleanFailed {
        /// The command line.
        command: String,

        /// The exit code, if the build system wasn't killed by a signal.
        exit_code: Option<i32>,
    },

    /// The program's exit code differed from the expected one.
    UnexpectedExitCode {
        /// The expected exit code.
        expected: i32,

        /// The actual exit code, if the program wasn't killed by a signal.
        actual: Option<i32>,

        /// Captured standard error.
        stderr: Option<String>,
    },

    /// Normalized output differed from the reference.
    OutputMismatch {
        /// The reference file.
        reference: Utf8PathBuf,

        /// The mismatch.
        mismatch: OutputMismatch,
    },

    /// The library executable's summary lines differed from the standalone tool's.
    SummaryMismatch {
        /// The mismatch, with the standalone tool's lines as the reference.
        mismatch: OutputMismatch,
    },

    /// The program could not be run.
    Exec(ScenarioExecError),

    /// A reference or captured output file could not be read.
    ReferenceRead(ReferenceReadError),

    /// A reference file could not be written.
    ReferenceWrite(ReferenceWriteError),

    /// Build artifacts were left after a clean.
    Hygiene(HygieneReport),

    /// The source tree could not be scanned.
    HygieneScan(HygieneScanError),

    /// Coverage data could not be moved or removed.
    Coverage(CoverageRelocateError),
}

impl FailureDetail {
    /// Returns a one-line description of the failure.
    pub fn headline(&self) -> String {
        match self {
            Self::BuildFailed { command, exit_code } => {
                format!("`{command}` failed with {}", DisplayExitCode(*exit_code))
            }
            Self::CleanFailed { command, exit_code } => {
                format!("`{command}` failed with {}", DisplayExitCode(*exit_code))
            }
            Self::UnexpectedExitCode {
                expected, actual, ..
            } => format!(
                "expected exit code {expected}, found {}",
                DisplayExitCode(*actual)
            ),
            Self::OutputMismatch { mismatch, .. } => mismatch.headline(),
            Self::SummaryMismatch { mismatch } => format!(
                "summary lines differ from the standalone tool's at line {}",
                mismatch.first_difference + 1
            ),
            Self::Exec(error) => error.to_string(),
            Self::ReferenceRead(error) => error.to_string(),
            Self::ReferenceWrite(error) => error.to_string(),
            Self::Hygiene(report) => format!(
                "{} build {} left after clean",
                report.offenders.len(),
                crate::helpers::plural::files_str(report.offenders.len()),
            ),
            Self::HygieneScan(error) => error.to_string(),
            Self::Coverage(error) => error.to_string(),
        }
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildFailed { .. } | Self::CleanFailed { .. } => {
                writeln!(f, "{}", self.headline())
            }
            Self::UnexpectedExitCode { stderr, .. } => {
                writeln!(f, "{}", self.headline())?;
                write_stderr(f, stderr.as_deref())
            }
            Self::OutputMismatch {
                reference,
                mismatch,
            } => {
                writeln!(f, "reference file: {reference}")?;
                write!(f, "{mismatch}")
            }
            Self::SummaryMismatch { mismatch } => {
                writeln!(f, "{}", self.headline())?;
                write!(f, "{mismatch}")
            }
            Self::Exec(error) => writeln!(f, "{}", DisplayErrorChain::new(error)),
            Self::ReferenceRead(error) => writeln!(f, "{}", DisplayErrorChain::new(error)),
            Self::ReferenceWrite(error) => writeln!(f, "{}", DisplayErrorChain::new(error)),
            Self::Hygiene(report) => {
                writeln!(f, "{} (under {}):", self.headline(), report.root)?;
                for offender in report.offenders() {
                    writeln!(f, "  {offender}")?;
                }
                Ok(())
            }
            Self::HygieneScan(error) => writeln!(f, "{}", DisplayErrorChain::new(error)),
            Self::Coverage(error) => writeln!(f, "{}", DisplayErrorChain::new(error)),
        }
    }
}

fn write_stderr(f: &mut fmt::Formatter<'_>, stderr: Option<&str>) -> fmt::Result {
    match stderr {
        Some(stderr) if !stderr.is_empty() => {
            writeln!(f, "--- stderr:")?;
            write!(f, "{stderr}")?;
            if !stderr.ends_with('\n') {
                writeln!(f)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

struct DisplayExitCode(Option<i32>);

impl fmt::Display for DisplayExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "a signal"),
        }
    }
}

/// Statistics for a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// The number of units expected to run.
    pub initial_count: usize,

    /// The number of units that finished.
    pub finished_count: usize,

    /// The number of units that passed.
    pub passed: usize,

    /// The number of reference files regenerated.
    pub regenerated: usize,

    /// The number of units that failed, including builds.
    pub failed: usize,

    /// The number of builds that failed.
    pub build_failed: usize,

    /// The number of units not run because a dependency failed.
    pub not_run: usize,

    /// The number of units skipped.
    pub skipped: usize,
}

impl RunStats {
    /// Creates empty statistics for a run of `initial_count` units.
    pub fn new(initial_count: usize) -> Self {
        Self {
            initial_count,
            ..Self::default()
        }
    }

    /// Records a finished unit.
    pub fn on_unit_finished(&mut self, unit: &UnitId, status: &UnitStatus) {
        self.finished_count += 1;
        match status {
            UnitStatus::Passed => self.passed += 1,
            UnitStatus::Regenerated { .. } => self.regenerated += 1,
            UnitStatus::Skipped { .. } => self.skipped += 1,
            UnitStatus::NotRun { .. } => self.not_run += 1,
            UnitStatus::Failed(detail) => {
                self.failed += 1;
                if matches!(unit, UnitId::Build { .. })
                    && matches!(**detail, FailureDetail::BuildFailed { .. })
                {
                    self.build_failed += 1;
                }
            }
        }
    }

    /// Returns true if nothing failed and nothing was left unrun.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.not_run == 0
    }

    /// Returns the process exit code for this run.
    pub fn exit_code(&self, mode: RunMode) -> i32 {
        if self.initial_count == 0 {
            GoldenTraceExitCode::NO_SCENARIOS_RUN
        } else if self.build_failed > 0 {
            GoldenTraceExitCode::BUILD_FAILED
        } else if !self.is_success() {
            match mode {
                RunMode::Regenerate => GoldenTraceExitCode::REGENERATE_FAILED,
                RunMode::Verify | RunMode::Clean => GoldenTraceExitCode::SCENARIO_RUN_FAILED,
            }
        } else {
            GoldenTraceExitCode::OK
        }
    }
}
