// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use golden_trace_metadata::GoldenTraceExitCode;
use golden_trace_runner::{
    build::BuildTarget,
    errors::{BuildError, ConfigParseError, RunError, WriteEventError},
    reporter::{RunMode, RunStats},
};
use owo_colors::OwoColorize;
use std::{error::Error, path::PathBuf};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that golden-trace knows how to report, each with its own exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirUnavailable {
        #[source]
        error: std::io::Error,
    },
    #[error("source root is not valid UTF-8")]
    SourceRootInvalidUtf8 { path: PathBuf },
    #[error("source root not found")]
    SourceRootNotFound { source_root: Utf8PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to invoke the build system")]
    BuildExecFailed {
        target: BuildTarget,
        #[source]
        err: BuildError,
    },
    #[error("error writing run output")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("error writing scenario list")]
    WriteListError {
        #[source]
        err: std::io::Error,
    },
    #[error("error serializing scenario list")]
    SerializeListError {
        #[source]
        err: serde_json::Error,
    },
    #[error("run failed")]
    RunFailed { mode: RunMode, stats: RunStats },
}

impl ExpectedError {
    pub(crate) fn run_failed(mode: RunMode, stats: RunStats) -> Self {
        Self::RunFailed { mode, stats }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirUnavailable { .. }
            | Self::SourceRootInvalidUtf8 { .. }
            | Self::SourceRootNotFound { .. }
            | Self::ConfigParseError { .. } => GoldenTraceExitCode::SETUP_ERROR,
            Self::BuildExecFailed { .. } => GoldenTraceExitCode::BUILD_EXEC_FAILED,
            Self::WriteEventError { .. }
            | Self::WriteListError { .. }
            | Self::SerializeListError { .. } => GoldenTraceExitCode::WRITE_OUTPUT_ERROR,
            Self::RunFailed { mode, stats } => stats.exit_code(*mode),
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirUnavailable { error } => {
                error!("could not determine the current directory");
                Some(error as &dyn Error)
            }
            Self::SourceRootInvalidUtf8 { path } => {
                error!(
                    "source root `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::SourceRootNotFound { source_root } => {
                error!(
                    "source root `{}` does not exist or is not a directory",
                    source_root.style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse golden-trace config at `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::BuildExecFailed { target, err } => {
                error!(
                    "failed to invoke the build system for the {} build",
                    target.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::WriteEventError { err } => {
                error!("failed to write run output");
                Some(err as &dyn Error)
            }
            Self::WriteListError { err } => {
                error!("failed to write scenario list to output");
                Some(err as &dyn Error)
            }
            Self::SerializeListError { err } => {
                error!("failed to serialize scenario list");
                Some(err as &dyn Error)
            }
            Self::RunFailed { mode, stats } => {
                if stats.initial_count == 0 {
                    error!("no scenarios matched the given filters");
                } else if stats.build_failed > 0 {
                    error!("{} run failed: a build did not succeed", mode);
                } else {
                    error!("{} run failed", mode);
                }
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

impl From<RunError> for ExpectedError {
    fn from(error: RunError) -> Self {
        match error {
            RunError::BuildExec { target, error } => Self::BuildExecFailed { target, err: error },
            RunError::WriteEvent(err) => Self::WriteEventError { err },
            _ => unreachable!("unhandled RunError variant: {error}"),
        }
    }
}
