// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by golden-trace.

use crate::build::BuildTarget;
use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::{error::Error, fmt, io};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse golden-trace config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }
}

/// An error that occurred while creating a temporary path.
#[derive(Debug, Error)]
#[error("failed to create temporary file")]
pub struct TempPathError {
    #[source]
    error: io::Error,
}

impl TempPathError {
    pub(crate) fn new(error: io::Error) -> Self {
        Self { error }
    }
}

/// A compressed fixture could not be turned into a plain temporary file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FixtureUnavailable {
    /// The compressed fixture does not exist.
    #[error("compressed fixture `{path}` does not exist")]
    Missing {
        /// The fixture path.
        path: Utf8PathBuf,
    },

    /// The compressed fixture exists but could not be opened.
    #[error("compressed fixture `{path}` could not be opened")]
    Unreadable {
        /// The fixture path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The compressed fixture is not valid gzip data, or decompressing it failed partway.
    #[error("compressed fixture `{path}` is corrupt")]
    Corrupt {
        /// The fixture path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A temporary file to hold the decompressed data could not be created.
    #[error("no temporary file available for compressed fixture `{path}`")]
    TempPath {
        /// The fixture path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: TempPathError,
    },
}

/// An unexpected error that occurred while releasing a temporary path.
///
/// Not-found and permission errors are not reported through this type: see
/// [`ReleaseOutcome`](crate::artifacts::ReleaseOutcome).
#[derive(Debug, Error)]
#[error("failed to remove temporary file `{path}`")]
pub struct ArtifactReleaseError {
    path: Utf8PathBuf,
    #[source]
    error: io::Error,
}

impl ArtifactReleaseError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, error: io::Error) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }

    /// Returns the path that could not be removed.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// An error that occurred while invoking the build system.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The build system could not be started.
    #[error("failed to execute `{command}`")]
    Exec {
        /// The command line that was attempted.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while scanning the source tree for leftover build artifacts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HygieneScanError {
    /// A configured artifact pattern is not a valid glob.
    #[error("invalid build artifact pattern `{pattern}`")]
    InvalidPattern {
        /// The pattern.
        pattern: String,

        /// The underlying error.
        #[source]
        error: globset::Error,
    },

    /// The source tree could not be walked.
    #[error("failed to scan `{root}` for build artifacts")]
    Walk {
        /// The root of the scan.
        root: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: walkdir::Error,
    },
}

/// An error that prevented a scenario's program from producing a result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScenarioExecError {
    /// An argument referring to a compressed fixture could not be materialized.
    #[error("failed to prepare fixture argument")]
    Fixture(#[from] FixtureUnavailable),

    /// The temporary file receiving standard output could not be created.
    #[error("failed to prepare output capture")]
    TempPath(#[from] TempPathError),

    /// The program could not be started or waited on.
    #[error("failed to execute `{program}`")]
    Exec {
        /// The program that was attempted.
        program: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while reading a reference or captured output file.
#[derive(Debug, Error)]
#[error("failed to read output file `{path}`")]
pub struct ReferenceReadError {
    path: Utf8PathBuf,
    #[source]
    error: io::Error,
}

impl ReferenceReadError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, error: io::Error) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }

    /// Returns the path that could not be read.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// An error that occurred while writing a regenerated reference file.
#[derive(Debug, Error)]
#[error("failed to write reference file `{path}`")]
pub struct ReferenceWriteError {
    path: Utf8PathBuf,
    #[source]
    error: io::Error,
}

impl ReferenceWriteError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, error: io::Error) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

/// An unexpected error that occurred while handling coverage data.
///
/// Not-found and permission errors are logged and skipped instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoverageRelocateError {
    /// A coverage file could not be moved.
    #[error("failed to move coverage data `{from}` to `{to}`")]
    Move {
        /// The source path.
        from: Utf8PathBuf,

        /// The destination path.
        to: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A coverage notes file could not be removed.
    #[error("failed to remove coverage notes `{path}`")]
    Remove {
        /// The path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while writing a JUnit report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JunitWriteError {
    /// The report file or its parent directory could not be created.
    #[error("failed to create JUnit report at `{path}`")]
    Fs {
        /// The report path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The report could not be serialized.
    #[error("failed to serialize JUnit report to `{path}`")]
    Serialize {
        /// The report path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: Box<dyn Error + Send + Sync>,
    },
}

/// An error that occurred while writing reporter output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to stderr or a buffer.
    #[error("error writing to output")]
    Io(#[from] io::Error),

    /// An error occurred while writing the JUnit report.
    #[error(transparent)]
    Junit(#[from] JunitWriteError),
}

/// An error that aborted a run partway through.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The build system could not be invoked at all.
    #[error("failed to invoke the build system for {target}")]
    BuildExec {
        /// The target being built.
        target: BuildTarget,

        /// The underlying error.
        #[source]
        error: BuildError,
    },

    /// Reporter output could not be written.
    #[error("failed to write reporter output")]
    WriteEvent(#[from] WriteEventError),
}

/// Displays an error along with its chain of sources, one per line.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut current = self.error.source();
        while let Some(source) = current {
            write!(f, "\n  caused by: {source}")?;
            current = source.source();
        }

        Ok(())
    }
}
