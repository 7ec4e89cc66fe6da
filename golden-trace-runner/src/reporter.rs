// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting run progress and results.
//!
//! The main structure in this module is [`Reporter`], which displays results on standard error
//! and optionally aggregates them into a JUnit report.

mod displayer;
mod events;
mod junit;

use crate::errors::WriteEventError;
use camino::Utf8PathBuf;
use displayer::DisplayReporter;
pub use events::*;
use junit::MetadataJunit;

/// Standard error destination for the reporter.
///
/// This is usually a terminal, but can be an in-memory buffer for tests.
pub enum ReporterStderr<'a> {
    /// Produce output on standard error.
    Terminal,

    /// Write output to a buffer.
    Buffer(&'a mut Vec<u8>),
}

/// Settings for the JUnit report.
#[derive(Clone, Debug)]
pub struct JunitConfig {
    path: Utf8PathBuf,
    report_name: String,
}

impl JunitConfig {
    /// Creates a new JUnit config writing to `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            report_name: "golden-trace-run".to_owned(),
        }
    }
}

/// Reporter builder.
#[derive(Debug, Default)]
pub struct ReporterBuilder {
    should_colorize: bool,
    verbose: bool,
    junit: Option<JunitConfig>,
}

impl ReporterBuilder {
    /// Set to true if the reporter should colorize output.
    pub fn set_colorize(&mut self, should_colorize: bool) -> &mut Self {
        self.should_colorize = should_colorize;
        self
    }

    /// Sets verbose output.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Writes a JUnit report when the run finishes.
    pub fn set_junit(&mut self, junit: JunitConfig) -> &mut Self {
        self.junit = Some(junit);
        self
    }

    /// Creates a new reporter.
    pub fn build<'a>(&self, output: ReporterStderr<'a>) -> Reporter<'a> {
        Reporter {
            display_reporter: DisplayReporter::new(output, self.should_colorize, self.verbose),
            metadata_reporter: self.junit.clone().map(MetadataJunit::new),
        }
    }
}

/// Reports run events to standard error and, if configured, to a JUnit report.
pub struct Reporter<'a> {
    display_reporter: DisplayReporter<'a>,
    metadata_reporter: Option<MetadataJunit>,
}

impl Reporter<'_> {
    /// Reports an event.
    pub fn report_event(&mut self, event: ReporterEvent<'_>) -> Result<(), WriteEventError> {
        self.display_reporter.write_event(&event)?;
        if let Some(metadata_reporter) = &mut self.metadata_reporter {
            metadata_reporter.write_event(&event)?;
        }
        Ok(())
    }
}
