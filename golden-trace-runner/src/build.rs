// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoking the build system for the tool under test.

use crate::{
    config::HarnessConfig,
    errors::{BuildError, HygieneScanError},
    helpers::get_num_cpus,
    runner::OutputSink,
};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fmt;
use tracing::debug;
use walkdir::WalkDir;

/// What a build produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum BuildTarget {
    /// The standalone command-line tool.
    Standalone,

    /// The executables that embed the tool as a library.
    LibraryTest,
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::LibraryTest => write!(f, "library-test"),
        }
    }
}

/// Options for a single build.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BuildConfig {
    /// What to build.
    pub target: BuildTarget,

    /// The number of parallel jobs passed to the build system for the standalone build.
    pub jobs: usize,

    /// Whether the optional XML parsing backend is compiled in.
    pub xml_backend: bool,

    /// Whether coverage instrumentation is compiled in.
    pub coverage: bool,
}

impl BuildConfig {
    /// Creates a config for `target` with one job per logical CPU, the XML backend enabled and
    /// coverage disabled.
    pub fn new(target: BuildTarget) -> Self {
        Self {
            target,
            jobs: get_num_cpus(),
            xml_backend: true,
            coverage: false,
        }
    }

    /// Sets whether the XML backend is compiled in.
    pub fn with_xml_backend(mut self, xml_backend: bool) -> Self {
        self.xml_backend = xml_backend;
        self
    }

    /// Sets whether coverage instrumentation is compiled in.
    pub fn with_coverage(mut self, coverage: bool) -> Self {
        self.coverage = coverage;
        self
    }
}

/// The result of a build system invocation that ran to completion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildOutcome {
    /// The build system exited with code 0.
    Success,

    /// The build system exited with a non-zero code, or was terminated by a signal (in which
    /// case `exit_code` is `None`).
    Failed {
        /// The exit code.
        exit_code: Option<i32>,
    },
}

impl BuildOutcome {
    /// Returns true if the build succeeded.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A command line for the build system.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildCommand {
    /// The program.
    pub program: String,

    /// The arguments.
    pub args: Vec<String>,
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_words::quote(&self.program))?;
        if !self.args.is_empty() {
            write!(f, " {}", shell_words::join(&self.args))?;
        }
        Ok(())
    }
}

/// Runs builds and cleans against a source root.
#[derive(Clone, Debug)]
pub struct BuildOrchestrator<'cfg> {
    config: &'cfg HarnessConfig,
    output: OutputSink,
}

impl<'cfg> BuildOrchestrator<'cfg> {
    /// Creates a new orchestrator. `output` decides where the build system's own output goes.
    pub fn new(config: &'cfg HarnessConfig, output: OutputSink) -> Self {
        Self { config, output }
    }

    /// Returns the command line used for `build`.
    pub fn command(&self, build: &BuildConfig) -> BuildCommand {
        let mut args = vec!["-f".to_owned()];
        match build.target {
            BuildTarget::Standalone => {
                args.push(self.config.tool().makefile.to_string());
                args.push(format!("-j{}", build.jobs));
            }
            BuildTarget::LibraryTest => {
                // The library test makefile is invoked without a job count.
                let library = self.config.library();
                args.push(library.makefile.to_string());
                args.push(format!("{}=.", library.tool_root_var));
            }
        }
        args.push(format!("USE_XERCES={}", u8::from(build.xml_backend)));
        args.push(format!("COVERAGE={}", u8::from(build.coverage)));

        BuildCommand {
            program: self.config.build().program.clone(),
            args,
        }
    }

    /// Returns the command line used for `clean`.
    pub fn clean_command(&self) -> BuildCommand {
        BuildCommand {
            program: self.config.build().program.clone(),
            args: vec![
                "-f".to_owned(),
                self.config.tool().makefile.to_string(),
                "clean".to_owned(),
            ],
        }
    }

    /// Builds `build.target`.
    ///
    /// Returns an error only if the build system could not be started.
    pub fn build(&self, build: &BuildConfig) -> Result<BuildOutcome, BuildError> {
        self.execute(&self.command(build))
    }

    /// Removes build products from the source root.
    pub fn clean(&self) -> Result<BuildOutcome, BuildError> {
        self.execute(&self.clean_command())
    }

    /// Scans the source root for files that a clean should have removed.
    pub fn scan_hygiene(&self) -> Result<HygieneReport, HygieneScanError> {
        let hygiene = self.config.hygiene();
        let patterns = build_glob_set(&hygiene.patterns)?;
        let root = self.config.source_root();

        let mut offenders = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|error| HygieneScanError::Walk {
                root: root.to_owned(),
                error,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if file_name.starts_with(hygiene.ignore_prefix.as_str()) {
                continue;
            }
            if patterns.is_match(file_name.as_ref()) {
                let rel_path = entry.path().strip_prefix(root).unwrap_or(entry.path());
                offenders.push(Utf8PathBuf::from(rel_path.to_string_lossy().into_owned()));
            }
        }

        Ok(HygieneReport {
            root: root.to_owned(),
            offenders,
        })
    }

    fn execute(&self, command: &BuildCommand) -> Result<BuildOutcome, BuildError> {
        debug!("running `{command}` in {}", self.config.source_root());

        let expression = duct::cmd(&command.program, &command.args)
            .dir(self.config.source_root())
            .unchecked();
        let expression = match self.output {
            OutputSink::Discard => expression.stdout_null().stderr_null(),
            OutputSink::Inherit => expression.stdout_to_stderr(),
        };

        let output = expression.run().map_err(|error| BuildError::Exec {
            command: command.to_string(),
            error,
        })?;

        if output.status.success() {
            Ok(BuildOutcome::Success)
        } else {
            Ok(BuildOutcome::Failed {
                exit_code: output.status.code(),
            })
        }
    }
}

/// Build artifacts found in the source tree after a clean.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HygieneReport {
    /// The root that was scanned.
    pub root: Utf8PathBuf,

    /// Paths relative to `root` that match an artifact pattern, sorted.
    pub offenders: Vec<Utf8PathBuf>,
}

impl HygieneReport {
    /// Returns true if no artifacts were found.
    pub fn is_clean(&self) -> bool {
        self.offenders.is_empty()
    }

    /// Returns the offending paths, relative to the root.
    pub fn offenders(&self) -> impl Iterator<Item = &Utf8Path> {
        self.offenders.iter().map(|path| path.as_path())
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, HygieneScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|error| HygieneScanError::InvalidPattern {
            pattern: pattern.clone(),
            error,
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|error| HygieneScanError::InvalidPattern {
            pattern: patterns.join(", "),
            error,
        })
}
