// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executing a single scenario.

use crate::{
    artifacts::ArtifactStore,
    config::HarnessConfig,
    errors::ScenarioExecError,
    scenario::{Scenario, ScenarioArg, ScenarioProgram, StderrPolicy},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Where output that nobody asked for goes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputSink {
    /// The output is dropped.
    #[default]
    Discard,

    /// The output is passed through to golden-trace's own standard error.
    Inherit,
}

/// Options for a [`ScenarioRunner`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ScenarioRunnerOpts {
    /// Where standard error goes for scenarios that don't capture it.
    pub discarded_stderr: OutputSink,
}

/// Where a scenario's standard output is written.
#[derive(Clone, Debug)]
pub enum StdoutTarget {
    /// A fresh temporary file acquired from the scenario's artifact store.
    Temp,

    /// An explicit path owned by the caller.
    Path(Utf8PathBuf),
}

/// The observed result of running a scenario's program.
#[derive(Clone, Debug)]
pub struct ScenarioExecution {
    /// The exit code, or `None` if the program was terminated by a signal.
    pub exit_code: Option<i32>,

    /// The file holding standard output.
    pub stdout_path: Utf8PathBuf,

    /// Standard error, if it was captured.
    pub stderr: Option<String>,

    /// How long the program ran.
    pub time_taken: Duration,
}

/// Runs scenario programs against a built source tree.
#[derive(Clone, Debug)]
pub struct ScenarioRunner<'cfg> {
    config: &'cfg HarnessConfig,
    opts: ScenarioRunnerOpts,
}

impl<'cfg> ScenarioRunner<'cfg> {
    /// Creates a new runner for the source root in `config`.
    pub fn new(config: &'cfg HarnessConfig, opts: ScenarioRunnerOpts) -> Self {
        Self { config, opts }
    }

    /// Returns the absolute path of the executable for `program`.
    pub fn program_path(&self, program: ScenarioProgram) -> Utf8PathBuf {
        let source_root = self.config.source_root();
        match program {
            ScenarioProgram::Tool => source_root.join(&self.config.tool().binary),
            ScenarioProgram::Library(executable) => source_root
                .join(&self.config.library().test_dir)
                .join(executable.file_name()),
        }
    }

    /// Runs `scenario`, writing its standard output to `stdout`.
    ///
    /// Temporary files (decompressed fixtures, captured output) are owned by `store`, so they
    /// are released when the caller's store is.
    pub fn run(
        &self,
        scenario: &Scenario,
        store: &mut ArtifactStore,
        stdout: StdoutTarget,
    ) -> Result<ScenarioExecution, ScenarioExecError> {
        self.execute(
            scenario.program,
            &scenario.args,
            scenario.stderr,
            store,
            stdout,
        )
    }

    /// Runs the standalone tool with `args`, capturing standard output to a temporary file.
    pub fn run_standalone(
        &self,
        args: &[ScenarioArg],
        store: &mut ArtifactStore,
    ) -> Result<ScenarioExecution, ScenarioExecError> {
        self.execute(
            ScenarioProgram::Tool,
            args,
            StderrPolicy::Capture,
            store,
            StdoutTarget::Temp,
        )
    }

    fn execute(
        &self,
        program: ScenarioProgram,
        args: &[ScenarioArg],
        stderr: StderrPolicy,
        store: &mut ArtifactStore,
        stdout: StdoutTarget,
    ) -> Result<ScenarioExecution, ScenarioExecError> {
        let source_root = self.config.source_root();
        let program = self.program_path(program);
        let args = self.resolve_args(args, store)?;
        let stdout_path = match stdout {
            StdoutTarget::Temp => store.acquire_temp_path()?,
            StdoutTarget::Path(path) => path,
        };

        debug!(
            "running `{} {}` with stdout to {stdout_path}",
            program,
            shell_words::join(&args)
        );

        let expression = duct::cmd(program.as_std_path(), &args)
            .dir(source_root)
            .stdout_path(&stdout_path)
            .unchecked();
        let expression = match (stderr, self.opts.discarded_stderr) {
            (StderrPolicy::Capture, _) => expression.stderr_capture(),
            (StderrPolicy::Discard, OutputSink::Discard) => expression.stderr_null(),
            (StderrPolicy::Discard, OutputSink::Inherit) => expression,
        };

        let start = Instant::now();
        let output = expression
            .run()
            .map_err(|error| ScenarioExecError::Exec {
                program: program.clone(),
                error,
            })?;
        let time_taken = start.elapsed();

        let stderr = match stderr {
            StderrPolicy::Capture => Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            StderrPolicy::Discard => None,
        };

        Ok(ScenarioExecution {
            exit_code: output.status.code(),
            stdout_path,
            stderr,
            time_taken,
        })
    }

    fn resolve_args(
        &self,
        args: &[ScenarioArg],
        store: &mut ArtifactStore,
    ) -> Result<Vec<String>, ScenarioExecError> {
        args.iter()
            .map(|arg| match arg {
                ScenarioArg::Literal(arg) => Ok(arg.clone()),
                ScenarioArg::Decompressed(path) => {
                    let compressed = self.source_path(path);
                    let dest = store.materialize_from_compressed(&compressed)?;
                    Ok(dest.into_string())
                }
            })
            .collect()
    }

    fn source_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.config.source_root().join(path)
    }
}
