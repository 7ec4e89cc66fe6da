// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use color_eyre::Result;
use golden_trace_metadata::ScenarioListSummary;
use std::{
    borrow::Cow,
    collections::HashMap,
    ffi::OsString,
    fmt,
    process::{Command, ExitStatus},
};

/// Environment variables that would change golden-trace's behavior if inherited from the
/// environment running the tests.
const SCRUBBED_ENV_VARS: &[&str] = &[
    "COVERAGE",
    "GOLDEN_TRACE_LOG",
    "GOLDEN_TRACE_SOURCE_ROOT",
    "GOLDEN_TRACE_VERBOSE",
];

#[derive(Clone, Debug)]
pub struct GoldenTraceCli {
    bin: Utf8PathBuf,
    args: Vec<String>,
    envs: HashMap<OsString, OsString>,
    unchecked: bool,
}

impl GoldenTraceCli {
    /// Creates a new invocation of the golden-trace binary at `bin`.
    ///
    /// Color output is disabled so that output can be compared textually.
    pub fn new(bin: impl Into<Utf8PathBuf>) -> Self {
        let mut envs = HashMap::new();
        envs.insert("CARGO_TERM_COLOR".into(), "never".into());
        Self {
            bin: bin.into(),
            args: Vec::new(),
            envs,
            unchecked: false,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&mut self, arg: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(arg.into_iter().map(Into::into));
        self
    }

    pub fn env(&mut self, k: impl Into<OsString>, v: impl Into<OsString>) -> &mut Self {
        self.envs.insert(k.into(), v.into());
        self
    }

    pub fn unchecked(&mut self, unchecked: bool) -> &mut Self {
        self.unchecked = unchecked;
        self
    }

    pub fn output(&self) -> GoldenTraceOutput {
        let mut command = Command::new(&self.bin);
        command.args(&self.args);
        for var in SCRUBBED_ENV_VARS {
            command.env_remove(var);
        }
        command.envs(&self.envs);
        let output = command.output().expect("failed to execute");

        let ret = GoldenTraceOutput {
            command,
            exit_status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if !self.unchecked && !output.status.success() {
            panic!("command failed:\n\n{ret}");
        }

        ret
    }
}

pub struct GoldenTraceOutput {
    pub command: Command,
    pub exit_status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl GoldenTraceOutput {
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_status.code()
    }

    pub fn stdout_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    pub fn decode_scenario_list_json(&self) -> Result<ScenarioListSummary> {
        Ok(serde_json::from_slice(&self.stdout)?)
    }
}

impl fmt::Display for GoldenTraceOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command: {:?}\nexit code: {:?}\n\
                   --- stdout ---\n{}\n\n--- stderr ---\n{}\n\n",
            self.command,
            self.exit_status.code(),
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        )
    }
}

// Make Debug output the same as Display output, so `.unwrap()` and `.expect()` are nicer.
impl fmt::Debug for GoldenTraceOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
