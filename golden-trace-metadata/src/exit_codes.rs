// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `golden-trace` failures.
///
/// `golden-trace` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum GoldenTraceExitCode {}

impl GoldenTraceExitCode {
    /// No errors occurred and golden-trace exited normally.
    pub const OK: i32 = 0;

    /// The provided filters did not select any scenarios, but no other errors occurred.
    pub const NO_SCENARIOS_RUN: i32 = 4;

    /// A user issue happened while setting up a golden-trace invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// One or more scenarios, or the build-hygiene check, failed.
    pub const SCENARIO_RUN_FAILED: i32 = 100;

    /// The build system returned a non-zero exit code for at least one build.
    ///
    /// Scenarios depending on that build were not run.
    pub const BUILD_FAILED: i32 = 101;

    /// The build system could not be invoked at all.
    ///
    /// This usually indicates a misconfigured environment (for example, `make` is not installed),
    /// and aborts the run before any scenario executes.
    pub const BUILD_EXEC_FAILED: i32 = 102;

    /// One or more reference files could not be regenerated.
    pub const REGENERATE_FAILED: i32 = 103;

    /// Writing data to stdout, stderr or a report file produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
