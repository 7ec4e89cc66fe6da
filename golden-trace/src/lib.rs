// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The golden-trace command-line interface.
//!
//! golden-trace builds a memory power estimation tool from source, runs it over a fixed matrix of
//! memory specifications and traces, and checks its output against reference files. Exit codes
//! are documented in [`golden_trace_metadata::GoldenTraceExitCode`].
//!
//! This crate exists to be driven by `main.rs` and by integration tests. Its API is not stable.

mod dispatch;
mod errors;
mod output;

use clap::Parser;

#[doc(hidden)]
pub use dispatch::GoldenTraceApp;
#[doc(hidden)]
pub use errors::ExpectedError;
#[doc(hidden)]
pub use output::OutputWriter;

/// Parses the command line, runs the requested command and exits the process.
///
/// Callers are expected to have installed `color_eyre` first.
#[doc(hidden)]
pub fn main_impl() -> color_eyre::Result<()> {
    let app = GoldenTraceApp::parse();
    let output = app.init_output();

    match app.exec(output, &mut OutputWriter::default()) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
