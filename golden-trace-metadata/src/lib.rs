// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable output and exit codes for golden-trace.
//!
//! The types here are stable across releases of the harness: scripts and CI jobs that inspect
//! `golden-trace list --message-format json` or the process exit code should depend on this crate
//! rather than on `golden-trace-runner`.

mod exit_codes;
mod scenario_list;

pub use exit_codes::*;
pub use scenario_list::*;
