// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for golden-trace, a golden-output regression harness for a command-line
//! memory power estimation tool.
//!
//! The basic flow is:
//!
//! 1. [`config::HarnessConfig`] is loaded for a source root.
//! 2. [`run::RunOrchestrator`] builds the tool through [`build::BuildOrchestrator`], then runs
//!    each selected entry of the [`scenario::ScenarioMatrix`] through [`runner::ScenarioRunner`].
//! 3. Captured output is normalized by [`normalize`] and checked by [`compare`].
//! 4. Results are sent to a [`reporter::Reporter`] as they happen.

pub mod artifacts;
pub mod build;
pub mod compare;
pub mod config;
pub mod coverage;
pub mod errors;
mod helpers;
pub mod normalize;
pub mod reporter;
pub mod run;
pub mod runner;
pub mod scenario;
