// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A duplicate of golden-trace's main.rs, so that integration tests can refer to it through
//! `CARGO_BIN_EXE_golden-trace-dup`.

use color_eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    golden_trace::main_impl()
}
