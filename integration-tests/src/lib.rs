// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod fake_power;
pub mod golden_trace_cli;
