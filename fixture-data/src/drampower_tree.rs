// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expectations for `fixtures/drampower-tree`.

use crate::models::{CheckKind, ScenarioFixture};
use golden_trace_metadata::ProgramSummary;
use std::sync::LazyLock;

pub static EXPECTED_SCENARIOS: LazyLock<Vec<ScenarioFixture>> = LazyLock::new(|| {
    let mut scenarios = vec![
        ScenarioFixture::golden("output::commands_trace"),
        ScenarioFixture::golden("exit_code::no_arguments")
            .with_check(CheckKind::ExitCodeOnly)
            .with_expected_exit_code(1),
        ScenarioFixture::golden("output::lpddr2_1066"),
        ScenarioFixture::golden("output::lpddr2_1066_termination"),
        ScenarioFixture::golden("output::lpddr2_1066_short"),
        ScenarioFixture::golden("output::transaction_scheduler"),
        ScenarioFixture::golden("output::transaction_scheduler_self_refresh"),
        ScenarioFixture::golden("bankwise::refresh"),
    ];
    for rho in [25, 50, 75, 100] {
        scenarios.push(ScenarioFixture::golden(format!("bankwise::rho_{rho}")));
    }
    for sigma in [25, 50, 75, 100] {
        for mode in 0..=7 {
            scenarios.push(ScenarioFixture::golden(format!(
                "pasr::sigma_{sigma}_mode_{mode}"
            )));
        }
    }
    scenarios.extend([
        ScenarioFixture::golden("exit_code::broken_trace").with_check(CheckKind::ExitCodeOnly),
        ScenarioFixture::golden("library::output").with_program(ProgramSummary::LibraryTest),
        ScenarioFixture::golden("library::window_summary")
            .with_program(ProgramSummary::WindowExample)
            .with_check(CheckKind::SummaryMatch),
    ]);
    scenarios
});

/// Number of scenarios checked against a reference file.
pub fn golden_scenario_count() -> usize {
    EXPECTED_SCENARIOS
        .iter()
        .filter(|scenario| scenario.check == CheckKind::Golden)
        .count()
}

/// The gzip-compressed trace in the fixture tree.
pub const COMPRESSED_TRACE: &str = "test/data/LPDDR2-1066.commands.trace.gz";

/// Files the build leaves behind that `clean` must remove.
pub const BUILD_OUTPUTS: &[&str] = &[
    "drampower",
    "test/libdrampowertest/library_test",
    "test/libdrampowertest/window_example",
];
