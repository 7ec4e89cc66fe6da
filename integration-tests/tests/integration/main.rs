// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests
//!
//! These tests run golden-trace (through the `golden-trace-dup` binary) against a temporary copy
//! of `fixtures/drampower-tree`. The tool under test and the build system are replaced by the
//! `fake-drampower` and `fake-make` helper binaries.

use fixture_data::{drampower_tree::EXPECTED_SCENARIOS, models::ScenarioFixture};
use golden_trace_metadata::{CheckSummary, GoldenTraceExitCode};
use integration_tests::golden_trace_cli::GoldenTraceCli;
use pretty_assertions::assert_eq;
use temp_tree::{GOLDEN_TRACE_BIN, TempSourceTree};

#[cfg(unix)]
mod hygiene;
#[cfg(unix)]
mod run;
mod temp_tree;

#[test]
fn list_json_matches_fixture() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree
        .cli()
        .args(["list", "--message-format", "json"])
        .output();
    let summary = output.decode_scenario_list_json().unwrap();

    assert_eq!(summary.source_root, tree.source_root());
    assert_eq!(summary.scenario_count, EXPECTED_SCENARIOS.len());
    for fixture in EXPECTED_SCENARIOS.iter() {
        let scenario = summary
            .scenarios
            .get(&fixture.name)
            .unwrap_or_else(|| panic!("scenario {} missing from list", fixture.name));
        assert!(
            fixture.matches(scenario),
            "scenario {} doesn't match fixture: {scenario:?}",
            fixture.name
        );
    }
}

#[test]
fn list_human() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree.cli().arg("list").output();

    let names: Vec<_> = output.stdout_as_str().lines().map(str::to_owned).collect();
    let mut expected: Vec<_> = EXPECTED_SCENARIOS
        .iter()
        .map(|fixture: &ScenarioFixture| fixture.name.clone())
        .collect();
    expected.sort();
    assert_eq!(names, expected);
}

#[test]
fn scenario_inputs_exist() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree
        .cli()
        .args(["list", "--message-format", "json"])
        .output();
    let summary = output.decode_scenario_list_json().unwrap();

    for (name, scenario) in &summary.scenarios {
        let mut args = scenario.args.clone();
        if let CheckSummary::SummaryMatch { standalone_args } = &scenario.check {
            args.extend(standalone_args.iter().cloned());
        }
        for arg in args.iter().filter(|arg| arg.contains('/')) {
            assert!(
                tree.source_root().join(arg).is_file(),
                "input {arg} for scenario {name} is missing from the fixture tree"
            );
        }
    }
}

#[test]
fn no_subcommand() {
    let output = GoldenTraceCli::new(GOLDEN_TRACE_BIN).unchecked(true).output();
    // clap reports usage errors with exit code 2.
    assert_eq!(output.exit_code(), Some(2), "{output}");
}

#[test]
fn missing_source_root() {
    let tree = TempSourceTree::new().unwrap();
    let missing = tree.source_root().join("missing");
    let output = GoldenTraceCli::new(GOLDEN_TRACE_BIN)
        .args(["--source-root", missing.as_str(), "verify"])
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::SETUP_ERROR),
        "{output}"
    );
    assert!(
        output.stderr_as_str().contains("does not exist"),
        "{output}"
    );
}

#[test]
fn invalid_config() {
    let tree = TempSourceTree::new().unwrap();
    fs_err::write(
        tree.source_root().join(".config/golden-trace.toml"),
        "[build\nprogram = \n",
    )
    .unwrap();

    let output = tree.cli().arg("list").unchecked(true).output();
    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::SETUP_ERROR),
        "{output}"
    );
    assert!(
        output
            .stderr_as_str()
            .contains("failed to parse golden-trace config"),
        "{output}"
    );
}
