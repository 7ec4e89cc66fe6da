// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::temp_tree::TempSourceTree;
use fixture_data::drampower_tree::{BUILD_OUTPUTS, COMPRESSED_TRACE, golden_scenario_count};
use golden_trace_metadata::GoldenTraceExitCode;
use integration_tests::fake_power::{DRIFT_ENV, MAKE_FAIL_ENV};
use pretty_assertions::assert_eq;
use regex::Regex;
use std::sync::LazyLock;

static DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*\d+\.\d{3}s\]").unwrap());

/// Replaces elapsed times so that output can be compared exactly.
fn redact_durations(output: &str) -> String {
    DURATION_REGEX
        .replace_all(output, "[ ELAPSED ]")
        .into_owned()
}

fn summary_line(stderr: &str) -> String {
    let stderr = redact_durations(stderr);
    stderr
        .lines()
        .find(|line| line.trim_start().starts_with("Summary"))
        .unwrap_or_else(|| panic!("no summary line in:\n{stderr}"))
        .to_owned()
}

#[test]
fn regenerate_then_verify() {
    let tree = TempSourceTree::new().unwrap();

    let output = tree.cli().arg("regenerate").output();
    assert_eq!(
        summary_line(&output.stderr_as_str()),
        "     Summary [ ELAPSED ] 49 units run: 44 regenerated, 2 passed, 3 skipped",
        "{output}"
    );

    let references = fs_err::read_dir(tree.reference_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name.to_string_lossy().ends_with(".out"))
        .count();
    assert_eq!(references, golden_scenario_count());

    let output = tree.cli().arg("verify").output();
    assert_eq!(
        summary_line(&output.stderr_as_str()),
        "     Summary [ ELAPSED ] 51 units run: 51 passed",
        "{output}"
    );

    // The hygiene check cleaned up after the builds.
    for path in BUILD_OUTPUTS {
        assert!(
            !tree.source_root().join(path).exists(),
            "{path} should have been removed by the clean"
        );
    }
}

#[test]
fn verify_without_reference() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree
        .cli()
        .args(["verify", "output::commands_trace"])
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::SCENARIO_RUN_FAILED),
        "{output}"
    );
    let stderr = output.stderr_as_str();
    assert!(
        stderr.contains("test_commands_trace_output_matches_reference.out"),
        "{output}"
    );
}

#[test]
fn verify_detects_changed_output() {
    let tree = TempSourceTree::new().unwrap();
    tree.regenerate(&["output::commands_trace"]);

    let junit_path = tree.source_root().join("target/junit.xml");
    let output = tree
        .cli()
        .args([
            "verify",
            "output::commands_trace",
            "--junit",
            junit_path.as_str(),
        ])
        .env(DRIFT_ENV, "tool")
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::SCENARIO_RUN_FAILED),
        "{output}"
    );
    let stderr = output.stderr_as_str();
    assert!(
        stderr.contains("output differs from reference"),
        "{output}"
    );
    assert!(stderr.contains("-Total Trace Energy"), "{output}");
    assert!(stderr.contains("+Total Trace Energy"), "{output}");

    let junit = fs_err::read_to_string(&junit_path).unwrap();
    assert!(
        junit.contains(r#"<testcase name="output::commands_trace""#),
        "{junit}"
    );
    assert!(junit.contains("<failure"), "{junit}");
}

#[test]
fn one_pasr_mismatch_leaves_the_others_passing() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree.cli().args(["regenerate", "pasr::"]).output();
    assert_eq!(
        summary_line(&output.stderr_as_str()),
        "     Summary [ ELAPSED ] 33 units run: 32 regenerated, 1 passed",
        "{output}"
    );

    let edited = tree
        .reference_dir()
        .join("test_MICRON_1Gb_DDR3-1600_8bit_G_Sigma_50_pasr_3_reference.out");
    let mut reference = fs_err::read_to_string(&edited).unwrap();
    reference.push_str("Refresh Energy: 1.000 pJ\n");
    fs_err::write(&edited, reference).unwrap();

    let output = tree
        .cli()
        .args(["verify", "pasr::"])
        .unchecked(true)
        .output();
    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::SCENARIO_RUN_FAILED),
        "{output}"
    );

    let stderr = output.stderr_as_str();
    assert_eq!(
        summary_line(&stderr),
        "     Summary [ ELAPSED ] 33 units run: 32 passed, 1 failed",
        "{output}"
    );
    let failures: Vec<_> = stderr
        .lines()
        .filter(|line| line.trim_start().starts_with("FAIL ["))
        .collect();
    assert!(!failures.is_empty(), "{output}");
    for line in failures {
        assert!(line.ends_with(" pasr::sigma_50_mode_3"), "{line}");
    }
    assert!(stderr.contains("-Refresh Energy: 1.000 pJ"), "{output}");
}

#[test]
fn banner_lines_are_ignored() {
    let tree = TempSourceTree::new().unwrap();
    tree.regenerate(&["output::lpddr2_1066_short"]);

    // The fake tool stamps each run's banner with the current time, so a second run only matches
    // if banner lines are skipped.
    tree.cli()
        .args(["verify", "output::lpddr2_1066_short"])
        .output();
}

#[test]
fn library_summary_matches_tool() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree
        .cli()
        .args(["verify", "library::window_summary"])
        .output();
    assert_eq!(
        summary_line(&output.stderr_as_str()),
        "     Summary [ ELAPSED ] 4 units run: 4 passed",
        "{output}"
    );

    let output = tree
        .cli()
        .args(["verify", "library::window_summary"])
        .env(DRIFT_ENV, "window")
        .unchecked(true)
        .output();
    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::SCENARIO_RUN_FAILED),
        "{output}"
    );
    assert!(
        output
            .stderr_as_str()
            .contains("summary lines differ from the standalone tool's"),
        "{output}"
    );
}

#[test]
fn exit_code_scenarios() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree.cli().args(["verify", "exit_code::"]).output();
    assert_eq!(
        summary_line(&output.stderr_as_str()),
        "     Summary [ ELAPSED ] 3 units run: 3 passed",
        "{output}"
    );
}

#[test]
fn failed_build_skips_dependents() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree
        .cli()
        .args(["verify", "bankwise::"])
        .env(MAKE_FAIL_ENV, "standalone")
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::BUILD_FAILED),
        "{output}"
    );
    let stderr = redact_durations(&output.stderr_as_str());
    assert!(
        stderr.contains("NOT RUN [ ELAPSED ] bankwise::rho_25 (build::standalone failed)"),
        "{output}"
    );
    assert_eq!(
        summary_line(&stderr),
        "     Summary [ ELAPSED ] 6 units run: 0 passed, 1 failed, 5 not run",
    );
}

#[test]
fn failed_library_build_keeps_tool_scenarios() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree
        .cli()
        .args(["verify", "exit_code::no_arguments", "library::"])
        .env(MAKE_FAIL_ENV, "library")
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::BUILD_FAILED),
        "{output}"
    );
    let stderr = redact_durations(&output.stderr_as_str());
    assert!(
        stderr.contains("PASS [ ELAPSED ] exit_code::no_arguments"),
        "{output}"
    );
    assert!(
        stderr.contains("NOT RUN [ ELAPSED ] library::output (build::library failed)"),
        "{output}"
    );
}

#[test]
fn build_system_missing() {
    let tree = TempSourceTree::with_build_program("/nonexistent/golden-trace/make").unwrap();
    let output = tree
        .cli()
        .args(["verify", "exit_code::"])
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::BUILD_EXEC_FAILED),
        "{output}"
    );
    assert!(
        output
            .stderr_as_str()
            .contains("failed to invoke the build system"),
        "{output}"
    );
}

#[test]
fn missing_compressed_fixture() {
    let tree = TempSourceTree::new().unwrap();
    tree.regenerate(&["output::lpddr2_1066"]);
    fs_err::remove_file(tree.source_root().join(COMPRESSED_TRACE)).unwrap();

    let output = tree
        .cli()
        .args(["verify", "output::lpddr2_1066"])
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::SCENARIO_RUN_FAILED),
        "{output}"
    );
    let stderr = redact_durations(&output.stderr_as_str());
    assert!(stderr.contains("does not exist"), "{output}");
    // The uncompressed scenario in the same group still passes.
    assert!(
        stderr.contains("PASS [ ELAPSED ] output::lpddr2_1066_short"),
        "{output}"
    );
}

#[test]
fn no_matching_scenarios() {
    let tree = TempSourceTree::new().unwrap();
    let output = tree
        .cli()
        .args(["verify", "no-such-scenario"])
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::NO_SCENARIOS_RUN),
        "{output}"
    );
}

fn assert_coverage_relocated(tree: &TempSourceTree) {
    for file in ["lib_test.gcno", "lib_test.gcda"] {
        assert!(
            !tree.source_root().join(file).exists(),
            "{file} left in the source root"
        );
        assert!(
            tree.source_root()
                .join("test/libdrampowertest")
                .join(file)
                .exists(),
            "{file} not moved into the library test directory"
        );
    }
}

#[test]
fn coverage_data_is_relocated() {
    let tree = TempSourceTree::new().unwrap();
    tree.regenerate(&["library::output"]);

    let output = tree
        .cli()
        .args(["verify", "library::", "--coverage"])
        .output();
    assert_eq!(output.exit_code(), Some(GoldenTraceExitCode::OK), "{output}");
    assert_coverage_relocated(&tree);
}

#[test]
fn coverage_enabled_from_environment() {
    let tree = TempSourceTree::new().unwrap();
    tree.regenerate(&["library::output"]);

    let output = tree
        .cli()
        .env("COVERAGE", "1")
        .args(["verify", "library::"])
        .output();
    assert_eq!(output.exit_code(), Some(GoldenTraceExitCode::OK), "{output}");
    assert_coverage_relocated(&tree);
}

#[test]
fn coverage_disabled_from_environment() {
    let tree = TempSourceTree::new().unwrap();
    tree.regenerate(&["library::output"]);

    let output = tree
        .cli()
        .env("COVERAGE", "0")
        .args(["verify", "library::"])
        .output();
    assert_eq!(output.exit_code(), Some(GoldenTraceExitCode::OK), "{output}");
    for dir in ["", "test/libdrampowertest"] {
        for file in ["lib_test.gcno", "lib_test.gcda"] {
            let path = tree.source_root().join(dir).join(file);
            assert!(!path.exists(), "{path} produced without coverage");
        }
    }
}
