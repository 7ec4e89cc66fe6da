// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::temp_tree::TempSourceTree;
use golden_trace_metadata::GoldenTraceExitCode;
use integration_tests::fake_power::MAKE_KEEP_OBJECTS_ENV;

#[test]
fn clean_leaves_no_artifacts() {
    let tree = TempSourceTree::new().unwrap();
    // Build, without the hygiene check since a filter is given.
    tree.cli().args(["verify", "exit_code::"]).output();
    assert!(tree.source_root().join("src/cli/drampower.o").exists());

    // Probe leftovers are exempt.
    fs_err::write(tree.source_root().join("conftest.o"), "").unwrap();

    let output = tree.cli().arg("clean").output();
    assert!(
        output.stderr_as_str().contains("hygiene::clean"),
        "{output}"
    );
    assert!(!tree.source_root().join("src/cli/drampower.o").exists());
}

#[test]
fn clean_reports_leftovers() {
    let tree = TempSourceTree::new().unwrap();
    tree.cli().args(["verify", "exit_code::"]).output();

    let output = tree
        .cli()
        .arg("clean")
        .env(MAKE_KEEP_OBJECTS_ENV, "1")
        .unchecked(true)
        .output();

    assert_eq!(
        output.exit_code(),
        Some(GoldenTraceExitCode::SCENARIO_RUN_FAILED),
        "{output}"
    );
    let stderr = output.stderr_as_str();
    assert!(stderr.contains("src/cli/drampower.o"), "{output}");
    assert!(stderr.contains("left after clean"), "{output}");
    assert!(!stderr.contains("conftest"), "{output}");
}
