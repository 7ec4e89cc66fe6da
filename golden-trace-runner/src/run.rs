// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestrating a whole run: builds, scenarios and the hygiene check, in dependency order.

use crate::{
    artifacts::ArtifactStore,
    build::{BuildConfig, BuildOrchestrator, BuildOutcome, BuildTarget},
    compare::{Comparison, compare, compare_summaries},
    config::HarnessConfig,
    coverage::CoverageRelocator,
    errors::{CoverageRelocateError, DisplayErrorChain, ReferenceWriteError, RunError},
    normalize::NormalizedOutput,
    reporter::{
        FailureDetail, NotRunReason, Reporter, ReporterEvent, RunMode, RunStats, SkipReason,
        UnitId, UnitResult, UnitStatus,
    },
    runner::{OutputSink, ScenarioExecution, ScenarioRunner, ScenarioRunnerOpts, StdoutTarget},
    scenario::{Scenario, ScenarioCheck, ScenarioMatrix, ScenarioProgram},
};
use chrono::Local;
use std::{collections::BTreeMap, time::Instant};
use tracing::{debug, warn};

/// Options for a [`RunOrchestrator`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOrchestratorOpts {
    /// Where the build system's output goes.
    pub build_output: OutputSink,

    /// Where standard error goes for scenarios that don't capture it.
    pub discarded_stderr: OutputSink,

    /// Whether builds are instrumented for coverage.
    pub coverage: bool,
}

/// A unit of work in dependency order.
#[derive(Clone, Debug)]
enum PlannedUnit<'a> {
    Build(BuildConfig),
    Scenario(&'a Scenario),
    Hygiene,
}

impl PlannedUnit<'_> {
    fn id(&self) -> UnitId {
        match self {
            Self::Build(build) => UnitId::Build {
                target: build.target,
                xml_backend: build.xml_backend,
            },
            Self::Scenario(scenario) => UnitId::Scenario(scenario.name.clone()),
            Self::Hygiene => UnitId::Hygiene,
        }
    }
}

/// Runs the scenario matrix against a source root.
#[derive(Debug)]
pub struct RunOrchestrator<'a> {
    config: &'a HarnessConfig,
    matrix: &'a ScenarioMatrix,
    opts: RunOrchestratorOpts,
    builds: BuildOrchestrator<'a>,
    runner: ScenarioRunner<'a>,
    coverage: CoverageRelocator<'a>,
}

impl<'a> RunOrchestrator<'a> {
    /// Creates a new orchestrator.
    pub fn new(
        config: &'a HarnessConfig,
        matrix: &'a ScenarioMatrix,
        opts: RunOrchestratorOpts,
    ) -> Self {
        Self {
            config,
            matrix,
            opts,
            builds: BuildOrchestrator::new(config, opts.build_output),
            runner: ScenarioRunner::new(
                config,
                ScenarioRunnerOpts {
                    discarded_stderr: opts.discarded_stderr,
                },
            ),
            coverage: CoverageRelocator::new(config, opts.coverage),
        }
    }

    /// Returns the units a run would execute, in order.
    ///
    /// `hygiene` is only honored for verification runs without filters.
    pub fn plan(&self, mode: RunMode, filters: &[String], hygiene: bool) -> Vec<UnitId> {
        self.plan_units(mode, filters, hygiene)
            .iter()
            .map(PlannedUnit::id)
            .collect()
    }

    /// Builds the tool and library, runs the selected scenarios against their references, and
    /// finally checks that a clean leaves no build artifacts behind.
    pub fn verify(
        &self,
        filters: &[String],
        hygiene: bool,
        reporter: &mut Reporter<'_>,
    ) -> Result<RunStats, RunError> {
        let units = self.plan_units(RunMode::Verify, filters, hygiene);
        self.execute(RunMode::Verify, &units, reporter)
    }

    /// Builds the tool and library, and overwrites the reference file of each selected scenario
    /// with fresh output.
    pub fn regenerate(
        &self,
        filters: &[String],
        reporter: &mut Reporter<'_>,
    ) -> Result<RunStats, RunError> {
        let units = self.plan_units(RunMode::Regenerate, filters, false);
        self.execute(RunMode::Regenerate, &units, reporter)
    }

    /// Cleans the source tree and checks that no build artifacts are left behind.
    pub fn clean(&self, reporter: &mut Reporter<'_>) -> Result<RunStats, RunError> {
        self.execute(RunMode::Clean, &[PlannedUnit::Hygiene], reporter)
    }

    fn plan_units(&self, mode: RunMode, filters: &[String], hygiene: bool) -> Vec<PlannedUnit<'a>> {
        if mode == RunMode::Clean {
            return vec![PlannedUnit::Hygiene];
        }

        let selected: Vec<&'a Scenario> = self
            .matrix
            .iter()
            .filter(|scenario| scenario.matches_filters(filters))
            .collect();
        if selected.is_empty() {
            return Vec::new();
        }

        let needs_build = |target: BuildTarget| {
            selected.iter().any(|scenario| match mode {
                RunMode::Regenerate => {
                    scenario.reference().is_some() && scenario.program.build_target() == target
                }
                RunMode::Verify | RunMode::Clean => match target {
                    BuildTarget::Standalone => scenario.needs_standalone(),
                    BuildTarget::LibraryTest => scenario.needs_library(),
                },
            })
        };
        let (library, tool): (Vec<_>, Vec<_>) = selected
            .iter()
            .copied()
            .partition(|scenario| scenario.needs_library());

        let mut units = Vec::new();
        if needs_build(BuildTarget::Standalone) {
            units.push(PlannedUnit::Build(self.build_config(BuildTarget::Standalone)));
        }
        units.extend(tool.into_iter().map(PlannedUnit::Scenario));

        if needs_build(BuildTarget::LibraryTest) {
            let build = self.build_config(BuildTarget::LibraryTest);
            if mode == RunMode::Verify {
                units.push(PlannedUnit::Build(build.with_xml_backend(false)));
            }
            units.push(PlannedUnit::Build(build));
        }
        units.extend(library.into_iter().map(PlannedUnit::Scenario));

        if mode == RunMode::Verify && hygiene && filters.is_empty() {
            units.push(PlannedUnit::Hygiene);
        }
        units
    }

    fn build_config(&self, target: BuildTarget) -> BuildConfig {
        BuildConfig::new(target).with_coverage(self.opts.coverage)
    }

    fn execute(
        &self,
        mode: RunMode,
        units: &[PlannedUnit<'a>],
        reporter: &mut Reporter<'_>,
    ) -> Result<RunStats, RunError> {
        let run_start = Instant::now();
        let mut stats = RunStats::new(units.len());
        reporter.report_event(ReporterEvent::RunStarted {
            mode,
            unit_count: units.len(),
            start_time: Local::now().fixed_offset(),
        })?;

        // Builds that failed, keyed by what they produce.
        let mut failed_builds: BTreeMap<BuildTarget, UnitId> = BTreeMap::new();
        let last_library_scenario = units.iter().rposition(|unit| {
            matches!(unit, PlannedUnit::Scenario(scenario) if scenario.needs_library())
        });

        for (index, unit) in units.iter().enumerate() {
            let id = unit.id();
            reporter.report_event(ReporterEvent::UnitStarted { unit: &id })?;

            let start = Instant::now();
            let status = match unit {
                PlannedUnit::Build(build) => {
                    let status = self.run_build(build)?;
                    // Only the XML-backed library build produces the executables that scenarios
                    // run.
                    if status.is_failure() && build.xml_backend {
                        failed_builds.insert(build.target, id.clone());
                    }
                    status
                }
                PlannedUnit::Scenario(scenario) => {
                    match blocking_build(scenario, &failed_builds) {
                        Some(build) => UnitStatus::NotRun {
                            reason: NotRunReason::BuildFailed(build.clone()),
                        },
                        None => match mode {
                            RunMode::Regenerate => self.regenerate_scenario(scenario),
                            RunMode::Verify | RunMode::Clean => self.verify_scenario(scenario),
                        },
                    }
                }
                PlannedUnit::Hygiene => self.run_hygiene()?,
            };
            let status = if Some(index) == last_library_scenario {
                self.relocate_coverage(status)
            } else {
                status
            };
            let result = UnitResult {
                status,
                time_taken: start.elapsed(),
            };

            stats.on_unit_finished(&id, &result.status);
            reporter.report_event(ReporterEvent::UnitFinished {
                unit: &id,
                result: &result,
            })?;
        }

        reporter.report_event(ReporterEvent::RunFinished {
            stats,
            elapsed: run_start.elapsed(),
        })?;
        Ok(stats)
    }

    fn run_build(&self, build: &BuildConfig) -> Result<UnitStatus, RunError> {
        let outcome = self
            .builds
            .build(build)
            .map_err(|error| RunError::BuildExec {
                target: build.target,
                error,
            })?;

        let status = match outcome {
            BuildOutcome::Success => UnitStatus::Passed,
            BuildOutcome::Failed { exit_code } => failed(FailureDetail::BuildFailed {
                command: self.builds.command(build).to_string(),
                exit_code,
            }),
        };

        if build.target == BuildTarget::LibraryTest && !build.xml_backend {
            // Notes from this build would be mistaken for those of the XML-backed build.
            return Ok(self.discard_coverage_notes(status));
        }
        Ok(status)
    }

    fn discard_coverage_notes(&self, status: UnitStatus) -> UnitStatus {
        match self.coverage.discard_notes() {
            Ok(removed) => {
                debug!("removed {} coverage notes files", removed.len());
                status
            }
            Err(error) => with_coverage_error(status, error),
        }
    }

    /// Moves coverage data out of the source root after the last library scenario, whatever its
    /// outcome.
    fn relocate_coverage(&self, status: UnitStatus) -> UnitStatus {
        match self.coverage.relocate() {
            Ok(moved) => {
                debug!("relocated {} coverage files", moved.len());
                status
            }
            Err(error) => with_coverage_error(status, error),
        }
    }

    fn verify_scenario(&self, scenario: &Scenario) -> UnitStatus {
        let mut store = ArtifactStore::new();
        let status = self.verify_scenario_in(scenario, &mut store);
        close_store(store);
        status
    }

    fn verify_scenario_in(&self, scenario: &Scenario, store: &mut ArtifactStore) -> UnitStatus {
        let execution = match self.runner.run(scenario, store, StdoutTarget::Temp) {
            Ok(execution) => execution,
            Err(error) => return failed(FailureDetail::Exec(error)),
        };
        if let Some(status) = check_exit_code(scenario, &execution) {
            return status;
        }

        let output = self.config.output();
        match &scenario.check {
            ScenarioCheck::ExitCodeOnly => UnitStatus::Passed,
            ScenarioCheck::Golden { reference } => {
                let reference_path = self.config.source_root().join(reference);
                let actual =
                    match NormalizedOutput::from_path(&execution.stdout_path, &output.comment_marker)
                    {
                        Ok(actual) => actual,
                        Err(error) => return failed(FailureDetail::ReferenceRead(error)),
                    };
                let expected = match NormalizedOutput::from_path(
                    &reference_path,
                    &output.comment_marker,
                ) {
                    Ok(expected) => expected,
                    Err(error) => return failed(FailureDetail::ReferenceRead(error)),
                };

                match compare(actual.lines(), expected.lines()) {
                    Comparison::Match => UnitStatus::Passed,
                    Comparison::Mismatch(mismatch) => failed(FailureDetail::OutputMismatch {
                        reference: reference.clone(),
                        mismatch,
                    }),
                }
            }
            ScenarioCheck::SummaryMatch { standalone_args } => {
                let standalone = match self.runner.run_standalone(standalone_args, store) {
                    Ok(standalone) => standalone,
                    Err(error) => return failed(FailureDetail::Exec(error)),
                };

                let summaries = [&standalone, &execution].map(|execution| {
                    NormalizedOutput::from_path(&execution.stdout_path, &output.comment_marker)
                        .map(|normalized| normalized.summary(&output.summary_prefixes))
                });
                let [standalone_summary, library_summary] = summaries;
                let (standalone_summary, library_summary) =
                    match (standalone_summary, library_summary) {
                        (Ok(standalone), Ok(library)) => (standalone, library),
                        (Err(error), _) | (_, Err(error)) => {
                            return failed(FailureDetail::ReferenceRead(error));
                        }
                    };

                match compare_summaries(standalone_summary.lines(), library_summary.lines()) {
                    Comparison::Match => UnitStatus::Passed,
                    Comparison::Mismatch(mismatch) => {
                        failed(FailureDetail::SummaryMismatch { mismatch })
                    }
                }
            }
        }
    }

    fn regenerate_scenario(&self, scenario: &Scenario) -> UnitStatus {
        let Some(reference) = scenario.reference() else {
            return UnitStatus::Skipped {
                reason: SkipReason::NoReference,
            };
        };
        let reference_path = self.config.source_root().join(reference);
        let reference_dir = reference_path
            .parent()
            .unwrap_or_else(|| self.config.source_root());

        // Output goes to a temporary file next to the reference, which then replaces the
        // reference in a single rename.
        let temp_file = match fs_err::create_dir_all(reference_dir).and_then(|()| {
            camino_tempfile::Builder::new()
                .prefix(".golden-trace-")
                .suffix(".out.tmp")
                .tempfile_in(reference_dir)
        }) {
            Ok(temp_file) => temp_file,
            Err(error) => {
                return failed(FailureDetail::ReferenceWrite(ReferenceWriteError::new(
                    &reference_path,
                    error,
                )));
            }
        };

        let mut store = ArtifactStore::new();
        let execution = self.runner.run(
            scenario,
            &mut store,
            StdoutTarget::Path(temp_file.path().to_owned()),
        );
        close_store(store);

        let execution = match execution {
            Ok(execution) => execution,
            Err(error) => return failed(FailureDetail::Exec(error)),
        };
        if let Some(status) = check_exit_code(scenario, &execution) {
            return status;
        }

        match temp_file.persist(&reference_path) {
            Ok(_) => UnitStatus::Regenerated {
                reference: reference.to_owned(),
            },
            Err(error) => failed(FailureDetail::ReferenceWrite(ReferenceWriteError::new(
                &reference_path,
                error.error,
            ))),
        }
    }

    fn run_hygiene(&self) -> Result<UnitStatus, RunError> {
        let outcome = self.builds.clean().map_err(|error| RunError::BuildExec {
            target: BuildTarget::Standalone,
            error,
        })?;
        if let BuildOutcome::Failed { exit_code } = outcome {
            return Ok(failed(FailureDetail::CleanFailed {
                command: self.builds.clean_command().to_string(),
                exit_code,
            }));
        }

        let status = match self.builds.scan_hygiene() {
            Ok(report) if report.is_clean() => UnitStatus::Passed,
            Ok(report) => failed(FailureDetail::Hygiene(report)),
            Err(error) => failed(FailureDetail::HygieneScan(error)),
        };
        Ok(status)
    }
}

fn failed(detail: FailureDetail) -> UnitStatus {
    UnitStatus::Failed(Box::new(detail))
}

/// Fails a unit that otherwise succeeded because of a coverage error. A unit that already failed
/// keeps its own failure, and the coverage error is logged.
fn with_coverage_error(status: UnitStatus, error: CoverageRelocateError) -> UnitStatus {
    if status.is_failure() {
        warn!("{}", DisplayErrorChain::new(error));
        status
    } else {
        failed(FailureDetail::Coverage(error))
    }
}

fn check_exit_code(scenario: &Scenario, execution: &ScenarioExecution) -> Option<UnitStatus> {
    (execution.exit_code != Some(scenario.expected_exit_code)).then(|| {
        failed(FailureDetail::UnexpectedExitCode {
            expected: scenario.expected_exit_code,
            actual: execution.exit_code,
            stderr: execution.stderr.clone(),
        })
    })
}

fn blocking_build<'b>(
    scenario: &Scenario,
    failed_builds: &'b BTreeMap<BuildTarget, UnitId>,
) -> Option<&'b UnitId> {
    let standalone = scenario
        .needs_standalone()
        .then(|| failed_builds.get(&BuildTarget::Standalone))
        .flatten();
    let library = (scenario.program != ScenarioProgram::Tool)
        .then(|| failed_builds.get(&BuildTarget::LibraryTest))
        .flatten();
    library.or(standalone)
}

fn close_store(store: ArtifactStore) {
    if let Err(error) = store.close() {
        warn!("{}", DisplayErrorChain::new(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{ReporterBuilder, ReporterStderr};
    use camino_tempfile::tempdir;
    use camino_tempfile_ext::prelude::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn plan_names(mode: RunMode, filters: &[&str], hygiene: bool) -> Vec<String> {
        let config = HarnessConfig::default_config("/src");
        let matrix = ScenarioMatrix::default_matrix();
        let orchestrator = RunOrchestrator::new(&config, &matrix, RunOrchestratorOpts::default());
        let filters: Vec<String> = filters.iter().map(|f| (*f).to_owned()).collect();
        orchestrator
            .plan(mode, &filters, hygiene)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn full_verify_plan() {
        let plan = plan_names(RunMode::Verify, &[], true);
        assert_eq!(plan.len(), 51);
        assert_eq!(plan[0], "build::standalone");
        assert_eq!(plan[1], "output::commands_trace");
        assert_eq!(
            plan[46..],
            [
                "build::library_no_xml",
                "build::library",
                "library::output",
                "library::window_summary",
                "hygiene::clean",
            ]
        );
    }

    #[test_case(RunMode::Verify, &["pasr::sigma_25"], 9; "pasr subset")]
    #[test_case(RunMode::Verify, &["nonexistent"], 0; "no matches")]
    #[test_case(RunMode::Regenerate, &[], 49; "full regenerate")]
    #[test_case(RunMode::Regenerate, &["exit_code"], 2; "regenerate without references")]
    #[test_case(RunMode::Clean, &[], 1; "clean")]
    fn plan_sizes(mode: RunMode, filters: &[&str], expected: usize) {
        assert_eq!(plan_names(mode, filters, true).len(), expected);
    }

    #[test]
    fn window_summary_needs_both_builds() {
        assert_eq!(
            plan_names(RunMode::Verify, &["library::window"], true),
            [
                "build::standalone",
                "build::library_no_xml",
                "build::library",
                "library::window_summary",
            ]
        );
    }

    #[test]
    fn hygiene_opt_out() {
        let plan = plan_names(RunMode::Verify, &[], false);
        assert_eq!(plan.len(), 50);
        assert!(!plan.iter().any(|unit| unit == "hygiene::clean"));
    }

    #[test]
    fn regenerate_skips_builds_for_unreferenced_scenarios() {
        assert_eq!(
            plan_names(RunMode::Regenerate, &["exit_code::", "library::window"], true),
            [
                "exit_code::no_arguments",
                "exit_code::broken_trace",
                "library::window_summary",
            ]
        );
    }

    #[test]
    fn blocking_builds() {
        let matrix = ScenarioMatrix::default_matrix();
        let standalone = UnitId::Build {
            target: BuildTarget::Standalone,
            xml_backend: true,
        };
        let library = UnitId::Build {
            target: BuildTarget::LibraryTest,
            xml_backend: true,
        };

        let mut failed_builds = BTreeMap::new();
        failed_builds.insert(BuildTarget::Standalone, standalone.clone());

        let tool = matrix.get("output::commands_trace").unwrap();
        let library_output = matrix.get("library::output").unwrap();
        let window = matrix.get("library::window_summary").unwrap();

        assert_eq!(blocking_build(tool, &failed_builds), Some(&standalone));
        assert_eq!(blocking_build(library_output, &failed_builds), None);
        assert_eq!(blocking_build(window, &failed_builds), Some(&standalone));

        failed_builds.insert(BuildTarget::LibraryTest, library.clone());
        assert_eq!(blocking_build(window, &failed_builds), Some(&library));
    }

    fn coverage_opts() -> RunOrchestratorOpts {
        RunOrchestratorOpts {
            coverage: true,
            ..RunOrchestratorOpts::default()
        }
    }

    #[test]
    fn relocation_error_fails_an_otherwise_passing_unit() {
        let temp_dir = tempdir().unwrap();
        temp_dir.child("lib_test.gcno").write_str("notes").unwrap();
        // The destination directory is a file, so moving the notes into it fails.
        temp_dir.child("test/libdrampowertest").write_str("").unwrap();

        let config = HarnessConfig::default_config(temp_dir.path());
        let matrix = ScenarioMatrix::default_matrix();
        let orchestrator = RunOrchestrator::new(&config, &matrix, coverage_opts());

        match orchestrator.relocate_coverage(UnitStatus::Passed) {
            UnitStatus::Failed(detail) => assert!(
                matches!(*detail, FailureDetail::Coverage(CoverageRelocateError::Move { .. })),
                "unexpected detail: {detail:?}"
            ),
            other => panic!("expected a coverage failure, found {other:?}"),
        }

        // A unit that already failed keeps its own failure.
        let already_failed = failed(FailureDetail::UnexpectedExitCode {
            expected: 0,
            actual: Some(1),
            stderr: None,
        });
        match orchestrator.relocate_coverage(already_failed) {
            UnitStatus::Failed(detail) => assert!(
                matches!(*detail, FailureDetail::UnexpectedExitCode { .. }),
                "unexpected detail: {detail:?}"
            ),
            other => panic!("expected the original failure, found {other:?}"),
        }
    }

    // Removing a directory with `remove_file` fails with an error other than not-found or
    // permission-denied on Linux.
    #[cfg(target_os = "linux")]
    #[test]
    fn coverage_errors_do_not_abort_the_run() {
        let temp_dir = tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("lib_test.gcno")).unwrap();
        let config_file = temp_dir.child("golden-trace.toml");
        config_file
            .write_str("[build]\nprogram = \"true\"\n")
            .unwrap();

        let config =
            HarnessConfig::from_sources(temp_dir.path(), Some(config_file.as_path())).unwrap();
        let matrix = ScenarioMatrix::default_matrix();
        let orchestrator = RunOrchestrator::new(&config, &matrix, coverage_opts());

        let mut buf = Vec::new();
        let mut reporter = ReporterBuilder::default().build(ReporterStderr::Buffer(&mut buf));
        let stats = orchestrator
            .verify(&["library::output".to_owned()], true, &mut reporter)
            .expect("coverage errors are reported per unit");
        drop(reporter);

        // build::library_no_xml, build::library and library::output all ran.
        assert_eq!(stats.finished_count, 3);
        assert_eq!(stats.build_failed, 0);
        assert_eq!(
            stats.exit_code(RunMode::Verify),
            golden_trace_metadata::GoldenTraceExitCode::SCENARIO_RUN_FAILED
        );

        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("failed to remove coverage notes"), "{output}");
        assert!(output.contains("build::library_no_xml"), "{output}");
        assert!(output.contains("Summary"), "{output}");
    }
}
