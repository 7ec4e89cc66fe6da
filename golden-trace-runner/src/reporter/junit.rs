// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code to generate JUnit XML reports from run events.

use super::{
    JunitConfig,
    events::{FailureDetail, ReporterEvent, UnitId, UnitResult, UnitStatus},
};
use crate::errors::JunitWriteError;
use chrono::{DateTime, FixedOffset};
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::fs::File;

#[derive(Debug)]
pub(super) struct MetadataJunit {
    config: JunitConfig,
    start_time: Option<DateTime<FixedOffset>>,
    test_suites: Vec<(String, TestSuite)>,
}

impl MetadataJunit {
    pub(super) fn new(config: JunitConfig) -> Self {
        Self {
            config,
            start_time: None,
            test_suites: Vec::new(),
        }
    }

    pub(super) fn write_event(&mut self, event: &ReporterEvent<'_>) -> Result<(), JunitWriteError> {
        match event {
            ReporterEvent::RunStarted { start_time, .. } => {
                self.start_time = Some(*start_time);
            }
            ReporterEvent::UnitStarted { .. } => {}
            ReporterEvent::UnitFinished { unit, result } => {
                let test_case = test_case_for(unit, result);
                self.test_suite_for(unit.group()).add_test_case(test_case);
            }
            ReporterEvent::RunFinished { elapsed, .. } => {
                let mut report = Report::new(self.config.report_name.as_str());
                if let Some(start_time) = self.start_time {
                    report.set_timestamp(start_time);
                }
                report
                    .set_time(*elapsed)
                    .add_test_suites(self.test_suites.drain(..).map(|(_, suite)| suite));

                let junit_path = &self.config.path;
                if let Some(junit_dir) = junit_path.parent() {
                    std::fs::create_dir_all(junit_dir).map_err(|error| JunitWriteError::Fs {
                        path: junit_dir.to_owned(),
                        error,
                    })?;
                }

                let f = File::create(junit_path).map_err(|error| JunitWriteError::Fs {
                    path: junit_path.clone(),
                    error,
                })?;
                report
                    .serialize(f)
                    .map_err(|error| JunitWriteError::Serialize {
                        path: junit_path.clone(),
                        error: Box::new(error),
                    })?;
            }
        }

        Ok(())
    }

    fn test_suite_for(&mut self, group: &str) -> &mut TestSuite {
        let index = match self.test_suites.iter().position(|(name, _)| name == group) {
            Some(index) => index,
            None => {
                self.test_suites
                    .push((group.to_owned(), TestSuite::new(group)));
                self.test_suites.len() - 1
            }
        };
        &mut self.test_suites[index].1
    }
}

fn test_case_for(unit: &UnitId, result: &UnitResult) -> TestCase {
    let status = match &result.status {
        UnitStatus::Passed | UnitStatus::Regenerated { .. } => TestCaseStatus::success(),
        UnitStatus::Skipped { reason } => {
            let mut status = TestCaseStatus::skipped();
            status.set_message(reason.to_string());
            status
        }
        UnitStatus::NotRun { reason } => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Error);
            status
                .set_type("not run")
                .set_message(format!("not run: {reason}"));
            status
        }
        UnitStatus::Failed(detail) => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
            status
                .set_type(failure_type(detail))
                .set_message(detail.headline())
                .set_description(detail.to_string());
            status
        }
    };

    let mut test_case = TestCase::new(unit.to_string(), status);
    test_case
        .set_classname(unit.group())
        .set_time(result.time_taken);
    test_case
}

fn failure_type(detail: &FailureDetail) -> &'static str {
    match detail {
        FailureDetail::BuildFailed { .. } => "build failure",
        FailureDetail::CleanFailed { .. }
        | FailureDetail::Hygiene(_)
        | FailureDetail::HygieneScan(_) => "hygiene failure",
        FailureDetail::UnexpectedExitCode { .. } => "unexpected exit code",
        FailureDetail::OutputMismatch { .. } | FailureDetail::SummaryMismatch { .. } => {
            "output mismatch"
        }
        FailureDetail::Exec(_) => "execution failure",
        FailureDetail::ReferenceRead(_) | FailureDetail::ReferenceWrite(_) => "reference file error",
        FailureDetail::Coverage(_) => "coverage data error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build::BuildTarget, reporter::events::RunStats};
    use camino_tempfile::tempdir;
    use chrono::Local;
    use std::time::Duration;

    #[test]
    fn writes_report() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("reports/junit.xml");
        let mut junit = MetadataJunit::new(JunitConfig::new(&path));

        let build = UnitId::Build {
            target: BuildTarget::Standalone,
            xml_backend: true,
        };
        let scenario = UnitId::Scenario("exit_code::no_arguments".to_owned());
        let passed = UnitResult {
            status: UnitStatus::Passed,
            time_taken: Duration::from_millis(100),
        };
        let failed = UnitResult {
            status: UnitStatus::Failed(Box::new(FailureDetail::UnexpectedExitCode {
                expected: 1,
                actual: Some(0),
                stderr: None,
            })),
            time_taken: Duration::from_millis(3),
        };

        let events = [
            ReporterEvent::RunStarted {
                mode: crate::reporter::RunMode::Verify,
                unit_count: 2,
                start_time: Local::now().fixed_offset(),
            },
            ReporterEvent::UnitFinished {
                unit: &build,
                result: &passed,
            },
            ReporterEvent::UnitFinished {
                unit: &scenario,
                result: &failed,
            },
            ReporterEvent::RunFinished {
                stats: RunStats::new(2),
                elapsed: Duration::from_millis(103),
            },
        ];
        for event in &events {
            junit.write_event(event).unwrap();
        }

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains(r#"<testsuites name="golden-trace-run""#), "{xml}");
        assert!(xml.contains(r#"<testsuite name="build""#), "{xml}");
        assert!(xml.contains(r#"<testsuite name="exit_code""#), "{xml}");
        assert!(
            xml.contains(r#"<testcase name="exit_code::no_arguments" classname="exit_code""#),
            "{xml}"
        );
        assert!(
            xml.contains(r#"message="expected exit code 1, found exit code 0""#),
            "{xml}"
        );
    }
}
