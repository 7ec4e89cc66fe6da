// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable output on standard error.

use super::{
    ReporterStderr,
    events::{FailureDetail, ReporterEvent, RunMode, RunStats, UnitId, UnitResult, UnitStatus},
};
use crate::helpers::plural;
use owo_colors::{OwoColorize, Style};
use std::io::{self, Write};
use swrite::{SWrite, swrite, swriteln};

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    regen: Style,
    diff_reference: Style,
    diff_actual: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.regen = Style::new().cyan().bold();
        self.diff_reference = Style::new().red();
        self.diff_actual = Style::new().green();
    }
}

pub(super) struct DisplayReporter<'a> {
    output: ReporterStderr<'a>,
    styles: Styles,
    verbose: bool,
    mode: RunMode,
    final_failures: Vec<(String, &'static str)>,
}

impl<'a> DisplayReporter<'a> {
    pub(super) fn new(output: ReporterStderr<'a>, should_colorize: bool, verbose: bool) -> Self {
        let mut styles = Styles::default();
        if should_colorize {
            styles.colorize();
        }
        Self {
            output,
            styles,
            verbose,
            mode: RunMode::Verify,
            final_failures: Vec::new(),
        }
    }

    pub(super) fn write_event(&mut self, event: &ReporterEvent<'_>) -> io::Result<()> {
        let mut out = String::new();
        self.format_event(event, &mut out);
        if out.is_empty() {
            return Ok(());
        }

        match &mut self.output {
            ReporterStderr::Terminal => {
                let mut stderr = io::stderr().lock();
                stderr.write_all(out.as_bytes())?;
                stderr.flush()
            }
            ReporterStderr::Buffer(buf) => buf.write_all(out.as_bytes()),
        }
    }

    fn format_event(&mut self, event: &ReporterEvent<'_>, out: &mut String) {
        match event {
            ReporterEvent::RunStarted {
                mode, unit_count, ..
            } => {
                self.mode = *mode;
                swriteln!(
                    out,
                    "{:>12} {} {} ({mode})",
                    "Starting".style(self.styles.pass),
                    unit_count.style(self.styles.count),
                    plural::units_str(*unit_count),
                );
            }
            ReporterEvent::UnitStarted { unit } => {
                if self.verbose {
                    swriteln!(out, "{:>12} {unit}", "START".style(self.styles.pass));
                }
            }
            ReporterEvent::UnitFinished { unit, result } => {
                self.format_unit_finished(unit, result, out);
            }
            ReporterEvent::RunFinished { stats, elapsed } => {
                let summary_style = if stats.initial_count == 0 {
                    self.styles.skip
                } else if stats.is_success() {
                    self.styles.pass
                } else {
                    self.styles.fail
                };

                swriteln!(out, "{}", "-".repeat(12));
                swrite!(
                    out,
                    "{:>12} [{:>8.3}s] ",
                    "Summary".style(summary_style),
                    elapsed.as_secs_f64()
                );
                self.format_summary(stats, out);

                for (name, status) in &self.final_failures {
                    swriteln!(out, "{:>12} {name}", status.style(self.styles.fail));
                }
            }
        }
    }

    fn format_unit_finished(&mut self, unit: &UnitId, result: &UnitResult, out: &mut String) {
        let (status_str, style) = status_str_and_style(&result.status, &self.styles);
        swrite!(
            out,
            "{:>12} [{:>8.3}s] {unit}",
            status_str.style(style),
            result.time_taken.as_secs_f64()
        );

        match &result.status {
            UnitStatus::Passed => out.push('\n'),
            UnitStatus::Regenerated { reference } => swriteln!(out, " -> {reference}"),
            UnitStatus::Skipped { reason } => swriteln!(out, " ({reason})"),
            UnitStatus::NotRun { reason } => {
                swriteln!(out, " ({reason})");
                self.final_failures.push((unit.to_string(), status_str));
            }
            UnitStatus::Failed(detail) => {
                out.push('\n');
                self.format_failure_detail(detail, out);
                self.final_failures.push((unit.to_string(), status_str));
            }
        }
    }

    fn format_failure_detail(&self, detail: &FailureDetail, out: &mut String) {
        let detail = detail.to_string();
        for line in detail.lines() {
            let style = match line.chars().next() {
                Some('-') if !line.starts_with("---") => self.styles.diff_reference,
                Some('+') if !line.starts_with("+++") => self.styles.diff_actual,
                _ => Style::new(),
            };
            swriteln!(out, "    {}", line.style(style));
        }
    }

    fn format_summary(&self, stats: &RunStats, out: &mut String) {
        swrite!(out, "{}", stats.finished_count.style(self.styles.count));
        if stats.finished_count != stats.initial_count {
            swrite!(out, "/{}", stats.initial_count.style(self.styles.count));
        }
        swrite!(out, " {} run: ", plural::units_str(stats.initial_count));

        let mut parts = Vec::new();
        match self.mode {
            RunMode::Regenerate => parts.push(format!(
                "{} regenerated",
                stats.regenerated.style(self.styles.count)
            )),
            RunMode::Verify | RunMode::Clean => {}
        }
        parts.push(format!(
            "{} {}",
            stats.passed.style(self.styles.count),
            "passed".style(self.styles.pass)
        ));
        if stats.failed > 0 {
            parts.push(format!(
                "{} {}",
                stats.failed.style(self.styles.count),
                "failed".style(self.styles.fail)
            ));
        }
        if stats.not_run > 0 {
            parts.push(format!(
                "{} {}",
                stats.not_run.style(self.styles.count),
                "not run".style(self.styles.fail)
            ));
        }
        if stats.skipped > 0 {
            parts.push(format!(
                "{} {}",
                stats.skipped.style(self.styles.count),
                "skipped".style(self.styles.skip)
            ));
        }
        swriteln!(out, "{}", parts.join(", "));
    }
}

fn status_str_and_style(status: &UnitStatus, styles: &Styles) -> (&'static str, Style) {
    match status {
        UnitStatus::Passed => ("PASS", styles.pass),
        UnitStatus::Regenerated { .. } => ("REGEN", styles.regen),
        UnitStatus::Skipped { .. } => ("SKIP", styles.skip),
        UnitStatus::NotRun { .. } => ("NOT RUN", styles.fail),
        UnitStatus::Failed(_) => ("FAIL", styles.fail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        build::BuildTarget,
        compare::{Comparison, compare},
        reporter::events::{NotRunReason, SkipReason},
    };
    use chrono::Local;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn render(events: &[ReporterEvent<'_>]) -> String {
        let mut buf = Vec::new();
        let mut reporter = DisplayReporter::new(ReporterStderr::Buffer(&mut buf), false, false);
        for event in events {
            reporter.write_event(event).unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn verify_run_output() {
        let build = UnitId::Build {
            target: BuildTarget::Standalone,
            xml_backend: true,
        };
        let commands = UnitId::Scenario("output::commands_trace".to_owned());
        let window = UnitId::Scenario("library::window_summary".to_owned());

        let Comparison::Mismatch(mismatch) =
            compare(&["Average Power: 2 mW\n"], &["Average Power: 1 mW\n"])
        else {
            panic!("expected mismatch");
        };
        let passed = UnitResult {
            status: UnitStatus::Passed,
            time_taken: Duration::from_millis(1250),
        };
        let failed = UnitResult {
            status: UnitStatus::Failed(Box::new(FailureDetail::OutputMismatch {
                reference: "test/reference/commands.out".into(),
                mismatch,
            })),
            time_taken: Duration::from_millis(20),
        };
        let not_run = UnitResult {
            status: UnitStatus::NotRun {
                reason: NotRunReason::BuildFailed(UnitId::Build {
                    target: BuildTarget::LibraryTest,
                    xml_backend: true,
                }),
            },
            time_taken: Duration::ZERO,
        };

        let mut stats = RunStats::new(3);
        stats.on_unit_finished(&build, &passed.status);
        stats.on_unit_finished(&commands, &failed.status);
        stats.on_unit_finished(&window, &not_run.status);

        let output = render(&[
            ReporterEvent::RunStarted {
                mode: RunMode::Verify,
                unit_count: 3,
                start_time: Local::now().fixed_offset(),
            },
            ReporterEvent::UnitStarted { unit: &build },
            ReporterEvent::UnitFinished {
                unit: &build,
                result: &passed,
            },
            ReporterEvent::UnitFinished {
                unit: &commands,
                result: &failed,
            },
            ReporterEvent::UnitFinished {
                unit: &window,
                result: &not_run,
            },
            ReporterEvent::RunFinished {
                stats,
                elapsed: Duration::from_millis(1500),
            },
        ]);

        assert_eq!(
            output,
            indoc! {"
                    Starting 3 units (verify)
                        PASS [   1.250s] build::standalone
                        FAIL [   0.020s] output::commands_trace
                    reference file: test/reference/commands.out
                    output differs from reference at line 1 (1 reference lines, 1 actual lines)
                    --- reference
                    +++ actual
                    -Average Power: 1 mW
                    +Average Power: 2 mW
                     NOT RUN [   0.000s] library::window_summary (build::library failed)
                ------------
                     Summary [   1.500s] 3 units run: 1 passed, 1 failed, 1 not run
                        FAIL output::commands_trace
                     NOT RUN library::window_summary
            "}
        );
    }

    #[test]
    fn regenerate_run_output() {
        let golden = UnitId::Scenario("output::commands_trace".to_owned());
        let exit_code = UnitId::Scenario("exit_code::no_arguments".to_owned());
        let regenerated = UnitResult {
            status: UnitStatus::Regenerated {
                reference: "test/reference/commands.out".into(),
            },
            time_taken: Duration::from_millis(5),
        };
        let skipped = UnitResult {
            status: UnitStatus::Skipped {
                reason: SkipReason::NoReference,
            },
            time_taken: Duration::ZERO,
        };

        let mut stats = RunStats::new(2);
        stats.on_unit_finished(&golden, &regenerated.status);
        stats.on_unit_finished(&exit_code, &skipped.status);

        let output = render(&[
            ReporterEvent::RunStarted {
                mode: RunMode::Regenerate,
                unit_count: 2,
                start_time: Local::now().fixed_offset(),
            },
            ReporterEvent::UnitFinished {
                unit: &golden,
                result: &regenerated,
            },
            ReporterEvent::UnitFinished {
                unit: &exit_code,
                result: &skipped,
            },
            ReporterEvent::RunFinished {
                stats,
                elapsed: Duration::from_millis(10),
            },
        ]);

        assert_eq!(
            output,
            indoc! {"
                    Starting 2 units (regenerate)
                       REGEN [   0.005s] output::commands_trace -> test/reference/commands.out
                        SKIP [   0.000s] exit_code::no_arguments (no reference file)
                ------------
                     Summary [   0.010s] 2 units run: 1 regenerated, 0 passed, 1 skipped
            "}
        );
    }
}
