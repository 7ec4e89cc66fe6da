// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum, builder::FalseyValueParser};
use golden_trace_metadata::{CheckSummary, ProgramSummary, ScenarioListSummary};
use golden_trace_runner::{
    config::HarnessConfig,
    reporter::{JunitConfig, ReporterBuilder, RunMode, RunStats},
    run::{RunOrchestrator, RunOrchestratorOpts},
    runner::OutputSink,
    scenario::ScenarioMatrix,
};
use owo_colors::{OwoColorize, Style, style};
use std::io::Write;
use supports_color::Stream;
use swrite::{SWrite, swriteln};
use tracing::debug;

/// A golden-output regression harness for a memory power estimation tool.
///
/// golden-trace builds the tool and its library from source, runs them over a fixed matrix of
/// memory specifications and command traces, and compares their output against reference files.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct GoldenTraceApp {
    /// Root of the source tree under test [default: current directory]
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        env = "GOLDEN_TRACE_SOURCE_ROOT"
    )]
    source_root: Option<Utf8PathBuf>,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: source-root/.config/golden-trace.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, source_root: &Utf8Path) -> Result<HarnessConfig> {
        Ok(HarnessConfig::from_sources(
            source_root,
            self.config_file.as_deref(),
        )?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the tool and check every scenario against its reference
    ///
    /// Builds the standalone tool and the library, runs each selected scenario, compares normalized
    /// output against the reference files, and finally checks that `make clean` leaves no build
    /// artifacts behind.
    Verify {
        #[command(flatten)]
        filter: ScenarioFilterOpts,

        #[command(flatten)]
        build: BuildOpts,

        /// Write a JUnit XML report to this path
        #[arg(long, value_name = "PATH")]
        junit: Option<Utf8PathBuf>,

        /// Skip the clean and leftover-artifact check at the end of the run
        #[arg(long)]
        no_hygiene: bool,
    },

    /// Rewrite reference files with fresh output
    ///
    /// Only scenarios checked against a reference file are run. A reference is replaced only if the
    /// scenario exits with its expected code.
    Regenerate {
        #[command(flatten)]
        filter: ScenarioFilterOpts,

        #[command(flatten)]
        build: BuildOpts,
    },

    /// List the scenario matrix
    List {
        /// Output format
        #[arg(
            short = 'T',
            long,
            value_enum,
            default_value_t,
            value_name = "FMT"
        )]
        message_format: MessageFormatOpts,
    },

    /// Run `make clean` and check that no build artifacts are left behind
    Clean,
}

#[derive(Debug, Args)]
struct ScenarioFilterOpts {
    /// Only run scenarios whose name contains one of these strings
    #[arg(value_name = "FILTERS")]
    filters: Vec<String>,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Build options")]
struct BuildOpts {
    /// Build with coverage instrumentation and relocate the library's coverage data
    ///
    /// `COVERAGE=1` enables coverage, and `COVERAGE=0` (or an empty value) leaves it off.
    #[arg(long, env = "COVERAGE", value_parser = FalseyValueParser::new())]
    coverage: bool,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormatOpts {
    /// One scenario per line
    #[default]
    Human,
    /// JSON on a single line
    Json,
    /// Indented JSON
    JsonPretty,
}

impl GoldenTraceApp {
    /// Initializes logging and color output.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code on success.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let source_root = resolve_source_root(self.source_root)?;
        debug!("using source root {source_root}");
        let config = self.config_opts.make_config(&source_root)?;
        let matrix = ScenarioMatrix::default_matrix();

        match self.command {
            Command::Verify {
                filter,
                build,
                junit,
                no_hygiene,
            } => {
                let orchestrator = make_orchestrator(&config, &matrix, &build, output);
                let mut builder = make_reporter_builder(output);
                if let Some(junit) = junit {
                    builder.set_junit(JunitConfig::new(junit));
                }
                let mut reporter = builder.build(output_writer.reporter_output());

                let stats = orchestrator.verify(&filter.filters, !no_hygiene, &mut reporter)?;
                finish(RunMode::Verify, stats)
            }
            Command::Regenerate { filter, build } => {
                let orchestrator = make_orchestrator(&config, &matrix, &build, output);
                let mut reporter =
                    make_reporter_builder(output).build(output_writer.reporter_output());

                let stats = orchestrator.regenerate(&filter.filters, &mut reporter)?;
                finish(RunMode::Regenerate, stats)
            }
            Command::List { message_format } => {
                let summary = matrix.to_summary(config.source_root());
                let should_colorize = output.color.should_colorize(Stream::Stdout);
                let rendered = match message_format {
                    MessageFormatOpts::Human => {
                        render_human_list(&summary, output.verbose, should_colorize)
                    }
                    MessageFormatOpts::Json => serde_json::to_string(&summary)
                        .map_err(|err| ExpectedError::SerializeListError { err })?,
                    MessageFormatOpts::JsonPretty => serde_json::to_string_pretty(&summary)
                        .map_err(|err| ExpectedError::SerializeListError { err })?,
                };

                let mut writer = output_writer.stdout_writer();
                writeln!(writer, "{}", rendered.trim_end())
                    .and_then(|()| writer.flush())
                    .map_err(|err| ExpectedError::WriteListError { err })?;
                Ok(0)
            }
            Command::Clean => {
                let orchestrator = RunOrchestrator::new(
                    &config,
                    &matrix,
                    RunOrchestratorOpts {
                        build_output: build_output(output),
                        ..RunOrchestratorOpts::default()
                    },
                );
                let mut reporter =
                    make_reporter_builder(output).build(output_writer.reporter_output());

                let stats = orchestrator.clean(&mut reporter)?;
                finish(RunMode::Clean, stats)
            }
        }
    }
}

fn resolve_source_root(source_root: Option<Utf8PathBuf>) -> Result<Utf8PathBuf> {
    let source_root = match source_root {
        Some(source_root) => source_root,
        None => {
            let current_dir = std::env::current_dir()
                .map_err(|error| ExpectedError::CurrentDirUnavailable { error })?;
            Utf8PathBuf::try_from(current_dir).map_err(|err| {
                ExpectedError::SourceRootInvalidUtf8 {
                    path: err.into_path_buf(),
                }
            })?
        }
    };

    if !source_root.is_dir() {
        return Err(ExpectedError::SourceRootNotFound { source_root });
    }
    Ok(source_root)
}

fn build_output(output: OutputContext) -> OutputSink {
    if output.verbose {
        OutputSink::Inherit
    } else {
        OutputSink::Discard
    }
}

fn make_orchestrator<'a>(
    config: &'a HarnessConfig,
    matrix: &'a ScenarioMatrix,
    build: &BuildOpts,
    output: OutputContext,
) -> RunOrchestrator<'a> {
    RunOrchestrator::new(
        config,
        matrix,
        RunOrchestratorOpts {
            build_output: build_output(output),
            discarded_stderr: OutputSink::Discard,
            coverage: build.coverage,
        },
    )
}

fn make_reporter_builder(output: OutputContext) -> ReporterBuilder {
    let mut builder = ReporterBuilder::default();
    builder
        .set_colorize(output.color.should_colorize(Stream::Stderr))
        .set_verbose(output.verbose);
    builder
}

fn finish(mode: RunMode, stats: RunStats) -> Result<i32> {
    let exit_code = stats.exit_code(mode);
    if exit_code == 0 {
        Ok(exit_code)
    } else {
        Err(ExpectedError::run_failed(mode, stats))
    }
}

fn render_human_list(summary: &ScenarioListSummary, verbose: bool, should_colorize: bool) -> String {
    let (name_style, detail_style) = if should_colorize {
        (style().bold(), style().dimmed())
    } else {
        (Style::new(), Style::new())
    };

    let mut out = String::new();
    for (name, scenario) in &summary.scenarios {
        swriteln!(out, "{}", name.style(name_style));
        if !verbose {
            continue;
        }

        let program = match scenario.program {
            ProgramSummary::Tool => "tool",
            ProgramSummary::LibraryTest => "library_test",
            ProgramSummary::WindowExample => "window_example",
        };
        swriteln!(
            out,
            "    {} {}",
            program.style(detail_style),
            scenario.args.join(" "),
        );
        let check = match &scenario.check {
            CheckSummary::Golden { reference } => format!("reference: {reference}"),
            CheckSummary::ExitCodeOnly => "exit code only".to_owned(),
            CheckSummary::SummaryMatch { standalone_args } => {
                format!("summary matches tool: {}", standalone_args.join(" "))
            }
        };
        swriteln!(
            out,
            "    {} (expected exit code {})",
            check.style(detail_style),
            scenario.expected_exit_code,
        );
    }
    out
}
