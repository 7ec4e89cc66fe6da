// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The declarative table of scenarios.
//!
//! Each [`Scenario`] is one invocation of the tool under test (or of a library-embedding
//! executable) together with how its result is checked. The table is built once by
//! [`ScenarioMatrix::default_matrix`] and never mutated.

use crate::build::BuildTarget;
use camino::{Utf8Path, Utf8PathBuf};
use golden_trace_metadata::{CheckSummary, ProgramSummary, ScenarioListSummary, ScenarioSummary};
use std::fmt;

const DDR2_800: &str = "memspecs/MICRON_1Gb_DDR2-800_16bit_H.xml";
const DDR2_1066: &str = "memspecs/MICRON_1Gb_DDR2-1066_16bit_H.xml";
const LPDDR2_1066: &str = "memspecs/MICRON_2Gb_LPDDR2-1066-S4_16bit_A.xml";
const LPDDR3_1333: &str = "memspecs/MICRON_4Gb_LPDDR3-1333_32bit_A.xml";
const DDR3_1600: &str = "memspecs/MICRON_1Gb_DDR3-1600_8bit_G.xml";
const DDR3_1600_3S: &str = "memspecs/MICRON_1Gb_DDR3-1600_8bit_G_3s.xml";
const DDR3_1600_3S_MODIFIED: &str = "memspecs/modified_MICRON_1Gb_DDR3-1600_8bit_G_3s.xml";

const COMMANDS_TRACE: &str = "traces/commands.trace";
const JPEGENCODE_TRACE: &str = "traces/mediabench-jpegencode.trace";
const LPDDR2_TRACE_GZ: &str = "test/data/LPDDR2-1066.commands.trace.gz";
const LPDDR2_SHORT_TRACE: &str = "test/data/LPDDR2-1066_short.commands.trace";
const REFB_TRACE: &str = "test/data/REFB.commands.trace";
const PASR_TRACE: &str = "test/data/PASR.commands.trace";
const WARNINGS_TRACE: &str = "test/data/warnings.trace";
const WINDOW_TRACE: &str = "test/libdrampowertest/window.trace";

const RHO_RATIOS: [u8; 4] = [25, 50, 75, 100];
const SIGMA_RATIOS: [u8; 4] = [25, 50, 75, 100];
const PASR_MODES: std::ops::RangeInclusive<u8> = 0..=7;

fn lit(arg: impl Into<String>) -> ScenarioArg {
    ScenarioArg::Literal(arg.into())
}

fn reference(file_name: &str) -> Utf8PathBuf {
    Utf8Path::new("test/reference").join(file_name)
}

/// A library-embedding executable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LibraryExecutable {
    /// Drives the library through a full command trace.
    LibraryTest,

    /// Feeds the library a window of commands and prints the summary.
    WindowExample,
}

impl LibraryExecutable {
    /// The executable's file name within the library test directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::LibraryTest => "library_test",
            Self::WindowExample => "window_example",
        }
    }
}

/// The executable a scenario runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScenarioProgram {
    /// The standalone tool.
    Tool,

    /// A library-embedding executable.
    Library(LibraryExecutable),
}

impl ScenarioProgram {
    /// The build that produces this program.
    pub fn build_target(self) -> BuildTarget {
        match self {
            Self::Tool => BuildTarget::Standalone,
            Self::Library(_) => BuildTarget::LibraryTest,
        }
    }
}

/// One argument passed to a scenario's program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScenarioArg {
    /// Passed verbatim.
    Literal(String),

    /// A gzip-compressed fixture, relative to the source root. It is decompressed to a temporary
    /// file whose path is passed instead.
    Decompressed(Utf8PathBuf),
}

impl fmt::Display for ScenarioArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(arg) => write!(f, "{arg}"),
            Self::Decompressed(path) => write!(f, "{path}"),
        }
    }
}

/// How a scenario's result is checked.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScenarioCheck {
    /// Normalized standard output must equal the normalized reference file.
    Golden {
        /// The reference file, relative to the source root.
        reference: Utf8PathBuf,
    },

    /// Only the exit code is checked.
    ExitCodeOnly,

    /// Summary lines must equal those of the standalone tool run with `standalone_args`.
    SummaryMatch {
        /// Arguments for the standalone tool.
        standalone_args: Vec<ScenarioArg>,
    },
}

/// What happens to a scenario's standard error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StderrPolicy {
    /// Standard error is not kept.
    Discard,

    /// Standard error is kept in memory and shown if the scenario fails.
    Capture,
}

/// A single entry in the scenario matrix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Scenario {
    /// The unique name, in the form `group::case`.
    pub name: String,

    /// The executable to run.
    pub program: ScenarioProgram,

    /// The arguments.
    pub args: Vec<ScenarioArg>,

    /// How the result is checked.
    pub check: ScenarioCheck,

    /// The exit code the program must return.
    pub expected_exit_code: i32,

    /// What happens to standard error.
    pub stderr: StderrPolicy,
}

impl Scenario {
    fn tool(name: impl Into<String>, args: Vec<ScenarioArg>, check: ScenarioCheck) -> Self {
        Self {
            name: name.into(),
            program: ScenarioProgram::Tool,
            args,
            check,
            expected_exit_code: 0,
            stderr: StderrPolicy::Capture,
        }
    }

    fn golden(name: impl Into<String>, args: Vec<ScenarioArg>, reference_file: &str) -> Self {
        Self::tool(
            name,
            args,
            ScenarioCheck::Golden {
                reference: reference(reference_file),
            },
        )
    }

    fn with_expected_exit_code(mut self, code: i32) -> Self {
        self.expected_exit_code = code;
        self
    }

    fn with_stderr(mut self, stderr: StderrPolicy) -> Self {
        self.stderr = stderr;
        self
    }

    /// Returns the group part of the name (before `::`).
    pub fn group(&self) -> &str {
        self.name
            .split_once("::")
            .map_or(self.name.as_str(), |(group, _)| group)
    }

    /// Returns true if this scenario needs the standalone tool to be built.
    pub fn needs_standalone(&self) -> bool {
        self.program == ScenarioProgram::Tool
            || matches!(self.check, ScenarioCheck::SummaryMatch { .. })
    }

    /// Returns true if this scenario needs the library executables to be built.
    pub fn needs_library(&self) -> bool {
        self.program.build_target() == BuildTarget::LibraryTest
    }

    /// Returns the reference file, if this scenario is checked against one.
    pub fn reference(&self) -> Option<&Utf8Path> {
        match &self.check {
            ScenarioCheck::Golden { reference } => Some(reference),
            ScenarioCheck::ExitCodeOnly | ScenarioCheck::SummaryMatch { .. } => None,
        }
    }

    /// Returns true if any of `filters` is a substring of the name. An empty filter list matches
    /// everything.
    pub fn matches_filters(&self, filters: &[String]) -> bool {
        filters.is_empty() || filters.iter().any(|filter| self.name.contains(filter.as_str()))
    }

    /// Returns a serializable summary of this scenario.
    pub fn to_summary(&self) -> ScenarioSummary {
        let program = match self.program {
            ScenarioProgram::Tool => ProgramSummary::Tool,
            ScenarioProgram::Library(LibraryExecutable::LibraryTest) => {
                ProgramSummary::LibraryTest
            }
            ScenarioProgram::Library(LibraryExecutable::WindowExample) => {
                ProgramSummary::WindowExample
            }
        };
        let check = match &self.check {
            ScenarioCheck::Golden { reference } => CheckSummary::Golden {
                reference: reference.clone(),
            },
            ScenarioCheck::ExitCodeOnly => CheckSummary::ExitCodeOnly,
            ScenarioCheck::SummaryMatch { standalone_args } => CheckSummary::SummaryMatch {
                standalone_args: standalone_args.iter().map(ToString::to_string).collect(),
            },
        };

        ScenarioSummary {
            program,
            args: self.args.iter().map(ToString::to_string).collect(),
            expected_exit_code: self.expected_exit_code,
            check,
        }
    }
}

/// The full table of scenarios.
#[derive(Clone, Debug)]
pub struct ScenarioMatrix {
    scenarios: Vec<Scenario>,
}

impl ScenarioMatrix {
    /// Creates a matrix from a list of scenarios.
    pub fn new(scenarios: impl IntoIterator<Item = Scenario>) -> Self {
        Self {
            scenarios: scenarios.into_iter().collect(),
        }
    }

    /// Returns the matrix of scenarios for the power estimation tool.
    pub fn default_matrix() -> Self {
        let mut scenarios = vec![
            Scenario::golden(
                "output::commands_trace",
                vec![lit("-m"), lit(DDR2_1066), lit("-c"), lit(COMMANDS_TRACE)],
                "test_commands_trace_output_matches_reference.out",
            ),
            Scenario::tool("exit_code::no_arguments", vec![], ScenarioCheck::ExitCodeOnly)
                .with_expected_exit_code(1),
            Scenario::golden(
                "output::lpddr2_1066",
                vec![
                    lit("-m"),
                    lit(LPDDR2_1066),
                    lit("-c"),
                    ScenarioArg::Decompressed(LPDDR2_TRACE_GZ.into()),
                ],
                "test_LPDDR2_1066_matches_reference.out",
            ),
            Scenario::golden(
                "output::lpddr2_1066_termination",
                vec![
                    lit("-m"),
                    lit(LPDDR2_1066),
                    lit("-c"),
                    ScenarioArg::Decompressed(LPDDR2_TRACE_GZ.into()),
                    lit("-r"),
                ],
                "test_LPDDR2_1066_termination_matches_reference.out",
            ),
            Scenario::golden(
                "output::lpddr2_1066_short",
                vec![lit("-m"), lit(LPDDR2_1066), lit("-c"), lit(LPDDR2_SHORT_TRACE)],
                "test_LPDDR2_1066_short_matches_reference.out",
            ),
            Scenario::golden(
                "output::transaction_scheduler",
                vec![lit("-m"), lit(LPDDR3_1333), lit("-t"), lit(JPEGENCODE_TRACE)],
                "test_transaction_scheduler.out",
            ),
            Scenario::golden(
                "output::transaction_scheduler_self_refresh",
                vec![
                    lit("-m"),
                    lit(LPDDR3_1333),
                    lit("-t"),
                    lit(JPEGENCODE_TRACE),
                    lit("-p"),
                    lit("2"),
                ],
                "test_transaction_scheduler_with_self_refresh.out",
            ),
            Scenario::golden(
                "bankwise::refresh",
                vec![lit("-m"), lit(DDR3_1600_3S_MODIFIED), lit("-c"), lit(REFB_TRACE)],
                "test_MICRON_1Gb_DDR3_1600_8bit_G_3s_bankwise_refresh.out",
            ),
        ];

        scenarios.extend(RHO_RATIOS.into_iter().map(|rho| {
            Scenario::golden(
                format!("bankwise::rho_{rho}"),
                vec![
                    lit("-m"),
                    lit(DDR3_1600_3S),
                    lit("-t"),
                    lit(JPEGENCODE_TRACE),
                    lit("-b"),
                    lit(rho.to_string()),
                ],
                &format!("test_MICRON_1Gb_DDR3_1600_8bit_G_3s_bankwise_Rho_{rho}_reference.out"),
            )
        }));

        for sigma in SIGMA_RATIOS {
            scenarios.extend(PASR_MODES.map(|mode| {
                Scenario::golden(
                    format!("pasr::sigma_{sigma}_mode_{mode}"),
                    vec![
                        lit("-m"),
                        lit(DDR3_1600),
                        lit("-c"),
                        lit(PASR_TRACE),
                        lit("-b"),
                        lit(format!("100,{sigma}")),
                        lit("-pasr"),
                        lit(mode.to_string()),
                    ],
                    &format!(
                        "test_MICRON_1Gb_DDR3-1600_8bit_G_Sigma_{sigma}_pasr_{mode}_reference.out"
                    ),
                )
            }));
        }

        scenarios.push(
            Scenario::tool(
                "exit_code::broken_trace",
                vec![lit("-m"), lit(DDR2_800), lit("-c"), lit(WARNINGS_TRACE)],
                ScenarioCheck::ExitCodeOnly,
            )
            .with_stderr(StderrPolicy::Discard),
        );

        scenarios.push(Scenario {
            name: "library::output".to_owned(),
            program: ScenarioProgram::Library(LibraryExecutable::LibraryTest),
            args: vec![lit(DDR2_1066)],
            check: ScenarioCheck::Golden {
                reference: reference("test_libdrampower_output_matches_reference.out"),
            },
            expected_exit_code: 0,
            stderr: StderrPolicy::Discard,
        });
        scenarios.push(Scenario {
            name: "library::window_summary".to_owned(),
            program: ScenarioProgram::Library(LibraryExecutable::WindowExample),
            args: vec![lit(DDR2_1066)],
            check: ScenarioCheck::SummaryMatch {
                standalone_args: vec![lit("-m"), lit(DDR2_1066), lit("-c"), lit(WINDOW_TRACE)],
            },
            expected_exit_code: 0,
            stderr: StderrPolicy::Capture,
        });

        Self::new(scenarios)
    }

    /// Returns the number of scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Returns true if there are no scenarios.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Iterates over the scenarios in matrix order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    /// Looks up a scenario by name.
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }

    /// Returns the scenarios matching any of `filters`, in matrix order.
    pub fn filtered<'a>(&'a self, filters: &'a [String]) -> impl Iterator<Item = &'a Scenario> {
        self.scenarios
            .iter()
            .filter(move |scenario| scenario.matches_filters(filters))
    }

    /// Returns a serializable summary of the matrix.
    pub fn to_summary(&self, source_root: &Utf8Path) -> ScenarioListSummary {
        let mut summary = ScenarioListSummary::new(source_root);
        for scenario in &self.scenarios {
            summary.add(scenario.name.clone(), scenario.to_summary());
        }
        summary
    }
}
