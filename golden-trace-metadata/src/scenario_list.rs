// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root element for a serializable list of scenarios, as produced by
/// `golden-trace list --message-format json`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct ScenarioListSummary {
    /// The source root the scenario paths are relative to.
    pub source_root: Utf8PathBuf,

    /// The number of scenarios in the matrix.
    pub scenario_count: usize,

    /// The scenarios, keyed by name.
    pub scenarios: BTreeMap<String, ScenarioSummary>,
}

impl ScenarioListSummary {
    /// Creates a new, empty summary for the given source root.
    pub fn new(source_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            scenario_count: 0,
            scenarios: BTreeMap::new(),
        }
    }

    /// Adds a scenario to the summary, keeping the count up to date.
    pub fn add(&mut self, name: impl Into<String>, summary: ScenarioSummary) {
        self.scenarios.insert(name.into(), summary);
        self.scenario_count = self.scenarios.len();
    }

    /// Parses a summary from JSON.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }
}

/// Serializable information about a single scenario.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScenarioSummary {
    /// The executable run for this scenario.
    pub program: ProgramSummary,

    /// The argument vector, with compressed fixtures shown by their on-disk path.
    pub args: Vec<String>,

    /// The exit code the scenario is expected to produce.
    pub expected_exit_code: i32,

    /// How the scenario's output is checked.
    pub check: CheckSummary,
}

/// The executable a scenario runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramSummary {
    /// The standalone tool under test.
    Tool,

    /// The library test executable.
    LibraryTest,

    /// The library window example executable.
    WindowExample,
}

/// How a scenario's output is checked.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CheckSummary {
    /// Normalized output is compared against a golden reference file.
    Golden {
        /// The reference file, relative to the source root.
        reference: Utf8PathBuf,
    },

    /// Only the exit code is checked.
    ExitCodeOnly,

    /// Summary lines are cross-checked against the standalone tool run with these arguments.
    SummaryMatch {
        /// Arguments passed to the standalone tool.
        standalone_args: Vec<String>,
    },
}
