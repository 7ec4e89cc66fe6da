// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data models for fixture information.

use golden_trace_metadata::{CheckSummary, ProgramSummary, ScenarioSummary};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScenarioFixture {
    pub name: String,
    pub program: ProgramSummary,
    pub check: CheckKind,
    pub expected_exit_code: i32,
}

impl ScenarioFixture {
    pub fn golden(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: ProgramSummary::Tool,
            check: CheckKind::Golden,
            expected_exit_code: 0,
        }
    }

    pub fn with_program(mut self, program: ProgramSummary) -> Self {
        self.program = program;
        self
    }

    pub fn with_check(mut self, check: CheckKind) -> Self {
        self.check = check;
        self
    }

    pub fn with_expected_exit_code(mut self, expected_exit_code: i32) -> Self {
        self.expected_exit_code = expected_exit_code;
        self
    }

    /// Returns true if `summary` describes this fixture.
    pub fn matches(&self, summary: &ScenarioSummary) -> bool {
        self.program == summary.program
            && self.check == CheckKind::of(&summary.check)
            && self.expected_exit_code == summary.expected_exit_code
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CheckKind {
    Golden,
    ExitCodeOnly,
    SummaryMatch,
}

impl CheckKind {
    pub fn of(check: &CheckSummary) -> Self {
        match check {
            CheckSummary::Golden { .. } => Self::Golden,
            CheckSummary::ExitCodeOnly => Self::ExitCodeOnly,
            CheckSummary::SummaryMatch { .. } => Self::SummaryMatch,
        }
    }
}
