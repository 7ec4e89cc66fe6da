// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comparing normalized output against references.

use similar::{ChangeTag, TextDiff};
use std::fmt;

/// The result of comparing two normalized outputs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Comparison {
    /// The outputs are identical line for line.
    Match,

    /// The outputs differ.
    Mismatch(OutputMismatch),
}

impl Comparison {
    /// Returns true if the outputs matched.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Whether a line appears in the reference, the actual output, or both.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineOrigin {
    /// The line appears in both.
    Both,

    /// The line appears only in the reference.
    Reference,

    /// The line appears only in the actual output.
    Actual,
}

impl LineOrigin {
    fn sign(self) -> char {
        match self {
            Self::Both => ' ',
            Self::Reference => '-',
            Self::Actual => '+',
        }
    }
}

/// One line of a line-level diff.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineChange {
    /// Where the line appears.
    pub origin: LineOrigin,

    /// The line, with its terminator if it had one.
    pub line: String,
}

/// A structured description of how two outputs differ.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputMismatch {
    /// The number of lines in the reference.
    pub reference_len: usize,

    /// The number of lines in the actual output.
    pub actual_len: usize,

    /// The zero-based index of the first line that differs.
    pub first_difference: usize,

    /// Every line of both outputs, in diff order.
    pub changes: Vec<LineChange>,
}

impl OutputMismatch {
    /// Returns an iterator over the lines that appear on only one side.
    pub fn differing_lines(&self) -> impl Iterator<Item = &LineChange> {
        self.changes
            .iter()
            .filter(|change| change.origin != LineOrigin::Both)
    }

    /// Returns a one-line description of the mismatch.
    pub fn headline(&self) -> String {
        format!(
            "output differs from reference at line {} \
             ({} reference lines, {} actual lines)",
            self.first_difference + 1,
            self.reference_len,
            self.actual_len,
        )
    }
}

impl fmt::Display for OutputMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.headline())?;
        writeln!(f, "--- reference")?;
        writeln!(f, "+++ actual")?;
        for change in &self.changes {
            write!(f, "{}{}", change.origin.sign(), change.line)?;
            if !change.line.ends_with('\n') {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Compares normalized `actual` lines against normalized `reference` lines.
///
/// Equality is exact and ordered: any differing line, or a difference in line count, is a
/// mismatch.
pub fn compare<A, R>(actual: &[A], reference: &[R]) -> Comparison
where
    A: AsRef<str>,
    R: AsRef<str>,
{
    let actual: Vec<&str> = actual.iter().map(AsRef::as_ref).collect();
    let reference: Vec<&str> = reference.iter().map(AsRef::as_ref).collect();
    if actual == reference {
        return Comparison::Match;
    }

    let first_difference = actual
        .iter()
        .zip(&reference)
        .position(|(a, r)| a != r)
        .unwrap_or_else(|| actual.len().min(reference.len()));

    let diff = TextDiff::from_slices(&reference, &actual);
    let changes = diff
        .iter_all_changes()
        .map(|change| LineChange {
            origin: match change.tag() {
                ChangeTag::Equal => LineOrigin::Both,
                ChangeTag::Delete => LineOrigin::Reference,
                ChangeTag::Insert => LineOrigin::Actual,
            },
            line: change.value().to_owned(),
        })
        .collect();

    Comparison::Mismatch(OutputMismatch {
        reference_len: reference.len(),
        actual_len: actual.len(),
        first_difference,
        changes,
    })
}

/// Compares the summary lines of the library executable's output against the standalone tool's.
///
/// The standalone tool's output takes the role of the reference.
pub fn compare_summaries<S, L>(standalone: &[S], library: &[L]) -> Comparison
where
    S: AsRef<str>,
    L: AsRef<str>,
{
    compare(library, standalone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_outputs_match() {
        let lines = ["a\n", "b\n"];
        assert_eq!(compare(&lines, &lines), Comparison::Match);
        assert_eq!(compare::<&str, &str>(&[], &[]), Comparison::Match);
    }

    #[test]
    fn changed_line() {
        let reference = ["Total Trace Energy: 1.00 pJ\n", "Average Power: 2.00 mW\n"];
        let actual = ["Total Trace Energy: 1.00 pJ\n", "Average Power: 2.50 mW\n"];

        let Comparison::Mismatch(mismatch) = compare(&actual, &reference) else {
            panic!("expected mismatch");
        };
        assert_eq!(mismatch.first_difference, 1);
        assert_eq!(mismatch.reference_len, 2);
        assert_eq!(mismatch.actual_len, 2);
        assert_eq!(
            mismatch.to_string(),
            indoc! {"
                output differs from reference at line 2 (2 reference lines, 2 actual lines)
                --- reference
                +++ actual
                 Total Trace Energy: 1.00 pJ
                -Average Power: 2.00 mW
                +Average Power: 2.50 mW
            "}
        );
    }

    #[test]
    fn extra_trailing_line() {
        let reference = ["a\n", "b\n"];
        let actual = ["a\n", "b\n", "c"];

        let Comparison::Mismatch(mismatch) = compare(&actual, &reference) else {
            panic!("expected mismatch");
        };
        assert_eq!(mismatch.first_difference, 2);
        assert_eq!(
            mismatch.differing_lines().collect::<Vec<_>>(),
            vec![&LineChange {
                origin: LineOrigin::Actual,
                line: "c".to_owned(),
            }]
        );
        // Lines without a terminator still end up on their own line.
        assert!(mismatch.to_string().ends_with("+c\n"));
    }

    #[test]
    fn missing_lines() {
        let reference = ["a\n", "b\n", "c\n"];
        let actual: [&str; 0] = [];

        let Comparison::Mismatch(mismatch) = compare(&actual, &reference) else {
            panic!("expected mismatch");
        };
        assert_eq!(mismatch.first_difference, 0);
        assert_eq!(mismatch.differing_lines().count(), 3);
        assert!(
            mismatch
                .differing_lines()
                .all(|change| change.origin == LineOrigin::Reference)
        );
    }

    #[test]
    fn reordered_lines_mismatch() {
        let reference = ["a\n", "b\n"];
        let actual = ["b\n", "a\n"];
        assert!(!compare(&actual, &reference).is_match());
    }

    #[test]
    fn summaries_use_standalone_as_reference() {
        let standalone = ["Average Power: 1 mW\n"];
        let library = ["Average Power: 2 mW\n"];

        let Comparison::Mismatch(mismatch) = compare_summaries(&standalone, &library) else {
            panic!("expected mismatch");
        };
        let origins: Vec<_> = mismatch
            .changes
            .iter()
            .map(|change| (change.origin, change.line.as_str()))
            .collect();
        assert_eq!(
            origins,
            vec![
                (LineOrigin::Reference, "Average Power: 1 mW\n"),
                (LineOrigin::Actual, "Average Power: 2 mW\n"),
            ]
        );
    }
}
