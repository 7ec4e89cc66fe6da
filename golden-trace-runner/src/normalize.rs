// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning captured output into comparison-ready lines.
//!
//! The tool under test prints banner text on lines starting with a comment marker and separates
//! report sections with blank lines. Neither carries signal, so both are dropped before
//! comparison. Lines keep their terminators throughout, with `\r\n` and lone `\r` folded to
//! `\n` first.

use crate::errors::ReferenceReadError;
use camino::Utf8Path;
use std::borrow::Cow;

/// Folds `\r\n` and lone `\r` line endings into `\n`.
pub fn fold_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Splits text into lines, keeping each line's terminator.
///
/// The final line is yielded without a terminator if the text doesn't end with one.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n')
}

/// Returns true if `line` carries signal: it does not start with `marker` and is longer than a
/// single character (counting its terminator).
pub fn is_signal_line(line: &str, marker: &str) -> bool {
    !line.starts_with(marker) && line.chars().nth(1).is_some()
}

/// Keeps only the signal lines from `lines`, in order.
pub fn normalize<I, S>(lines: I, marker: &str) -> Vec<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter(|line| is_signal_line(line.as_ref(), marker))
        .collect()
}

/// Keeps only the lines that start with one of `prefixes`, in order.
pub fn summary_lines<I, S>(lines: I, prefixes: &[String]) -> Vec<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter(|line| {
            prefixes
                .iter()
                .any(|prefix| line.as_ref().starts_with(prefix.as_str()))
        })
        .collect()
}

/// The signal lines of one output.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NormalizedOutput {
    lines: Vec<String>,
}

impl NormalizedOutput {
    /// Normalizes `text`.
    pub fn from_text(text: &str, marker: &str) -> Self {
        let text = fold_line_endings(text);
        Self {
            lines: normalize(split_lines(&text), marker)
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Reads and normalizes a file. Invalid UTF-8 is replaced rather than rejected.
    pub fn from_path(path: &Utf8Path, marker: &str) -> Result<Self, ReferenceReadError> {
        let bytes = std::fs::read(path).map_err(|error| ReferenceReadError::new(path, error))?;
        Ok(Self::from_text(&String::from_utf8_lossy(&bytes), marker))
    }

    /// Returns the lines, each with its terminator.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if there are no signal lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the summary lines of this output.
    pub fn summary(&self, prefixes: &[String]) -> Self {
        Self {
            lines: summary_lines(self.lines.iter().cloned(), prefixes),
        }
    }
}
