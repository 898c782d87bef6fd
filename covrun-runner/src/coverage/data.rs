// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::sources::normalize;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A set of executed source lines, keyed by file.
///
/// This is scoped either to a single test or to the whole run.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CoverageData {
    lines: BTreeMap<Utf8PathBuf, BTreeSet<u32>>,
}

impl CoverageData {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single executed line.
    pub fn add_line(&mut self, file: &Utf8Path, line: u32) {
        let file = normalize(file);
        // Avoid allocating a new key for every hit on a known file.
        if let Some(lines) = self.lines.get_mut(file) {
            lines.insert(line);
        } else {
            self.lines.insert(file.to_owned(), BTreeSet::from([line]));
        }
    }

    /// Records several executed lines in one file.
    pub fn add_lines(&mut self, file: &Utf8Path, lines: impl IntoIterator<Item = u32>) {
        self.lines
            .entry(normalize(file).to_owned())
            .or_default()
            .extend(lines);
    }

    /// Folds every line in `other` into this set.
    pub fn merge(&mut self, other: &CoverageData) {
        for (file, lines) in &other.lines {
            self.lines
                .entry(file.clone())
                .or_default()
                .extend(lines.iter().copied());
        }
    }

    /// Returns true if every line in this set is also in `other`.
    pub fn is_subset(&self, other: &CoverageData) -> bool {
        self.lines.iter().all(|(file, lines)| {
            other
                .lines
                .get(file)
                .is_some_and(|other_lines| lines.is_subset(other_lines))
        })
    }

    /// Returns true if no lines were recorded.
    pub fn is_empty(&self) -> bool {
        self.lines.values().all(|lines| lines.is_empty())
    }

    /// Returns the total number of recorded lines across all files.
    pub fn line_count(&self) -> usize {
        self.lines.values().map(|lines| lines.len()).sum()
    }

    /// Returns the lines recorded for a file.
    pub fn lines(&self, file: &Utf8Path) -> Option<&BTreeSet<u32>> {
        self.lines.get(normalize(file))
    }

    /// Iterates over files and their recorded lines, in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &BTreeSet<u32>)> + '_ {
        self.lines.iter().map(|(file, lines)| (file.as_path(), lines))
    }

    /// Keeps only files for which `f` returns true.
    pub fn retain_files(&mut self, mut f: impl FnMut(&Utf8Path) -> bool) {
        self.lines.retain(|file, _| f(file));
    }
}

/// The measurable lines of each source file.
///
/// Percentages are computed against this index: a line that isn't in it can't count as either
/// covered or missed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SourceIndex {
    statements: BTreeMap<Utf8PathBuf, BTreeSet<u32>>,
}

impl SourceIndex {
    /// Creates a new, empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds measurable lines for a file.
    pub fn insert(&mut self, file: &Utf8Path, lines: impl IntoIterator<Item = u32>) {
        self.statements
            .entry(normalize(file).to_owned())
            .or_default()
            .extend(lines);
    }

    /// Returns the total number of measurable lines.
    pub fn statement_count(&self) -> usize {
        self.statements.values().map(|lines| lines.len()).sum()
    }

    /// Iterates over files and their measurable lines, in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &BTreeSet<u32>)> + '_ {
        self.statements
            .iter()
            .map(|(file, lines)| (file.as_path(), lines))
    }
}

/// Coverage figures for one file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileSummary {
    /// The source file.
    pub path: Utf8PathBuf,

    /// The number of measurable lines.
    pub statements: usize,

    /// The number of measurable lines that weren't executed.
    pub missed: usize,
}

impl FileSummary {
    /// Returns the percentage of measurable lines that were executed.
    ///
    /// A file with no measurable lines is fully covered.
    pub fn percent(&self) -> f64 {
        percent(self.statements, self.missed)
    }
}

/// Coverage figures for a set of files, computed from a [`CoverageData`] against a
/// [`SourceIndex`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoverageSummary {
    /// Per-file figures, in path order.
    pub files: Vec<FileSummary>,
}

impl CoverageSummary {
    /// Computes figures for every file in `index`.
    pub fn new(data: &CoverageData, index: &SourceIndex) -> Self {
        let files = index
            .iter()
            .map(|(path, statements)| {
                let executed = data
                    .lines(path)
                    .map_or(0, |lines| lines.intersection(statements).count());
                FileSummary {
                    path: path.to_owned(),
                    statements: statements.len(),
                    missed: statements.len() - executed,
                }
            })
            .collect();
        Self { files }
    }

    /// Returns the total number of measurable lines.
    pub fn statements(&self) -> usize {
        self.files.iter().map(|file| file.statements).sum()
    }

    /// Returns the total number of measurable lines that weren't executed.
    pub fn missed(&self) -> usize {
        self.files.iter().map(|file| file.missed).sum()
    }

    /// Returns the overall percentage of measurable lines that were executed.
    pub fn percent(&self) -> f64 {
        percent(self.statements(), self.missed())
    }
}

fn percent(statements: usize, missed: usize) -> f64 {
    if statements == 0 {
        100.0
    } else {
        (statements - missed) as f64 * 100.0 / statements as f64
    }
}
