// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::CoverageData;
use crate::errors::CoverageError;
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// Restricts coverage to files under a set of source roots.
///
/// An empty filter matches nothing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SourceFilter {
    roots: Vec<Utf8PathBuf>,
}

impl SourceFilter {
    /// Creates a new filter from a list of source roots. Each root may be a file or a directory.
    ///
    /// Absolute roots under the current directory are made relative to it, matching the paths
    /// recorded by the built-in backend.
    pub fn new<I>(roots: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<Utf8Path>,
    {
        let roots = roots
            .into_iter()
            .map(|root| relative_to_cwd(root.as_ref()))
            .collect();
        Self { roots }
    }

    /// Returns the source roots.
    pub fn roots(&self) -> &[Utf8PathBuf] {
        &self.roots
    }

    /// Returns true if no source roots were configured.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Returns true if `file` is one of the roots or lies under one of them.
    pub fn matches(&self, file: &Utf8Path) -> bool {
        let file = normalize(file);
        self.roots.iter().any(|root| file.starts_with(root))
    }

    /// Drops every file from `data` that this filter doesn't match.
    pub fn retain(&self, data: &mut CoverageData) {
        data.retain_files(|file| self.matches(file));
    }
}

/// Finds all Rust source files under `roots`, in a stable order.
///
/// Entries in `ignore` are interpreted relative to each root; matching files and directories are
/// skipped.
pub fn collect_sources(
    roots: &[Utf8PathBuf],
    ignore: &[Utf8PathBuf],
) -> Result<Vec<Utf8PathBuf>, CoverageError> {
    let mut sources = Vec::new();
    for root in roots {
        let ignored: Vec<_> = ignore.iter().map(|path| root.join(path)).collect();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !ignored.iter().any(|path| entry.path().starts_with(path)));

        for entry in walker {
            let entry = entry.map_err(|error| CoverageError::WalkSources {
                root: root.clone(),
                error,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = Utf8PathBuf::try_from(entry.into_path()).map_err(|error| {
                CoverageError::NonUtf8Source {
                    path: error.into_path_buf(),
                }
            })?;
            if path.extension() == Some("rs") {
                sources.push(normalize(&path).to_owned());
            }
        }
    }
    Ok(sources)
}

/// Strips a leading `./` so that paths from different sources compare equal.
pub(crate) fn normalize(path: &Utf8Path) -> &Utf8Path {
    path.strip_prefix(".").unwrap_or(path)
}

/// Expresses an absolute `path` relative to the current directory, if it lies under it.
///
/// Relative paths are already relative to the current directory and are only normalized.
pub(crate) fn relative_to_cwd(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_relative() {
        return normalize(path).to_owned();
    }
    let cwd = std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::try_from(cwd).ok());
    match cwd.as_deref().and_then(|cwd| path.strip_prefix(cwd).ok()) {
        Some(relative) => relative.to_owned(),
        None => path.to_owned(),
    }
}
