// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rerun manifest: identifiers of the tests that failed or errored in a run.
//!
//! The manifest is a plain text file with one identifier per line, in the order the tests
//! finished. It is rewritten from scratch at the end of every run, so it only ever describes the
//! latest run.

use crate::{errors::RerunLogError, helpers::flatten_atomic_error, test_case::TestIdentifier};
use atomicwrites::{AllowOverwrite, AtomicFile};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use std::{fs, io::Write};
use tracing::{debug, info};

/// Failed and errored tests collected during a run.
#[derive(Clone, Debug, Default)]
pub struct RerunLog {
    path: Option<Utf8PathBuf>,
    identifiers: IndexSet<TestIdentifier>,
}

impl RerunLog {
    /// Creates a new log. If `path` is `None`, identifiers are only kept in memory.
    pub fn new(path: Option<Utf8PathBuf>) -> Self {
        Self {
            path,
            identifiers: IndexSet::new(),
        }
    }

    /// Reads a manifest written by a previous run. Blank lines are ignored.
    pub fn load(path: &Utf8Path) -> Result<Vec<TestIdentifier>, RerunLogError> {
        let contents = fs::read_to_string(path).map_err(|error| RerunLogError::Read {
            path: path.to_owned(),
            error,
        })?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(TestIdentifier::from)
            .collect())
    }

    /// Returns the destination of this log, if any.
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Records a failed or errored test. Recording the same identifier twice has no effect.
    pub fn record(&mut self, identifier: &TestIdentifier) {
        self.identifiers.insert(identifier.clone());
    }

    /// Iterates over the recorded identifiers, in the order they were first recorded.
    pub fn identifiers(&self) -> impl ExactSizeIterator<Item = &TestIdentifier> + '_ {
        self.identifiers.iter()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Writes the recorded identifiers to the destination, replacing any previous contents.
    ///
    /// This does nothing if there's no destination.
    pub fn flush(&self) -> Result<(), RerunLogError> {
        let Some(path) = &self.path else {
            debug!("no rerun log configured, not writing failed tests");
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| RerunLogError::CreateDir {
                path: parent.to_owned(),
                error,
            })?;
        }

        AtomicFile::new(path, AllowOverwrite)
            .write(|file| {
                for identifier in &self.identifiers {
                    writeln!(file, "{identifier}")?;
                }
                Ok(())
            })
            .map_err(|error| RerunLogError::Write {
                path: path.clone(),
                error: flatten_atomic_error(error),
            })?;

        info!(
            %path,
            count = self.identifiers.len(),
            "wrote rerun log"
        );
        Ok(())
    }
}
