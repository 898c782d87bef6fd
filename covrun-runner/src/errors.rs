// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by covrun.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{io, path::PathBuf};
use thiserror::Error;

/// An error that occurred while reading the runner configuration.
#[derive(Debug, Error)]
#[error("failed to read covrun config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigReadError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigReadError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file that was being read.
    ///
    /// This is the default location if no explicit file was passed in.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An error produced by a coverage backend or while locating coverage sources.
///
/// The runner never aborts on these errors: coverage measurement is disabled for the rest of the
/// run instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoverageError {
    /// Recording was started while it was already active.
    #[error("coverage recording is already active on this thread")]
    AlreadyRecording,

    /// Recording was stopped while it wasn't active.
    #[error("coverage recording is not active on this thread")]
    NotRecording,

    /// The backend is unable to measure coverage at all.
    #[error("coverage measurement is unavailable: {reason}")]
    Unavailable {
        /// A description of why coverage is unavailable.
        reason: String,
    },

    /// A source file could not be read.
    #[error("failed to read source file `{path}`")]
    ReadSource {
        /// The file that was being read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A source directory could not be traversed.
    #[error("failed to walk source directory `{root}`")]
    WalkSources {
        /// The directory that was being traversed.
        root: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: walkdir::Error,
    },

    /// A source path was not valid UTF-8.
    #[error("source path `{}` is not valid UTF-8", .path.display())]
    NonUtf8Source {
        /// The path that was found.
        path: PathBuf,
    },
}

/// An error that occurred while producing the overall coverage report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoverageReportError {
    /// The textual report could not be written to the output stream.
    #[error("error writing coverage report to output")]
    Write(#[source] io::Error),

    /// Raw coverage data could not be persisted.
    #[error("error writing coverage data to `{path}`")]
    SaveData {
        /// The data file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The HTML report could not be written.
    #[error("error writing HTML coverage report to `{dir}`")]
    Html {
        /// The output directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while reading or writing a rerun manifest.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RerunLogError {
    /// The directory containing the manifest could not be created.
    #[error("failed to create directory `{path}` for rerun log")]
    CreateDir {
        /// The directory path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The manifest could not be written.
    #[error("failed to write rerun log to `{path}`")]
    Write {
        /// The manifest path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The manifest could not be read.
    #[error("failed to read rerun log at `{path}`")]
    Read {
        /// The manifest path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurs while writing a test event or the final summary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing to the report stream.
    #[error("error writing to output")]
    Io(#[from] io::Error),
}

/// An error that occurs while filtering a test list.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum FilterError {
    /// None of the selectors matched any test.
    #[error("no tests matched the selectors: {}", .selectors.join(", "))]
    NoTestsMatched {
        /// The selectors that were supplied.
        selectors: Vec<String>,
    },
}

/// An error that stopped a test run from completing normally.
///
/// Output that was already streamed to the reporter before the error stays valid.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError<E> {
    /// The event callback returned an error. The run was stopped at that point.
    #[error("error reporting test event")]
    Callback(#[source] E),

    /// The rerun manifest could not be written at the end of the run.
    #[error("error writing rerun manifest")]
    RerunLog(#[source] RerunLogError),
}
