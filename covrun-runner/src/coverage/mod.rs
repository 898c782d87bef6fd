// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coverage measurement.
//!
//! Measurement itself is done by a [`CoverageBackend`]. Backends are flat: they record lines
//! between a `start` and a `stop`. [`CoverageSession`] layers nested scopes on top of that, so that
//! a scope per test can be opened inside a scope spanning the whole run.
//!
//! With the `probe-coverage` feature (enabled by default), [`default_backend`] returns a backend
//! driven by the [`probe!`](crate::probe) macro. Without it, there is no built-in backend and
//! coverage measurement is silently disabled.

mod data;
#[cfg(feature = "probe-coverage")]
pub mod probe;
mod report;
mod session;
mod sources;

pub use data::*;
pub use report::*;
pub use session::*;
pub use sources::*;

use crate::errors::CoverageError;

/// A capability to record which source lines execute.
pub trait CoverageBackend {
    /// Begins recording executed lines.
    fn start(&mut self) -> Result<(), CoverageError>;

    /// Stops recording and returns the lines executed since the matching [`start`](Self::start).
    fn stop(&mut self) -> Result<CoverageData, CoverageError>;

    /// Returns the lines that can be measured within the sources selected by `filter`.
    fn measurable_lines(&mut self, filter: &SourceFilter) -> Result<SourceIndex, CoverageError>;
}

/// Returns the built-in coverage backend, if one was compiled in.
pub fn default_backend() -> Option<Box<dyn CoverageBackend>> {
    #[cfg(feature = "probe-coverage")]
    {
        Some(Box::new(probe::ProbeCollector::new()))
    }
    #[cfg(not(feature = "probe-coverage"))]
    {
        None
    }
}

/// Records that the line this macro is invoked on was executed.
///
/// Lines are only recorded while a coverage scope is open on the current thread. Without the
/// `probe-coverage` feature, this expands to nothing.
#[cfg(feature = "probe-coverage")]
#[macro_export]
macro_rules! probe {
    () => {
        $crate::coverage::probe::hit_site(env!("CARGO_MANIFEST_DIR"), file!(), line!())
    };
}

/// Records that the line this macro is invoked on was executed.
///
/// The `probe-coverage` feature is disabled, so this expands to nothing.
#[cfg(not(feature = "probe-coverage"))]
#[macro_export]
macro_rules! probe {
    () => {
        ()
    };
}
