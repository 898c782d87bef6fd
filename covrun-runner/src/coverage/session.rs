// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{CoverageBackend, CoverageData, SourceFilter, SourceIndex};
use crate::errors::CoverageError;
use debug_ignore::DebugIgnore;
use tracing::warn;

/// Nested coverage scopes on top of a flat [`CoverageBackend`].
///
/// Each open scope has an accumulator. Opening a child pauses the parent: the backend is stopped
/// and its data folded into the parent's accumulator. Closing the child folds the child's data
/// into the parent as well, so a parent always sees a superset of its children.
///
/// If the backend fails at any point, a warning is logged and the session is disabled for the
/// rest of its lifetime.
#[derive(Debug)]
pub struct CoverageSession {
    backend: Option<DebugIgnore<Box<dyn CoverageBackend>>>,
    filter: SourceFilter,
    stack: Vec<CoverageData>,
}

/// A handle to an open scope, returned by [`CoverageSession::start_scope`].
#[derive(Debug)]
#[must_use = "scopes must be closed with CoverageSession::stop_scope"]
pub struct CoverageScope {
    depth: usize,
}

impl CoverageSession {
    /// Creates a new session measuring files selected by `filter`.
    pub fn new(backend: Box<dyn CoverageBackend>, filter: SourceFilter) -> Self {
        Self {
            backend: Some(DebugIgnore(backend)),
            filter,
            stack: Vec::new(),
        }
    }

    /// Creates a session that never measures anything.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            filter: SourceFilter::default(),
            stack: Vec::new(),
        }
    }

    /// Returns true if coverage is being measured.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Returns the measurable lines of the sources, or `None` if they can't be determined.
    pub fn measurable_lines(&mut self) -> Option<SourceIndex> {
        let backend = self.backend.as_mut()?;
        match backend.measurable_lines(&self.filter) {
            Ok(index) => Some(index),
            Err(error) => {
                warn!("unable to determine measurable lines, not showing per-test coverage: {error}");
                None
            }
        }
    }

    /// Opens a new scope, nested inside the innermost open scope if there is one.
    pub fn start_scope(&mut self) -> CoverageScope {
        let depth = self.stack.len();
        if self.backend.is_some() {
            let result = self.pause_innermost().and_then(|()| self.start_backend());
            match result {
                Ok(()) => self.stack.push(CoverageData::new()),
                Err(error) => self.disable(error),
            }
        }
        CoverageScope { depth }
    }

    /// Closes a scope and returns the lines executed within it, or `None` if coverage isn't being
    /// measured.
    ///
    /// Scopes must be closed innermost first.
    pub fn stop_scope(&mut self, scope: CoverageScope) -> Option<CoverageData> {
        self.backend.as_ref()?;
        if self.stack.len() != scope.depth + 1 {
            self.disable(CoverageError::Unavailable {
                reason: format!(
                    "coverage scope at depth {} closed while {} scopes were open",
                    scope.depth,
                    self.stack.len(),
                ),
            });
            return None;
        }

        let collected = match self.stop_backend() {
            Ok(data) => data,
            Err(error) => {
                self.disable(error);
                return None;
            }
        };
        let mut data = self.stack.pop()?;
        data.merge(&collected);

        if let Some(parent) = self.stack.last_mut() {
            parent.merge(&data);
            if let Err(error) = self.start_backend() {
                self.disable(error);
            }
        }
        Some(data)
    }

    fn pause_innermost(&mut self) -> Result<(), CoverageError> {
        if self.stack.is_empty() {
            return Ok(());
        }
        let data = self.stop_backend()?;
        if let Some(parent) = self.stack.last_mut() {
            parent.merge(&data);
        }
        Ok(())
    }

    fn start_backend(&mut self) -> Result<(), CoverageError> {
        match &mut self.backend {
            Some(backend) => backend.start(),
            None => Ok(()),
        }
    }

    fn stop_backend(&mut self) -> Result<CoverageData, CoverageError> {
        match &mut self.backend {
            Some(backend) => {
                let mut data = backend.stop()?;
                self.filter.retain(&mut data);
                Ok(data)
            }
            None => Ok(CoverageData::new()),
        }
    }

    fn disable(&mut self, error: CoverageError) {
        warn!("coverage measurement failed, disabling it for the rest of the run: {error}");
        if let Some(mut backend) = self.backend.take() {
            if !self.stack.is_empty() {
                // Best effort: the backend may or may not still be recording.
                _ = backend.stop();
            }
        }
        self.stack.clear();
    }
}
