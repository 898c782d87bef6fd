// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{AggregateResult, CancelReason, RunStats, TestEvent};
use crate::{
    coverage::{CoverageBackend, CoverageSession, CoverageSummary, SourceFilter},
    errors::{RerunLogError, RunError},
    outcome::record_execution,
    rerun::RerunLog,
    stopwatch::stopwatch,
    test_case::TestList,
};
use camino::Utf8PathBuf;
use std::convert::Infallible;
use tracing::{debug, warn};

/// The default location of saved coverage data, relative to the working directory.
pub const DEFAULT_COVERAGE_DATA_FILE: &str = ".covrun-coverage.json";

/// Test runner options.
#[derive(Clone, Debug)]
pub struct TestRunnerBuilder {
    verbosity: u8,
    fail_fast: bool,
    coverage_sources: Option<Vec<Utf8PathBuf>>,
    rerun_log: Option<Utf8PathBuf>,
    coverage_data_file: Utf8PathBuf,
}

impl Default for TestRunnerBuilder {
    fn default() -> Self {
        Self {
            verbosity: 1,
            fail_fast: false,
            coverage_sources: None,
            rerun_log: None,
            coverage_data_file: DEFAULT_COVERAGE_DATA_FILE.into(),
        }
    }
}

impl TestRunnerBuilder {
    /// Sets the verbosity the run will be reported at.
    ///
    /// This affects which parts of the overall coverage report can be produced.
    pub fn set_verbosity(&mut self, verbosity: u8) -> &mut Self {
        self.verbosity = verbosity;
        self
    }

    /// Stops the run after the first failed or errored test.
    pub fn set_fail_fast(&mut self, fail_fast: bool) -> &mut Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Measures coverage of files under these paths. Without sources, coverage isn't measured
    /// at all.
    pub fn set_coverage_sources<I>(&mut self, sources: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Utf8PathBuf>,
    {
        self.coverage_sources = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    /// Writes the identifiers of failed and errored tests to this file at the end of the run.
    pub fn set_rerun_log(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.rerun_log = Some(path.into());
        self
    }

    /// Sets where raw coverage data is saved by the overall coverage report.
    pub fn set_coverage_data_file(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.coverage_data_file = path.into();
        self
    }

    /// Creates a new test runner.
    ///
    /// Coverage is only measured if sources were set and `backend` is present.
    pub fn build<'list>(
        &self,
        test_list: &'list TestList,
        backend: Option<Box<dyn CoverageBackend>>,
    ) -> TestRunner<'list> {
        let coverage = match (&self.coverage_sources, backend) {
            (Some(sources), Some(backend)) if !sources.is_empty() => {
                CoverageSession::new(backend, SourceFilter::new(sources))
            }
            _ => CoverageSession::disabled(),
        };

        TestRunner {
            opts: self.clone(),
            test_list,
            coverage,
        }
    }
}

/// Context for running tests.
///
/// Tests are run sequentially, in list order, on the current thread.
#[derive(Debug)]
pub struct TestRunner<'list> {
    opts: TestRunnerBuilder,
    test_list: &'list TestList,
    coverage: CoverageSession,
}

impl TestRunner<'_> {
    /// Executes the listed tests.
    ///
    /// The callback is called with each event as it happens.
    pub fn execute<F>(self, mut callback: F) -> Result<AggregateResult, RerunLogError>
    where
        F: FnMut(TestEvent<'_>),
    {
        self.try_execute::<Infallible, _>(|event| {
            callback(event);
            Ok(())
        })
        .map_err(|error| match error {
            RunError::Callback(never) => match never {},
            RunError::RerunLog(error) => error,
        })
    }

    /// Executes the listed tests.
    ///
    /// Accepts a callback that is called with each event as it happens. If the callback returns
    /// an error, no further tests are run, the rerun manifest is still written, and the error is
    /// returned.
    pub fn try_execute<E, F>(mut self, mut callback: F) -> Result<AggregateResult, RunError<E>>
    where
        F: FnMut(TestEvent<'_>) -> Result<(), E>,
    {
        let test_list = self.test_list;
        let stopwatch = stopwatch();
        let mut run_stats = RunStats {
            initial_run_count: test_list.len(),
            ..RunStats::default()
        };
        let mut rerun_log = RerunLog::new(self.opts.rerun_log.clone());
        let mut records = Vec::with_capacity(test_list.len());

        // Stores the first error returned by the callback. This error is propagated up.
        let mut first_error = callback(TestEvent::RunStarted {
            test_list,
            coverage_enabled: self.coverage.is_enabled(),
        })
        .err();

        let measurable = self.coverage.measurable_lines();
        let run_scope = self.coverage.start_scope();

        if first_error.is_none() {
            for test in test_list.iter() {
                let identifier = test.identifier();
                if let Err(error) = callback(TestEvent::TestStarted {
                    identifier: &identifier,
                }) {
                    first_error = Some(error);
                    break;
                }
                debug!(test = %identifier, "running test");

                let test_scope = self.coverage.start_scope();
                let mut record = record_execution(test, identifier);
                record.coverage = self.coverage.stop_scope(test_scope);

                let coverage_percent = match (&record.coverage, &measurable) {
                    (Some(data), Some(index)) if index.statement_count() > 0 => {
                        Some(CoverageSummary::new(data, index).percent())
                    }
                    _ => None,
                };

                run_stats.on_test_finished(record.outcome);
                if record.outcome.is_failure() {
                    rerun_log.record(&record.identifier);
                }
                debug!(
                    test = %record.identifier,
                    outcome = %record.outcome,
                    elapsed = ?record.elapsed,
                    "test finished"
                );

                let callback_result = callback(TestEvent::TestFinished {
                    record: &record,
                    coverage_percent,
                    run_stats,
                });
                let stop = self.opts.fail_fast && record.outcome.is_failure();
                records.push(record);

                if let Err(error) = callback_result {
                    first_error = Some(error);
                    break;
                }
                if stop {
                    if let Err(error) = callback(TestEvent::RunBeginCancel {
                        reason: CancelReason::FailFast,
                        run_stats,
                    }) {
                        first_error = Some(error);
                    }
                    break;
                }
            }
        }

        let coverage = self.coverage.stop_scope(run_scope);
        let snapshot = stopwatch.snapshot();

        match callback(TestEvent::RunFinished {
            start_time: snapshot.start_time,
            elapsed: snapshot.duration,
            run_stats,
        }) {
            Ok(()) => {}
            Err(error) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }

        // The manifest is written even if the run was cut short.
        let flushed = rerun_log.flush();

        if let Some(error) = first_error {
            // The callback error is returned, so this is the only report of the manifest error.
            if let Err(error) = flushed {
                warn!("failed to write rerun log: {error}");
            }
            return Err(RunError::Callback(error));
        }
        flushed.map_err(RunError::RerunLog)?;

        Ok(AggregateResult {
            records,
            run_stats,
            start_time: snapshot.start_time,
            elapsed: snapshot.duration,
            coverage,
            measurable,
            verbosity: self.opts.verbosity,
            rerun_log,
            coverage_data_file: self.opts.coverage_data_file,
        })
    }
}
