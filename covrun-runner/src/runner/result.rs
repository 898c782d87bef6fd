// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::RunStats;
use crate::{
    coverage::{
        CoverageData, CoverageReportOptions, CoverageReportOutcome, CoverageReporter, SourceIndex,
    },
    errors::CoverageReportError,
    outcome::{Outcome, TestRecord},
    rerun::RerunLog,
    test_case::TestIdentifier,
};
use camino::Utf8PathBuf;
use chrono::{DateTime, Local};
use std::{io::Write, time::Duration};

/// The result of a completed (or cut short) test run.
///
/// Records are in execution order. The run's coverage, if measured, contains every line executed
/// while the run was in progress, which is a superset of the per-test coverage.
#[derive(Clone, Debug)]
pub struct AggregateResult {
    pub(super) records: Vec<TestRecord>,
    pub(super) run_stats: RunStats,
    pub(super) start_time: DateTime<Local>,
    pub(super) elapsed: Duration,
    pub(super) coverage: Option<CoverageData>,
    pub(super) measurable: Option<SourceIndex>,
    pub(super) verbosity: u8,
    pub(super) rerun_log: RerunLog,
    pub(super) coverage_data_file: Utf8PathBuf,
}

impl AggregateResult {
    /// Returns the records of all tests that ran, in execution order.
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// Iterates over the identifier and outcome of each test that ran, in execution order.
    pub fn outcomes(&self) -> impl Iterator<Item = (&TestIdentifier, Outcome)> + '_ {
        self.records
            .iter()
            .map(|record| (&record.identifier, record.outcome))
    }

    /// Returns statistics for the run.
    pub fn run_stats(&self) -> RunStats {
        self.run_stats
    }

    /// Returns the time at which the run started.
    pub fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    /// Returns the wall-clock duration of the run.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns true if the run was successful.
    pub fn is_success(&self) -> bool {
        self.run_stats.is_success()
    }

    /// Returns true if fail-fast stopped the run before every test ran.
    pub fn is_canceled(&self) -> bool {
        self.run_stats.is_canceled()
    }

    /// Returns the lines executed during the whole run, if coverage was measured.
    pub fn coverage(&self) -> Option<&CoverageData> {
        self.coverage.as_ref()
    }

    /// Returns the measurable lines of the coverage sources, if they could be determined.
    pub fn measurable_lines(&self) -> Option<&SourceIndex> {
        self.measurable.as_ref()
    }

    /// Returns the failed and errored tests of this run.
    pub fn rerun_log(&self) -> &RerunLog {
        &self.rerun_log
    }

    /// Produces the overall coverage report.
    ///
    /// If coverage wasn't measured, this does nothing and reports
    /// [`SummaryStatus::NotMeasured`](crate::coverage::SummaryStatus::NotMeasured).
    pub fn coverage_report(
        &self,
        options: &CoverageReportOptions,
        writer: &mut dyn Write,
    ) -> Result<CoverageReportOutcome, CoverageReportError> {
        let Some(data) = &self.coverage else {
            return Ok(CoverageReportOutcome::not_measured());
        };

        CoverageReporter {
            data,
            index: self.measurable.as_ref(),
            verbosity: self.verbosity,
            data_file: &self.coverage_data_file,
        }
        .write(options, writer)
    }
}
