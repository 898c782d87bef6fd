// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events produced during a test run.

use crate::{
    outcome::{Outcome, TestRecord},
    test_case::{TestIdentifier, TestList},
};
use chrono::{DateTime, Local};
use std::time::Duration;

/// A test event.
///
/// Events are produced by a [`TestRunner`](crate::runner::TestRunner) and consumed by a
/// [`TestReporter`](crate::reporter::TestReporter), in the order they happen.
#[derive(Clone, Debug)]
pub enum TestEvent<'a> {
    /// The test run started.
    RunStarted {
        /// The list of tests that will be run.
        test_list: &'a TestList,

        /// Whether coverage is being measured for this run.
        coverage_enabled: bool,
    },

    /// A test started running.
    TestStarted {
        /// The test that started.
        identifier: &'a TestIdentifier,
    },

    /// A test finished running.
    TestFinished {
        /// Everything recorded about the test.
        record: &'a TestRecord,

        /// The share of measurable lines executed by this test, if coverage was measured.
        coverage_percent: Option<f64>,

        /// Statistics for the run so far, including this test.
        run_stats: RunStats,
    },

    /// A cancellation notice was received. No further tests will be started.
    RunBeginCancel {
        /// The reason this run was canceled.
        reason: CancelReason,

        /// Statistics for the run so far.
        run_stats: RunStats,
    },

    /// The test run finished.
    RunFinished {
        /// The time at which the run was started.
        start_time: DateTime<Local>,

        /// The amount of time it took for the tests to run.
        elapsed: Duration,

        /// Statistics for the run.
        run_stats: RunStats,
    },
}

/// The reason why a test run is being canceled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum CancelReason {
    /// A test failed and fail-fast was enabled.
    FailFast,
}

/// Statistics for a test run.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The total number of tests that were expected to be run at the beginning.
    ///
    /// If the test run is cut short, this will be more than `final_run_count`.
    pub initial_run_count: usize,

    /// The total number of tests that were actually run.
    pub final_run_count: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed an assertion.
    pub failed: usize,

    /// The number of tests that errored.
    pub errored: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,

    /// The number of tests that were expected to fail, and did.
    pub expected_failures: usize,

    /// The number of tests that were expected to fail, but passed.
    pub unexpected_successes: usize,
}

impl RunStats {
    /// Returns true if this run is considered a success.
    ///
    /// A run can be marked as failed if any of the following are true:
    /// * the run was cut short: the initial run count is greater than the final run count
    /// * any tests failed or errored
    /// * any tests passed while expected to fail
    pub fn is_success(&self) -> bool {
        if self.initial_run_count > self.final_run_count {
            return false;
        }
        self.failed == 0 && self.errored == 0 && self.unexpected_successes == 0
    }

    /// Returns true if the run was cut short before every test could run.
    pub fn is_canceled(&self) -> bool {
        self.initial_run_count > self.final_run_count
    }

    pub(crate) fn on_test_finished(&mut self, outcome: Outcome) {
        self.final_run_count += 1;
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Errored => self.errored += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::ExpectedFailure => self.expected_failures += 1,
            Outcome::UnexpectedSuccess => self.unexpected_successes += 1,
        }
    }
}
