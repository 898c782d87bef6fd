// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executing a single test and classifying its result.

use crate::{
    coverage::CoverageData,
    stopwatch::stopwatch,
    test_case::{TestCase, TestContext, TestIdentifier, TestResult, TestSignal},
};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::{
    any::Any,
    cell::Cell,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Once,
    time::Duration,
};

/// The classified terminal result of one test execution.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The test passed.
    Passed,

    /// An assertion in the test did not hold.
    Failed,

    /// The test could not run to completion for a reason other than an assertion.
    Errored,

    /// The test was skipped.
    Skipped,

    /// The test was expected to fail, and it did.
    ExpectedFailure,

    /// The test was expected to fail, but it passed.
    UnexpectedSuccess,
}

impl Outcome {
    /// Returns true if this outcome should be re-run: the test failed or errored.
    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Errored)
    }

    /// The single character used for this outcome in the most compact report.
    pub fn symbol(self) -> char {
        match self {
            Outcome::Passed => '.',
            Outcome::Failed => 'F',
            Outcome::Errored => 'E',
            Outcome::Skipped => 's',
            Outcome::ExpectedFailure => 'x',
            Outcome::UnexpectedSuccess => 'u',
        }
    }

    /// The label used for this outcome in line-oriented reports.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Passed => "OK",
            Outcome::Failed => "FAILED",
            Outcome::Errored => "ERROR",
            Outcome::Skipped => "skipped",
            Outcome::ExpectedFailure => "expected failure",
            Outcome::UnexpectedSuccess => "unexpected success",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Everything recorded about one test execution.
///
/// Records are created once a test finishes and are never modified afterwards.
#[derive(Clone, Debug)]
pub struct TestRecord {
    /// The identifier of the test.
    pub identifier: TestIdentifier,

    /// The test's one-line description, if any.
    pub description: Option<String>,

    /// The classified outcome.
    pub outcome: Outcome,

    /// The time at which the test started.
    pub start_time: DateTime<Local>,

    /// How long the test took, including set-up and tear-down.
    pub elapsed: Duration,

    /// Output captured through the test's [`TestContext`].
    pub output: String,

    /// The failure or error message, or the skip reason.
    pub detail: Option<String>,

    /// Lines executed while this test ran, if coverage was measured.
    pub coverage: Option<CoverageData>,
}

/// The immediate result of one phase, before classification.
#[derive(Debug)]
enum PhaseResult {
    Ok,
    Signal(TestSignal),
    Panicked(String),
}

impl PhaseResult {
    fn run(phase: impl FnOnce() -> TestResult) -> Self {
        install_panic_hook();
        let previous = SILENCE_PANICS.replace(true);
        let result = panic::catch_unwind(AssertUnwindSafe(phase));
        SILENCE_PANICS.set(previous);

        match result {
            Ok(Ok(())) => PhaseResult::Ok,
            Ok(Err(signal)) => PhaseResult::Signal(signal),
            Err(payload) => PhaseResult::Panicked(panic_message(payload.as_ref())),
        }
    }
}

thread_local! {
    // Set while a test phase runs on this thread. Its panics are reported as the test's detail.
    static SILENCE_PANICS: Cell<bool> = const { Cell::new(false) };
}

static INSTALL_PANIC_HOOK: Once = Once::new();

/// Wraps the process panic hook so that panics inside test phases aren't printed.
///
/// Panics on other threads, or outside of a phase, still reach the previous hook.
fn install_panic_hook() {
    INSTALL_PANIC_HOOK.call_once(|| {
        let panic_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !SILENCE_PANICS.get() {
                panic_hook(info);
            }
        }));
    });
}

/// Runs a test through all of its phases and records exactly one outcome for it.
///
/// This never panics, regardless of what the test does.
pub(crate) fn record_execution(test: &dyn TestCase, identifier: TestIdentifier) -> TestRecord {
    let stopwatch = stopwatch();
    let mut ctx = TestContext::default();
    let expecting_failure = test.expecting_failure();

    let set_up = PhaseResult::run(|| test.set_up(&mut ctx));
    let (outcome, detail) = match set_up {
        PhaseResult::Ok => {
            let body = PhaseResult::run(|| test.run(&mut ctx));
            let tear_down = PhaseResult::run(|| test.tear_down(&mut ctx));
            classify(body, tear_down, expecting_failure)
        }
        PhaseResult::Signal(TestSignal::Skip(reason)) => (Outcome::Skipped, reason),
        PhaseResult::Signal(TestSignal::Failure(message) | TestSignal::Error(message)) => {
            (Outcome::Errored, Some(format!("set-up failed: {message}")))
        }
        PhaseResult::Panicked(message) => {
            (Outcome::Errored, Some(format!("set-up panicked: {message}")))
        }
    };

    let snapshot = stopwatch.snapshot();
    TestRecord {
        identifier,
        description: test.description(),
        outcome,
        start_time: snapshot.start_time,
        elapsed: snapshot.duration,
        output: ctx.into_output(),
        detail,
        coverage: None,
    }
}

fn classify(
    body: PhaseResult,
    tear_down: PhaseResult,
    expecting_failure: bool,
) -> (Outcome, Option<String>) {
    let (outcome, detail) = match body {
        PhaseResult::Ok if expecting_failure => (Outcome::UnexpectedSuccess, None),
        PhaseResult::Ok => (Outcome::Passed, None),
        PhaseResult::Signal(TestSignal::Skip(reason)) => (Outcome::Skipped, reason),
        PhaseResult::Signal(TestSignal::Failure(message)) | PhaseResult::Panicked(message)
            if expecting_failure =>
        {
            (Outcome::ExpectedFailure, Some(message))
        }
        PhaseResult::Signal(TestSignal::Error(message)) if expecting_failure => {
            (Outcome::ExpectedFailure, Some(message))
        }
        PhaseResult::Signal(TestSignal::Failure(message)) | PhaseResult::Panicked(message) => {
            (Outcome::Failed, Some(message))
        }
        PhaseResult::Signal(TestSignal::Error(message)) => (Outcome::Errored, Some(message)),
    };

    let tear_down_message = match tear_down {
        PhaseResult::Ok | PhaseResult::Signal(TestSignal::Skip(_)) => return (outcome, detail),
        PhaseResult::Signal(TestSignal::Failure(message) | TestSignal::Error(message)) => {
            format!("tear-down failed: {message}")
        }
        PhaseResult::Panicked(message) => format!("tear-down panicked: {message}"),
    };

    if outcome.is_failure() {
        // The body's failure stays the outcome, but the tear-down problem isn't lost.
        let detail = match detail {
            Some(detail) => format!("{detail}\n{tear_down_message}"),
            None => tear_down_message,
        };
        (outcome, Some(detail))
    } else {
        (Outcome::Errored, Some(tear_down_message))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test panicked with a non-string payload".to_owned()
    }
}
