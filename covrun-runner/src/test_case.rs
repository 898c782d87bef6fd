// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test contract consumed by the runner.
//!
//! A test is anything implementing [`TestCase`]: it names itself with a [`TestIdentifier`] and
//! runs in three phases (set-up, body and tear-down), each of which reports success or a
//! [`TestSignal`]. Panics in any phase are caught by the runner and classified as well.

use debug_ignore::DebugIgnore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, human-readable name for a test.
///
/// Identifiers are made of `::`-separated components, typically a module path followed by a
/// suite name and the test name. They are the join key between execution, reporting and the
/// rerun manifest.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TestIdentifier(String);

impl TestIdentifier {
    /// Creates a new identifier from a module path, a suite name and a test name.
    ///
    /// Empty parts are left out, so `TestIdentifier::new("math", "", "adds")` is `math::adds`.
    pub fn new(module_path: &str, suite: &str, name: &str) -> Self {
        let joined = [module_path, suite, name]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("::");
        Self(joined)
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the `::`-separated components of this identifier.
    pub fn components(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.split("::")
    }
}

impl fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestIdentifier {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TestIdentifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A non-success signal raised by one phase of a test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestSignal {
    /// An assertion did not hold.
    Failure(String),

    /// Something went wrong other than an assertion, for example a fixture could not be created.
    Error(String),

    /// The test decided not to run, with an optional reason.
    Skip(Option<String>),
}

impl TestSignal {
    /// Creates a failure signal.
    pub fn failure(message: impl Into<String>) -> Self {
        TestSignal::Failure(message.into())
    }

    /// Creates an error signal.
    pub fn error(message: impl Into<String>) -> Self {
        TestSignal::Error(message.into())
    }

    /// Creates a skip signal with a reason.
    pub fn skip(reason: impl Into<String>) -> Self {
        TestSignal::Skip(Some(reason.into()))
    }
}

/// The result of a single test phase.
pub type TestResult = Result<(), TestSignal>;

/// Per-execution state handed to each phase of a test.
///
/// Anything written to the context through [`fmt::Write`] is captured as the test's output.
#[derive(Debug, Default)]
pub struct TestContext {
    output: String,
}

impl TestContext {
    /// Returns the output captured so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub(crate) fn into_output(self) -> String {
        self.output
    }
}

impl fmt::Write for TestContext {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

/// A test that can be executed by the runner.
pub trait TestCase {
    /// Returns the identifier for this test.
    ///
    /// This must return the same identifier every time it is called.
    fn identifier(&self) -> TestIdentifier;

    /// Returns a short, one-line description of this test, if any.
    fn description(&self) -> Option<String> {
        None
    }

    /// Returns true if this test is expected to fail.
    ///
    /// A failing body is then reported as an expected failure, and a passing one as an
    /// unexpected success.
    fn expecting_failure(&self) -> bool {
        false
    }

    /// Prepares fixtures for the body. If this doesn't succeed, neither the body nor
    /// [`tear_down`](Self::tear_down) is run.
    fn set_up(&self, _ctx: &mut TestContext) -> TestResult {
        Ok(())
    }

    /// Runs the body of the test.
    fn run(&self, ctx: &mut TestContext) -> TestResult;

    /// Cleans up after the body. Runs whenever set-up succeeded.
    fn tear_down(&self, _ctx: &mut TestContext) -> TestResult {
        Ok(())
    }
}

type Phase = Box<dyn Fn(&mut TestContext) -> TestResult>;

/// A [`TestCase`] backed by closures.
#[derive(Debug)]
pub struct TestFn {
    identifier: TestIdentifier,
    description: Option<String>,
    expecting_failure: bool,
    set_up: Option<DebugIgnore<Phase>>,
    body: DebugIgnore<Phase>,
    tear_down: Option<DebugIgnore<Phase>>,
}

impl TestFn {
    /// Creates a new test with the given identifier and body.
    pub fn new(
        identifier: impl Into<TestIdentifier>,
        body: impl Fn(&mut TestContext) -> TestResult + 'static,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            description: None,
            expecting_failure: false,
            set_up: None,
            body: DebugIgnore(Box::new(body)),
            tear_down: None,
        }
    }

    /// Sets a one-line description for this test.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks this test as expected to fail.
    pub fn expect_failure(mut self) -> Self {
        self.expecting_failure = true;
        self
    }

    /// Sets the set-up phase for this test.
    pub fn with_set_up(mut self, set_up: impl Fn(&mut TestContext) -> TestResult + 'static) -> Self {
        self.set_up = Some(DebugIgnore(Box::new(set_up)));
        self
    }

    /// Sets the tear-down phase for this test.
    pub fn with_tear_down(
        mut self,
        tear_down: impl Fn(&mut TestContext) -> TestResult + 'static,
    ) -> Self {
        self.tear_down = Some(DebugIgnore(Box::new(tear_down)));
        self
    }
}

impl TestCase for TestFn {
    fn identifier(&self) -> TestIdentifier {
        self.identifier.clone()
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }

    fn expecting_failure(&self) -> bool {
        self.expecting_failure
    }

    fn set_up(&self, ctx: &mut TestContext) -> TestResult {
        match &self.set_up {
            Some(set_up) => (set_up.0)(ctx),
            None => Ok(()),
        }
    }

    fn run(&self, ctx: &mut TestContext) -> TestResult {
        (self.body.0)(ctx)
    }

    fn tear_down(&self, ctx: &mut TestContext) -> TestResult {
        match &self.tear_down {
            Some(tear_down) => (tear_down.0)(ctx),
            None => Ok(()),
        }
    }
}

/// An ordered collection of tests.
///
/// The runner executes tests in exactly this order.
#[derive(Default)]
pub struct TestList {
    tests: Vec<Box<dyn TestCase>>,
}

impl TestList {
    /// Creates a new, empty test list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a test to the end of this list.
    pub fn push(&mut self, test: impl TestCase + 'static) {
        self.tests.push(Box::new(test));
    }

    /// Returns the number of tests in this list.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Returns true if this list has no tests.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Iterates over the tests in order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn TestCase> + '_ {
        self.tests.iter().map(|test| test.as_ref())
    }

    /// Returns the identifiers of all tests, in order.
    pub fn identifiers(&self) -> Vec<TestIdentifier> {
        self.iter().map(|test| test.identifier()).collect()
    }

    pub(crate) fn into_inner(self) -> Vec<Box<dyn TestCase>> {
        self.tests
    }
}

impl FromIterator<Box<dyn TestCase>> for TestList {
    fn from_iter<I: IntoIterator<Item = Box<dyn TestCase>>>(iter: I) -> Self {
        Self {
            tests: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for TestList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.identifiers()).finish()
    }
}
