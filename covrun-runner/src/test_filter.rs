// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selecting which tests to run.
//!
//! Selectors are `::`-separated paths. A selector matches a test when the two agree on every
//! component they both have, so `math` selects every test in the `math` module and
//! `math::Adder::adds` selects exactly that test.

use crate::{
    errors::{FilterError, RerunLogError},
    helpers::plural,
    rerun::RerunLog,
    test_case::{TestIdentifier, TestList},
};
use camino::Utf8Path;
use tracing::warn;

/// A filter for tests.
#[derive(Clone, Debug)]
pub struct TestFilter {
    name_match: NameMatch,
}

#[derive(Clone, Debug)]
enum NameMatch {
    MatchAll,
    MatchSet(Vec<Selector>),
}

#[derive(Clone, Debug)]
struct Selector {
    raw: String,
    components: Vec<String>,
}

impl Selector {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_owned(),
            components: raw.split("::").map(str::to_owned).collect(),
        }
    }

    fn matches(&self, identifier: &TestIdentifier) -> bool {
        self.components
            .iter()
            .zip(identifier.components())
            .all(|(selector, component)| selector == component)
    }
}

impl TestFilter {
    /// Creates a new `TestFilter` from the given selectors.
    ///
    /// Blank selectors are ignored. If no selectors remain, the filter matches every test.
    pub fn new<I>(selectors: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let selectors: Vec<_> = selectors
            .into_iter()
            .filter_map(|selector| {
                let selector = selector.as_ref().trim();
                (!selector.is_empty()).then(|| Selector::new(selector))
            })
            .collect();

        let name_match = if selectors.is_empty() {
            NameMatch::MatchAll
        } else {
            NameMatch::MatchSet(selectors)
        };
        Self { name_match }
    }

    /// Creates a new `TestFilter` that matches every test.
    pub fn any() -> Self {
        Self {
            name_match: NameMatch::MatchAll,
        }
    }

    /// Creates a new `TestFilter` selecting the tests listed in a rerun manifest.
    pub fn from_rerun_log(path: &Utf8Path) -> Result<Self, RerunLogError> {
        let identifiers = RerunLog::load(path)?;
        Ok(Self::new(identifiers.iter().map(TestIdentifier::as_str)))
    }

    /// Returns true if this filter matches the given test.
    pub fn is_match(&self, identifier: &TestIdentifier) -> bool {
        match &self.name_match {
            NameMatch::MatchAll => true,
            NameMatch::MatchSet(selectors) => {
                selectors.iter().any(|selector| selector.matches(identifier))
            }
        }
    }

    /// Keeps the tests in `list` matched by this filter, preserving their order.
    ///
    /// Selectors that match no test are reported as warnings. If selectors were given but none
    /// of them matched, this returns an error.
    pub fn filter(&self, list: TestList) -> Result<TestList, FilterError> {
        let selectors = match &self.name_match {
            NameMatch::MatchAll => return Ok(list),
            NameMatch::MatchSet(selectors) => selectors,
        };

        let mut hits = vec![0_usize; selectors.len()];
        let filtered: TestList = list
            .into_inner()
            .into_iter()
            .filter(|test| {
                let identifier = test.identifier();
                let mut matched = false;
                for (selector, hits) in selectors.iter().zip(&mut hits) {
                    if selector.matches(&identifier) {
                        *hits += 1;
                        matched = true;
                    }
                }
                matched
            })
            .collect();

        let unmatched: Vec<_> = selectors
            .iter()
            .zip(&hits)
            .filter(|(_, hits)| **hits == 0)
            .map(|(selector, _)| selector.raw.as_str())
            .collect();

        if filtered.is_empty() {
            return Err(FilterError::NoTestsMatched {
                selectors: selectors.iter().map(|s| s.raw.clone()).collect(),
            });
        }
        if !unmatched.is_empty() {
            warn!(
                "{} {} did not match any tests: {}",
                unmatched.len(),
                plural::selectors_str(unmatched.len()),
                unmatched.join(", "),
            );
        }
        Ok(filtered)
    }
}
