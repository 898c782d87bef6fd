// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for covrun, a sequential test runner that measures code coverage per test.
//!
//! The basic flow is:
//!
//! 1. Assemble an ordered [`TestList`](test_case::TestList), optionally narrowed down with a
//!    [`TestFilter`](test_filter::TestFilter).
//! 2. Build a [`TestRunner`](runner::TestRunner) and a [`TestReporter`](reporter::TestReporter),
//!    either programmatically or from a [`RunnerConfig`](config::RunnerConfig).
//! 3. Execute the list. Each finished test is streamed to the reporter as it completes, and the
//!    run produces an [`AggregateResult`](runner::AggregateResult) holding every outcome and the
//!    overall coverage data.

pub mod config;
pub mod coverage;
pub mod errors;
mod helpers;
pub mod outcome;
pub mod output;
pub mod reporter;
pub mod rerun;
pub mod runner;
mod stopwatch;
pub mod test_case;
pub mod test_filter;
