// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting of test results.
//!
//! The main structure in this module is [`TestReporter`], which renders [`TestEvent`]s at one of
//! three verbosity tiers and writes the final summary of a run.
//!
//! [`TestEvent`]: crate::runner::TestEvent

mod formatters;
mod helpers;
mod imp;

pub use imp::*;
