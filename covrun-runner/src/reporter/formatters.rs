// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Display helpers for test lines and the final summary.

use super::helpers::Styles;
use crate::{
    outcome::{Outcome, TestRecord},
    runner::RunStats,
};
use owo_colors::OwoColorize;
use std::{fmt, io, time::Duration};

/// The width of the separators around failure listings, and of a line of outcome symbols.
pub(super) const LINE_WIDTH: usize = 70;

/// A duration in seconds, with five digits after the decimal point.
pub(super) struct DisplaySecs(pub(super) Duration);

impl fmt::Display for DisplaySecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}s", self.0.as_secs_f64())
    }
}

/// A horizontal rule made of `c`.
pub(super) struct DisplaySeparator(pub(super) char);

impl fmt::Display for DisplaySeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..LINE_WIDTH {
            write!(f, "{}", self.0)?;
        }
        Ok(())
    }
}

/// Writes the line shown for a finished test at verbosity 1 and above.
pub(super) fn write_test_line(
    record: &TestRecord,
    coverage_percent: Option<f64>,
    show_coverage: bool,
    styles: &Styles,
    writer: &mut dyn io::Write,
) -> io::Result<()> {
    let style = styles.for_outcome(record.outcome);
    write!(
        writer,
        "{} [{}]",
        record.identifier,
        record.outcome.label().style(style)
    )?;
    if record.outcome == Outcome::Skipped {
        write!(
            writer,
            " ({})",
            record.detail.as_deref().unwrap_or("No reason")
        )?;
    }
    write!(writer, " ({})", DisplaySecs(record.elapsed))?;
    if let (true, Some(percent)) = (show_coverage, coverage_percent) {
        write!(writer, " [coverage {percent:.2}%]")?;
    }
    writeln!(writer)
}

/// Writes the framed listing for one errored or failed test.
pub(super) fn write_failure_block(
    flavour: &str,
    record: &TestRecord,
    styles: &Styles,
    writer: &mut dyn io::Write,
) -> io::Result<()> {
    writeln!(writer, "{}", DisplaySeparator('='))?;
    writeln!(
        writer,
        "{}: {}",
        flavour.style(styles.for_outcome(record.outcome)),
        record.identifier
    )?;
    if let Some(description) = &record.description {
        writeln!(writer, "{description}")?;
    }
    writeln!(writer, "{}", DisplaySeparator('-'))?;
    if let Some(detail) = &record.detail {
        writeln!(writer, "{detail}")?;
    }
    if !record.output.is_empty() {
        writeln!(writer, "\nCaptured output:")?;
        write!(writer, "{}", record.output)?;
        if !record.output.ends_with('\n') {
            writeln!(writer)?;
        }
    }
    writeln!(writer)
}

/// Writes `OK` or `FAILED`, followed by the non-zero counts of notable outcomes.
pub(super) fn write_final_status(
    stats: &RunStats,
    styles: &Styles,
    writer: &mut dyn io::Write,
) -> io::Result<()> {
    let counts = [
        ("failures", stats.failed),
        ("errors", stats.errored),
        ("skipped", stats.skipped),
        ("expected failures", stats.expected_failures),
        ("unexpected successes", stats.unexpected_successes),
    ];

    if stats.is_success() {
        write!(writer, "{}", "OK".style(styles.pass))?;
    } else {
        write!(writer, "{}", "FAILED".style(styles.fail))?;
    }

    let mut first = true;
    for (name, count) in counts.into_iter().filter(|(_, count)| *count > 0) {
        write!(
            writer,
            "{}{name}={}",
            if first { " (" } else { ", " },
            count.style(styles.count)
        )?;
        first = false;
    }
    if !first {
        write!(writer, ")")?;
    }
    writeln!(writer)
}
