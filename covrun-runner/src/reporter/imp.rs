// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out test execution statuses and the final summary.
//!
//! The main structure in this module is [`TestReporter`].

use super::{
    formatters::{
        DisplaySecs, DisplaySeparator, LINE_WIDTH, write_failure_block, write_final_status,
        write_test_line,
    },
    helpers::Styles,
};
use crate::{
    coverage::{CoverageReportOptions, CoverageReportOutcome},
    errors::{CoverageReportError, WriteEventError},
    helpers::plural,
    outcome::{Outcome, TestRecord},
    runner::{AggregateResult, TestEvent},
};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Where the reporter writes its output.
///
/// This is usually standard output, but can be an in-memory buffer for tests.
pub enum ReporterOutput<'a> {
    /// Write to standard output, flushing after every event.
    Stdout,

    /// Write output to a buffer.
    Buffer(&'a mut Vec<u8>),
}

/// Test reporter builder.
#[derive(Debug)]
pub struct TestReporterBuilder {
    verbosity: u8,
    should_colorize: bool,
    slowest_tests: usize,
}

impl Default for TestReporterBuilder {
    fn default() -> Self {
        Self {
            verbosity: 1,
            should_colorize: false,
            slowest_tests: 5,
        }
    }
}

impl TestReporterBuilder {
    /// Sets how much is written per test.
    ///
    /// * 0: one symbol per test.
    /// * 1: one line per test, with its outcome and duration.
    /// * 2 and above: per-test coverage is added to each line.
    pub fn set_verbosity(&mut self, verbosity: u8) -> &mut Self {
        self.verbosity = verbosity;
        self
    }

    /// Set to true if the reporter should colorize output.
    pub fn set_colorize(&mut self, should_colorize: bool) -> &mut Self {
        self.should_colorize = should_colorize;
        self
    }

    /// Sets the number of slowest tests listed in the summary. 0 disables the list.
    pub fn set_slowest_tests(&mut self, slowest_tests: usize) -> &mut Self {
        self.slowest_tests = slowest_tests;
        self
    }

    /// Creates a new test reporter.
    pub fn build<'a>(&self, output: ReporterOutput<'a>) -> TestReporter<'a> {
        let mut styles = Styles::default();
        if self.should_colorize {
            styles.colorize();
        }

        TestReporter {
            inner: ReporterImpl {
                styles,
                verbosity: self.verbosity,
                slowest_tests: self.slowest_tests,
                column: 0,
            },
            output,
        }
    }
}

/// Streams test results as they arrive, and writes the final summary.
pub struct TestReporter<'a> {
    inner: ReporterImpl,
    output: ReporterOutput<'a>,
}

impl TestReporter<'_> {
    /// Report a test event.
    ///
    /// Only finished tests produce output.
    pub fn report_event(&mut self, event: TestEvent<'_>) -> Result<(), WriteEventError> {
        self.with_writer(|inner, writer| inner.write_event(event, writer))?;
        Ok(())
    }

    /// Writes the summary of a finished run: failure listings, the slowest tests, and the
    /// final status.
    pub fn write_summary(&mut self, result: &AggregateResult) -> Result<(), WriteEventError> {
        self.with_writer(|inner, writer| inner.write_summary(result, writer))?;
        Ok(())
    }

    /// Writes the overall coverage report for a finished run.
    pub fn write_coverage_report(
        &mut self,
        result: &AggregateResult,
        options: &CoverageReportOptions,
    ) -> Result<CoverageReportOutcome, CoverageReportError> {
        match &mut self.output {
            ReporterOutput::Stdout => {
                let mut stdout = io::stdout().lock();
                let outcome = result.coverage_report(options, &mut stdout)?;
                stdout.flush().map_err(CoverageReportError::Write)?;
                Ok(outcome)
            }
            ReporterOutput::Buffer(buf) => result.coverage_report(options, &mut **buf),
        }
    }

    fn with_writer<T>(
        &mut self,
        f: impl FnOnce(&mut ReporterImpl, &mut dyn Write) -> io::Result<T>,
    ) -> io::Result<T> {
        match &mut self.output {
            ReporterOutput::Stdout => {
                let mut stdout = io::stdout().lock();
                let value = f(&mut self.inner, &mut stdout)?;
                stdout.flush()?;
                Ok(value)
            }
            ReporterOutput::Buffer(buf) => f(&mut self.inner, &mut **buf),
        }
    }
}

struct ReporterImpl {
    styles: Styles,
    verbosity: u8,
    slowest_tests: usize,
    // Symbols written on the current line, at verbosity 0.
    column: usize,
}

impl ReporterImpl {
    fn write_event(&mut self, event: TestEvent<'_>, writer: &mut dyn Write) -> io::Result<()> {
        match event {
            TestEvent::TestFinished {
                record,
                coverage_percent,
                ..
            } => {
                if self.verbosity == 0 {
                    self.write_symbol(record.outcome, writer)
                } else {
                    write_test_line(
                        record,
                        coverage_percent,
                        self.verbosity >= 2,
                        &self.styles,
                        writer,
                    )
                }
            }
            TestEvent::RunStarted { .. }
            | TestEvent::TestStarted { .. }
            | TestEvent::RunBeginCancel { .. }
            | TestEvent::RunFinished { .. } => Ok(()),
        }
    }

    fn write_symbol(&mut self, outcome: Outcome, writer: &mut dyn Write) -> io::Result<()> {
        if self.column == LINE_WIDTH {
            writeln!(writer)?;
            self.column = 0;
        }
        write!(
            writer,
            "{}",
            outcome.symbol().style(self.styles.for_outcome(outcome))
        )?;
        self.column += 1;
        Ok(())
    }

    fn write_summary(&mut self, result: &AggregateResult, writer: &mut dyn Write) -> io::Result<()> {
        // Ends the line of symbols, if any.
        writeln!(writer)?;
        self.column = 0;

        for (flavour, outcome) in [("ERROR", Outcome::Errored), ("FAIL", Outcome::Failed)] {
            for record in result.records().iter().filter(|r| r.outcome == outcome) {
                write_failure_block(flavour, record, &self.styles, writer)?;
            }
        }

        let records = result.records();
        if records.len() > 1 && self.slowest_tests > 0 {
            let mut slowest: Vec<&TestRecord> = records.iter().collect();
            // The sort is stable, so ties stay in execution order.
            slowest.sort_by(|a, b| b.elapsed.cmp(&a.elapsed));
            slowest.truncate(self.slowest_tests);

            writeln!(
                writer,
                "\nThe {} slowest {}:\n",
                slowest.len().style(self.styles.count),
                plural::tests_str(slowest.len()),
            )?;
            for record in slowest {
                writeln!(writer, "{} ({})", record.identifier, DisplaySecs(record.elapsed))?;
            }
            writeln!(writer)?;
        }

        let stats = result.run_stats();
        writeln!(writer, "{}", DisplaySeparator('-'))?;
        writeln!(
            writer,
            "Ran {} {} in {:.3}s",
            stats.final_run_count.style(self.styles.count),
            plural::tests_str(stats.final_run_count),
            result.elapsed().as_secs_f64(),
        )?;
        if stats.is_canceled() {
            writeln!(
                writer,
                "Stopped early because of fail-fast: {} of {} {} not run",
                (stats.initial_run_count - stats.final_run_count).style(self.styles.count),
                stats.initial_run_count,
                plural::tests_str(stats.initial_run_count),
            )?;
        }
        writeln!(writer)?;
        write_final_status(&stats, &self.styles, writer)
    }
}
