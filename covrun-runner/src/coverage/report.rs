// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{CoverageData, CoverageSummary, SourceIndex};
use crate::{errors::CoverageReportError, helpers::flatten_atomic_error};
use atomicwrites::{AllowOverwrite, AtomicFile};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Write as _,
    fs,
    io::{self, Write},
};
use tracing::info;

/// The version of the coverage data file format.
pub const COVERAGE_DATA_VERSION: u32 = 1;

/// Which parts of the overall coverage report to produce.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoverageReportOptions {
    /// Persist the run's raw coverage data to the configured data file.
    pub save_data: bool,

    /// Write an HTML report into this directory.
    pub html_dir: Option<Utf8PathBuf>,

    /// Write the summary table to the report stream.
    pub to_stream: bool,
}

impl Default for CoverageReportOptions {
    fn default() -> Self {
        Self {
            save_data: false,
            html_dir: None,
            to_stream: true,
        }
    }
}

/// What happened to the summary table of an overall coverage report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SummaryStatus {
    /// The table was written to the report stream.
    Written,

    /// The table wasn't requested.
    NotRequested,

    /// The table can't be produced while per-test coverage is shown. A notice was written to the
    /// report stream instead.
    Unavailable,

    /// Coverage wasn't measured during the run, so nothing was produced at all.
    NotMeasured,
}

/// The result of producing an overall coverage report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoverageReportOutcome {
    /// What happened to the summary table.
    pub summary: SummaryStatus,

    /// The data file that was written, if any.
    pub data_file: Option<Utf8PathBuf>,

    /// The HTML index that was written, if any.
    pub html_index: Option<Utf8PathBuf>,
}

impl CoverageReportOutcome {
    pub(crate) fn not_measured() -> Self {
        Self {
            summary: SummaryStatus::NotMeasured,
            data_file: None,
            html_index: None,
        }
    }
}

/// The on-disk representation of saved coverage data.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoverageDataFile {
    /// The format version, currently [`COVERAGE_DATA_VERSION`].
    pub version: u32,

    /// The executed lines.
    pub lines: CoverageData,
}

/// Produces the overall coverage report for a run.
#[derive(Debug)]
pub(crate) struct CoverageReporter<'a> {
    pub(crate) data: &'a CoverageData,
    pub(crate) index: Option<&'a SourceIndex>,
    pub(crate) verbosity: u8,
    pub(crate) data_file: &'a Utf8Path,
}

impl CoverageReporter<'_> {
    pub(crate) fn write(
        &self,
        options: &CoverageReportOptions,
        writer: &mut dyn Write,
    ) -> Result<CoverageReportOutcome, CoverageReportError> {
        let summary = self.summary();

        let summary_status = if !options.to_stream {
            SummaryStatus::NotRequested
        } else if self.verbosity >= 2 {
            writeln!(
                writer,
                "\nThe overall coverage report is not available while per-test coverage is shown."
            )
            .map_err(CoverageReportError::Write)?;
            SummaryStatus::Unavailable
        } else {
            write_summary_table(&summary, writer).map_err(CoverageReportError::Write)?;
            SummaryStatus::Written
        };

        let data_file = if options.save_data {
            save_data_file(self.data_file, self.data)?;
            Some(self.data_file.to_owned())
        } else {
            None
        };

        let html_index = match &options.html_dir {
            Some(dir) => {
                let index = write_html_report(dir, &summary)?;
                writeln!(writer, "\nHTML coverage data is saved as file://{index}")
                    .map_err(CoverageReportError::Write)?;
                Some(index)
            }
            None => None,
        };

        Ok(CoverageReportOutcome {
            summary: summary_status,
            data_file,
            html_index,
        })
    }

    fn summary(&self) -> CoverageSummary {
        match self.index {
            Some(index) => CoverageSummary::new(self.data, index),
            None => {
                // Without measurable lines, every executed line is the only known statement.
                let mut index = SourceIndex::new();
                for (file, lines) in self.data.iter() {
                    index.insert(file, lines.iter().copied());
                }
                CoverageSummary::new(self.data, &index)
            }
        }
    }
}

/// Writes the "Overall coverage report" table.
pub fn write_summary_table(summary: &CoverageSummary, writer: &mut dyn Write) -> io::Result<()> {
    const NAME: &str = "Name";
    const TOTAL: &str = "TOTAL";

    let name_width = summary
        .files
        .iter()
        .map(|file| file.path.as_str().len())
        .chain([NAME.len(), TOTAL.len()])
        .max()
        .unwrap_or(TOTAL.len());
    let width = name_width + 22;

    writeln!(writer, "\nOverall coverage report")?;
    writeln!(writer, "=======================\n")?;
    writeln!(
        writer,
        "{NAME:<name_width$} {:>6} {:>6} {:>7}",
        "Stmts", "Miss", "Cover"
    )?;
    writeln!(writer, "{:-<width$}", "")?;
    for file in &summary.files {
        writeln!(
            writer,
            "{:<name_width$} {:>6} {:>6} {:>6.0}%",
            file.path.as_str(),
            file.statements,
            file.missed,
            file.percent(),
        )?;
    }
    writeln!(writer, "{:-<width$}", "")?;
    writeln!(
        writer,
        "{TOTAL:<name_width$} {:>6} {:>6} {:>6.0}%",
        summary.statements(),
        summary.missed(),
        summary.percent(),
    )?;
    Ok(())
}

fn save_data_file(path: &Utf8Path, data: &CoverageData) -> Result<(), CoverageReportError> {
    let file = CoverageDataFile {
        version: COVERAGE_DATA_VERSION,
        lines: data.clone(),
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| CoverageReportError::SaveData {
            path: path.to_owned(),
            error,
        })?;
    }

    AtomicFile::new(path, AllowOverwrite)
        .write(|writer| {
            serde_json::to_writer_pretty(&mut *writer, &file)?;
            writer.write_all(b"\n")
        })
        .map_err(|error| CoverageReportError::SaveData {
            path: path.to_owned(),
            error: flatten_atomic_error(error),
        })?;

    info!(%path, "saved coverage data");
    Ok(())
}

fn write_html_report(
    dir: &Utf8Path,
    summary: &CoverageSummary,
) -> Result<Utf8PathBuf, CoverageReportError> {
    let html_error = |error| CoverageReportError::Html {
        dir: dir.to_owned(),
        error,
    };

    let mut rows = String::new();
    for file in &summary.files {
        // Writing to a String can't fail.
        _ = writeln!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.0}%</td></tr>",
            html_escape(file.path.as_str()),
            file.statements,
            file.missed,
            file.percent(),
        );
    }

    let html = format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>Coverage report</title></head>\n\
         <body>\n\
         <h1>Coverage report: {total:.0}%</h1>\n\
         <table>\n\
         <thead><tr><th>Module</th><th>statements</th><th>missing</th><th>coverage</th></tr></thead>\n\
         <tbody>\n{rows}</tbody>\n\
         <tfoot><tr><td>Total</td><td>{statements}</td><td>{missed}</td><td>{total:.0}%</td></tr></tfoot>\n\
         </table>\n\
         </body>\n\
         </html>\n",
        total = summary.percent(),
        statements = summary.statements(),
        missed = summary.missed(),
    );

    fs::create_dir_all(dir).map_err(html_error)?;
    let index = dir.join("index.html");
    fs::write(&index, html).map_err(html_error)?;

    info!(path = %index, "wrote HTML coverage report");
    Ok(index)
}

fn html_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
