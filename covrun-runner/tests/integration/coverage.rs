// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, ensure};
use covrun_runner::{
    coverage::{
        COVERAGE_DATA_VERSION, CoverageData, CoverageDataFile, CoverageReportOptions,
        SourceIndex, SummaryStatus, collect_sources, default_backend, probe,
    },
    reporter::{ReporterOutput, TestReporterBuilder},
    runner::{AggregateResult, TestEvent, TestRunnerBuilder},
    test_case::{TestFn, TestList, TestSignal},
};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn fixture_index() -> SourceIndex {
    let mut index = SourceIndex::new();
    index.insert(Utf8Path::new(FIXTURE_FILE), 1..=5);
    index
}

/// Two tests covering lines 1-2 and 1, 3 of the fixture file.
fn covered_list() -> TestList {
    let mut list = TestList::new();
    list.push(TestFn::new("math::Adder::adds", |_| {
        probe::hit(FIXTURE_FILE, 1);
        probe::hit(FIXTURE_FILE, 2);
        Ok(())
    }));
    list.push(TestFn::new("math::Adder::carries", |_| {
        probe::hit(FIXTURE_FILE, 1);
        probe::hit(FIXTURE_FILE, 3);
        // Outside the coverage sources.
        probe::hit("vendor/other.rs", 10);
        Ok(())
    }));
    list
}

fn runner(verbosity: u8, data_file: &Utf8Path) -> TestRunnerBuilder {
    let mut runner = TestRunnerBuilder::default();
    runner
        .set_verbosity(verbosity)
        .set_coverage_sources(["fixture"])
        .set_coverage_data_file(data_file);
    runner
}

/// Runs [`covered_list`] with coverage.
///
/// Line 5 is hit from the event callback between tests, so only the run's coverage sees it.
fn run_covered(verbosity: u8, data_file: &Utf8Path) -> Result<(AggregateResult, String)> {
    let list = covered_list();
    let mut buf = Vec::new();
    let result = {
        let mut reporter = TestReporterBuilder::default()
            .set_verbosity(verbosity)
            .build(ReporterOutput::Buffer(&mut buf));
        runner(verbosity, data_file)
            .build(&list, Some(Box::new(ScriptedBackend::new(fixture_index()))))
            .try_execute(|event: TestEvent<'_>| {
                if matches!(event, TestEvent::TestFinished { .. }) {
                    probe::hit(FIXTURE_FILE, 5);
                }
                reporter.report_event(event)
            })?
    };
    Ok((result, String::from_utf8(buf)?))
}

fn lines(file: &str, lines: impl IntoIterator<Item = u32>) -> CoverageData {
    let mut data = CoverageData::new();
    data.add_lines(Utf8Path::new(file), lines);
    data
}

#[test]
fn run_coverage_contains_test_coverage() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let (result, _) = run_covered(1, &dir.path().join("data.json"))?;

    let records = result.records();
    assert_eq!(records[0].coverage, Some(lines(FIXTURE_FILE, [1, 2])));
    assert_eq!(records[1].coverage, Some(lines(FIXTURE_FILE, [1, 3])));

    let overall = result.coverage().expect("coverage was measured");
    assert_eq!(overall, &lines(FIXTURE_FILE, [1, 2, 3, 5]));
    for record in records {
        let per_test = record.coverage.as_ref().expect("coverage was measured");
        ensure!(per_test.is_subset(overall), "{} not in run coverage", record.identifier);
    }
    Ok(())
}

#[test]
fn per_test_coverage_at_high_verbosity() -> Result<()> {
    let dir = Utf8TempDir::new()?;

    let (_, output) = run_covered(2, &dir.path().join("data.json"))?;
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        ensure!(line.ends_with(" [coverage 40.00%]"), "unexpected line: {line}");
    }

    let (_, output) = run_covered(1, &dir.path().join("data.json"))?;
    ensure!(!output.contains("coverage"));
    Ok(())
}

#[test]
fn overall_report_table() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let (result, _) = run_covered(1, &dir.path().join("data.json"))?;

    let mut out = Vec::new();
    let outcome = result.coverage_report(&CoverageReportOptions::default(), &mut out)?;
    assert_eq!(outcome.summary, SummaryStatus::Written);
    assert_eq!(
        String::from_utf8(out)?,
        indoc! {"

            Overall coverage report
            =======================

            Name             Stmts   Miss   Cover
            -------------------------------------
            fixture/math.rs      5      1     80%
            -------------------------------------
            TOTAL                5      1     80%
        "}
    );
    Ok(())
}

#[test]
fn saved_data_and_html() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let data_file = dir.path().join("coverage/data.json");
    let html_dir = dir.path().join("html");
    let (result, _) = run_covered(2, &data_file)?;

    let mut out = Vec::new();
    let outcome = result.coverage_report(
        &CoverageReportOptions {
            save_data: true,
            html_dir: Some(html_dir.clone()),
            to_stream: true,
        },
        &mut out,
    )?;

    assert_eq!(outcome.summary, SummaryStatus::Unavailable);
    assert_eq!(outcome.data_file.as_deref(), Some(data_file.as_path()));
    let index: Utf8PathBuf = html_dir.join("index.html");
    assert_eq!(outcome.html_index.as_deref(), Some(index.as_path()));

    let saved: CoverageDataFile = serde_json::from_str(&std::fs::read_to_string(&data_file)?)?;
    assert_eq!(saved.version, COVERAGE_DATA_VERSION);
    assert_eq!(&saved.lines, result.coverage().expect("coverage was measured"));

    let html = std::fs::read_to_string(&index)?;
    ensure!(html.contains("fixture/math.rs"));

    let out = String::from_utf8(out)?;
    ensure!(out.contains("not available while per-test coverage is shown"));
    ensure!(out.contains(&format!("file://{index}")));
    Ok(())
}

#[test]
fn no_sources_means_no_coverage() -> Result<()> {
    let list = covered_list();
    let result = TestRunnerBuilder::default()
        .build(&list, Some(Box::new(ScriptedBackend::new(fixture_index()))))
        .execute(|_| {})?;

    assert_eq!(result.coverage(), None);
    ensure!(result.records().iter().all(|record| record.coverage.is_none()));

    let mut out = Vec::new();
    let outcome = result.coverage_report(&CoverageReportOptions::default(), &mut out)?;
    assert_eq!(outcome.summary, SummaryStatus::NotMeasured);
    ensure!(out.is_empty());
    Ok(())
}

#[test]
fn verbosity_zero_hides_coverage() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let list = mixed_list();
    let mut buf = Vec::new();
    let result = {
        let mut reporter = TestReporterBuilder::default()
            .set_verbosity(0)
            .build(ReporterOutput::Buffer(&mut buf));
        runner(0, &dir.path().join("data.json"))
            .build(&list, Some(Box::new(ScriptedBackend::new(fixture_index()))))
            .try_execute(|event| reporter.report_event(event))?
    };

    ensure!(result.coverage().is_some(), "coverage is measured regardless of verbosity");
    assert_eq!(String::from_utf8(buf)?, ".FE");
    Ok(())
}

/// The only instrumented line under `tests/`.
fn instrumented_add(a: u32, b: u32) -> u32 {
    covrun_runner::probe!();
    a + b
}

#[test]
fn default_backend_credits_real_sites() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let mut list = TestList::new();
    list.push(TestFn::new("math::instrumented_add", |_| {
        if instrumented_add(2, 2) == 4 { Ok(()) } else { Err(TestSignal::failure("wrong sum")) }
    }));

    let mut percents = Vec::new();
    let result = {
        let mut runner = TestRunnerBuilder::default();
        runner
            .set_verbosity(2)
            .set_coverage_sources(["tests"])
            .set_coverage_data_file(dir.path().join("data.json"));
        runner.build(&list, default_backend()).execute(|event| {
            if let TestEvent::TestFinished {
                coverage_percent, ..
            } = event
            {
                percents.push(coverage_percent);
            }
        })?
    };

    let sources = collect_sources(&[Utf8PathBuf::from("tests")], &[])?;
    let index = probe::scan_probe_sites(&sources)?;
    let mut expected = CoverageData::new();
    for (file, lines) in index.iter() {
        expected.add_lines(file, lines.iter().copied());
    }
    ensure!(!expected.is_empty(), "the instrumented line is indexed");

    let record = &result.records()[0];
    assert_eq!(record.coverage.as_ref(), Some(&expected));
    assert_eq!(percents, vec![Some(100.0)]);
    Ok(())
}
