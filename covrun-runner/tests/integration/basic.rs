// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, bail, ensure};
use covrun_runner::{
    config::RunnerConfig,
    coverage::default_backend,
    errors::{RerunLogError, RunError},
    outcome::Outcome,
    reporter::{ReporterOutput, TestReporterBuilder},
    rerun::RerunLog,
    runner::{AggregateResult, TestEvent, TestRunnerBuilder},
    test_case::{TestIdentifier, TestList},
    test_filter::TestFilter,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn identifiers(ids: &[&str]) -> Vec<TestIdentifier> {
    ids.iter().copied().map(TestIdentifier::from).collect()
}

#[test]
fn mixed_run_without_fail_fast() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let rerun_path = dir.path().join("nested/rerun.txt");
    let list = mixed_list();

    let mut runner = TestRunnerBuilder::default();
    runner.set_rerun_log(&rerun_path);
    let (result, output) = run_reported(&list, &runner, &TestReporterBuilder::default())?;

    let outcomes: Vec<_> = result.outcomes().map(|(_, outcome)| outcome).collect();
    assert_eq!(outcomes, [Outcome::Passed, Outcome::Failed, Outcome::Errored]);
    assert!(!result.is_success());

    let lines: Vec<_> = output.lines().collect();
    ensure!(
        lines[0].starts_with("math::Adder::adds [OK] ("),
        "unexpected first line: {}",
        lines[0]
    );
    ensure!(lines[1].starts_with("math::Adder::overflows [FAILED] ("));
    ensure!(lines[2].starts_with("math::Divider::by_zero [ERROR] ("));

    // Errors are listed before failures.
    let error_at = output.find("ERROR: math::Divider::by_zero");
    let fail_at = output.find("FAIL: math::Adder::overflows");
    ensure!(
        matches!((error_at, fail_at), (Some(e), Some(f)) if e < f),
        "failure listings out of order:\n{output}"
    );
    ensure!(output.contains("Addition wraps around.\n"));
    ensure!(output.contains("expected 0, got 256\n"));
    ensure!(output.contains("\nCaptured output:\ncomputing u8::MAX + 1\n"));
    ensure!(output.contains("Ran 3 tests in "));
    ensure!(output.ends_with("\nFAILED (failures=1, errors=1)\n"));

    assert_eq!(
        RerunLog::load(&rerun_path)?,
        identifiers(&["math::Adder::overflows", "math::Divider::by_zero"])
    );
    Ok(())
}

#[test]
fn mixed_run_with_fail_fast() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let rerun_path = dir.path().join("rerun.txt");
    std::fs::write(&rerun_path, "stale::Entry::from_last_run\n")?;
    let list = mixed_list();

    let mut runner = TestRunnerBuilder::default();
    runner.set_fail_fast(true).set_rerun_log(&rerun_path);
    let (result, output) = run_reported(&list, &runner, &TestReporterBuilder::default())?;

    assert_eq!(result.records().len(), 2);
    assert!(result.is_canceled());
    ensure!(!output.contains("math::Divider::by_zero"));
    ensure!(output.contains("Stopped early because of fail-fast: 1 of 3 tests not run\n"));
    ensure!(output.ends_with("\nFAILED (failures=1)\n"));

    // The manifest is replaced, not appended to.
    assert_eq!(
        RerunLog::load(&rerun_path)?,
        identifiers(&["math::Adder::overflows"])
    );
    Ok(())
}

fn cwd_entries() -> Result<BTreeSet<String>> {
    std::fs::read_dir(".")?
        .map(|entry| -> Result<String> { Ok(entry?.file_name().to_string_lossy().into_owned()) })
        .collect()
}

#[test]
fn no_rerun_log_writes_nothing() -> Result<()> {
    let before = cwd_entries()?;
    let list = mixed_list();

    let result = TestRunnerBuilder::default()
        .build(&list, None)
        .execute(|_| {})?;

    assert_eq!(result.rerun_log().path(), None);
    assert_eq!(
        result.rerun_log().identifiers().cloned().collect::<Vec<_>>(),
        identifiers(&["math::Adder::overflows", "math::Divider::by_zero"])
    );
    assert_eq!(cwd_entries()?, before);
    Ok(())
}

#[test]
fn unwritable_rerun_log_keeps_streamed_output() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    // A regular file where the manifest's directory should be.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "")?;
    let list = mixed_list();

    let mut buf = Vec::new();
    let error = {
        let mut reporter = TestReporterBuilder::default().build(ReporterOutput::Buffer(&mut buf));
        TestRunnerBuilder::default()
            .set_rerun_log(blocker.join("rerun.txt"))
            .build(&list, None)
            .try_execute(|event| reporter.report_event(event))
            .err()
    };

    match error {
        Some(RunError::RerunLog(RerunLogError::CreateDir { path, .. })) => {
            assert_eq!(path, blocker);
        }
        other => bail!("expected a rerun log error, got {other:?}"),
    }

    let output = String::from_utf8(buf)?;
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 3, "one line per test:\n{output}");
    ensure!(lines[0].starts_with("math::Adder::adds [OK] ("));
    ensure!(lines[1].starts_with("math::Adder::overflows [FAILED] ("));
    ensure!(lines[2].starts_with("math::Divider::by_zero [ERROR] ("));
    Ok(())
}

#[test]
fn repeated_runs_are_identical() -> Result<()> {
    let list = mixed_list();
    let run = || {
        TestRunnerBuilder::default()
            .build(&list, default_backend())
            .execute(|_| {})
    };

    let first = run()?;
    let second = run()?;

    let outcomes = |result: &AggregateResult| {
        result
            .outcomes()
            .map(|(identifier, outcome)| (identifier.to_string(), outcome))
            .collect::<Vec<_>>()
    };
    assert_eq!(outcomes(&first), outcomes(&second));
    assert_eq!(
        first.rerun_log().identifiers().collect::<Vec<_>>(),
        second.rerun_log().identifiers().collect::<Vec<_>>()
    );
    for result in [&first, &second] {
        assert_eq!(result.coverage(), None);
        ensure!(result.records().iter().all(|record| record.coverage.is_none()));
    }
    Ok(())
}

#[test]
fn symbols_at_verbosity_zero() -> Result<()> {
    let list = passing_list(75);
    let mut buf = Vec::new();
    {
        let mut reporter = TestReporterBuilder::default()
            .set_verbosity(0)
            .build(ReporterOutput::Buffer(&mut buf));
        TestRunnerBuilder::default()
            .set_verbosity(0)
            .build(&list, None)
            .try_execute(|event| reporter.report_event(event))?;
    }

    let expected = format!("{}\n{}", ".".repeat(70), ".".repeat(5));
    assert_eq!(String::from_utf8(buf)?, expected);
    Ok(())
}

#[test]
fn colorized_output_matches_plain_output() -> Result<()> {
    let list = mixed_list();
    let mut plain_buf = Vec::new();
    let mut color_buf = Vec::new();
    {
        let mut plain = TestReporterBuilder::default().build(ReporterOutput::Buffer(&mut plain_buf));
        let mut color = TestReporterBuilder::default()
            .set_colorize(true)
            .build(ReporterOutput::Buffer(&mut color_buf));

        let result = TestRunnerBuilder::default()
            .build(&list, None)
            .try_execute(|event: TestEvent<'_>| {
                plain.report_event(event.clone())?;
                color.report_event(event)
            })?;
        plain.write_summary(&result)?;
        color.write_summary(&result)?;
    }

    ensure!(plain_buf != color_buf, "colorized output has no escapes");
    assert_eq!(
        String::from_utf8(strip_ansi_escapes::strip(&color_buf))?,
        String::from_utf8(plain_buf)?
    );
    Ok(())
}

#[test]
fn empty_list() -> Result<()> {
    let list = TestList::new();
    let (result, output) = run_reported(&list, &TestRunnerBuilder::default(), &{
        let mut reporter = TestReporterBuilder::default();
        reporter.set_slowest_tests(3);
        reporter
    })?;

    assert!(result.records().is_empty());
    assert!(result.is_success());
    ensure!(output.contains("Ran 0 tests in "));
    ensure!(!output.contains("slowest"));
    ensure!(output.ends_with("\nOK\n"));
    Ok(())
}

#[test]
fn rerun_manifest_drives_next_run() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let rerun_path = dir.path().join("rerun.txt");

    let list = mixed_list();
    TestRunnerBuilder::default()
        .set_rerun_log(&rerun_path)
        .build(&list, None)
        .execute(|_| {})?;

    let rerun_list = TestFilter::from_rerun_log(&rerun_path)?.filter(mixed_list())?;
    assert_eq!(
        rerun_list.identifiers(),
        identifiers(&["math::Adder::overflows", "math::Divider::by_zero"])
    );
    Ok(())
}

#[test]
fn config_drives_builders() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    std::fs::create_dir_all(dir.path().join(".config"))?;
    std::fs::write(
        dir.path().join(RunnerConfig::CONFIG_PATH),
        "fail-fast = true\nverbosity = 0\ncolor = \"never\"\n",
    )?;
    let config = RunnerConfig::from_sources(None, dir.path())?;

    let list = mixed_list();
    let mut buf = Vec::new();
    let result = {
        let mut reporter = config
            .reporter_builder()
            .build(ReporterOutput::Buffer(&mut buf));
        config
            .runner_builder()
            .build(&list, None)
            .try_execute(|event| reporter.report_event(event))?
    };

    assert!(result.is_canceled());
    assert_eq!(String::from_utf8(buf)?, ".F");
    Ok(())
}
