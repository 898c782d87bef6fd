// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use covrun_runner::{
    errors::{RunError, WriteEventError},
    reporter::{ReporterOutput, TestReporterBuilder},
    runner::{AggregateResult, TestRunnerBuilder},
    test_case::{TestFn, TestList, TestSignal},
};
use std::fmt::Write as _;

/// The fixture source file that synthetic probe hits are attributed to.
#[cfg(feature = "probe-coverage")]
pub(crate) const FIXTURE_FILE: &str = "fixture/math.rs";

/// One passing, one failing and one erroring test, in that order.
pub(crate) fn mixed_list() -> TestList {
    let mut list = TestList::new();
    list.push(TestFn::new("math::Adder::adds", |_| Ok(())));
    list.push(
        TestFn::new("math::Adder::overflows", |ctx| {
            writeln!(ctx, "computing u8::MAX + 1").ok();
            Err(TestSignal::failure("expected 0, got 256"))
        })
        .with_description("Addition wraps around."),
    );
    list.push(TestFn::new("math::Divider::by_zero", |_| {
        Err(TestSignal::error("fixture file is missing"))
    }));
    list
}

pub(crate) fn passing_list(count: usize) -> TestList {
    let mut list = TestList::new();
    for n in 0..count {
        list.push(TestFn::new(format!("ok::Suite::test_{n}"), |_| Ok(())));
    }
    list
}

/// Runs `list` and streams it through a reporter writing into a buffer.
///
/// Returns the result and everything the reporter wrote, including the summary.
pub(crate) fn run_reported(
    list: &TestList,
    runner: &TestRunnerBuilder,
    reporter: &TestReporterBuilder,
) -> Result<(AggregateResult, String), RunError<WriteEventError>> {
    let mut buf = Vec::new();
    let result = {
        let mut reporter = reporter.build(ReporterOutput::Buffer(&mut buf));
        let result = runner
            .build(list, None)
            .try_execute(|event| reporter.report_event(event))?;
        reporter
            .write_summary(&result)
            .map_err(RunError::Callback)?;
        result
    };
    Ok((result, String::from_utf8_lossy(&buf).into_owned()))
}

#[cfg(feature = "probe-coverage")]
pub(crate) use scripted::ScriptedBackend;

#[cfg(feature = "probe-coverage")]
mod scripted {
    use covrun_runner::{
        coverage::{
            CoverageBackend, CoverageData, SourceFilter, SourceIndex, probe::ProbeCollector,
        },
        errors::CoverageError,
    };

    /// The probe backend, but with a fixed set of measurable lines instead of scanned sources.
    #[derive(Debug)]
    pub(crate) struct ScriptedBackend {
        inner: ProbeCollector,
        index: SourceIndex,
    }

    impl ScriptedBackend {
        pub(crate) fn new(index: SourceIndex) -> Self {
            Self {
                inner: ProbeCollector::new(),
                index,
            }
        }
    }

    impl CoverageBackend for ScriptedBackend {
        fn start(&mut self) -> Result<(), CoverageError> {
            self.inner.start()
        }

        fn stop(&mut self) -> Result<CoverageData, CoverageError> {
            self.inner.stop()
        }

        fn measurable_lines(
            &mut self,
            _filter: &SourceFilter,
        ) -> Result<SourceIndex, CoverageError> {
            Ok(self.index.clone())
        }
    }
}
