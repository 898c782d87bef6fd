// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::outcome::Outcome;
use owo_colors::Style;

#[derive(Debug, Default, Clone)]
pub(super) struct Styles {
    pub(super) count: Style,
    pub(super) pass: Style,
    pub(super) fail: Style,
    pub(super) error: Style,
    pub(super) skip: Style,
    pub(super) expected_failure: Style,
    pub(super) unexpected_success: Style,
}

impl Styles {
    pub(super) fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().black().on_green();
        self.fail = Style::new().yellow().on_red();
        self.error = Style::new().white().on_red().bold();
        self.skip = Style::new().yellow().on_black();
        self.expected_failure = Style::new().red().on_black();
        self.unexpected_success = Style::new().magenta().on_black().bold();
    }

    pub(super) fn for_outcome(&self, outcome: Outcome) -> Style {
        match outcome {
            Outcome::Passed => self.pass,
            Outcome::Failed => self.fail,
            Outcome::Errored => self.error,
            Outcome::Skipped => self.skip,
            Outcome::ExpectedFailure => self.expected_failure,
            Outcome::UnexpectedSuccess => self.unexpected_success,
        }
    }
}
