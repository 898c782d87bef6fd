// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for covrun.
//!
//! Settings are read from, in increasing order of priority:
//!
//! 1. the defaults embedded in this crate (`default-config.toml`)
//! 2. an explicit config file, or `.config/covrun.toml` under the workspace root if present
//! 3. `COVRUN_`-prefixed environment variables, for example `COVRUN_FAIL_FAST=true` or
//!    `COVRUN_COVERAGE_SOURCES=src,lib`

use crate::{
    errors::ConfigReadError,
    output::Color,
    reporter::TestReporterBuilder,
    runner::{DEFAULT_COVERAGE_DATA_FILE, TestRunnerBuilder},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, Environment, File, FileFormat, Map, builder::DefaultState};
use serde::Deserialize;

/// Resolved runner configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// Report density: 0 is one character per test, 1 is one line per test, 2 and above also
    /// show per-test coverage.
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,

    /// Stop after the first failing or erroring test.
    #[serde(default, alias = "fail_fast")]
    pub fail_fast: bool,

    /// Paths to measure coverage for.
    #[serde(default, alias = "coverage_sources")]
    pub coverage_sources: Option<Vec<Utf8PathBuf>>,

    /// Where to write the rerun manifest.
    #[serde(default, alias = "rerun_log")]
    pub rerun_log: Option<Utf8PathBuf>,

    /// Whether to colorize the report.
    #[serde(default)]
    pub color: Color,

    /// Where raw coverage data is saved.
    #[serde(default = "default_coverage_data_file", alias = "coverage_data_file")]
    pub coverage_data_file: Utf8PathBuf,

    /// How many of the slowest tests the summary lists.
    #[serde(default = "default_slowest_tests", alias = "slowest_tests")]
    pub slowest_tests: usize,
}

fn default_verbosity() -> u8 {
    1
}

fn default_coverage_data_file() -> Utf8PathBuf {
    DEFAULT_COVERAGE_DATA_FILE.into()
}

fn default_slowest_tests() -> usize {
    5
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            verbosity: default_verbosity(),
            fail_fast: false,
            coverage_sources: None,
            rerun_log: None,
            color: Color::default(),
            coverage_data_file: default_coverage_data_file(),
            slowest_tests: default_slowest_tests(),
        }
    }
}

impl RunnerConfig {
    /// The default location of the config within the workspace root.
    pub const CONFIG_PATH: &'static str = ".config/covrun.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// The prefix of environment variables that override configuration.
    pub const ENV_PREFIX: &'static str = "COVRUN";

    /// Reads the configuration from the default config, the given file (or the default location
    /// under `workspace_root`), and the process environment.
    ///
    /// An explicitly passed-in file must exist. The default location is optional.
    pub fn from_sources(
        config_file: Option<&Utf8Path>,
        workspace_root: &Utf8Path,
    ) -> Result<Self, ConfigReadError> {
        Self::read_from_sources(config_file, workspace_root, None)
    }

    /// Returns a runner builder with these settings applied.
    pub fn runner_builder(&self) -> TestRunnerBuilder {
        let mut builder = TestRunnerBuilder::default();
        builder
            .set_verbosity(self.verbosity)
            .set_fail_fast(self.fail_fast)
            .set_coverage_data_file(self.coverage_data_file.clone());
        if let Some(sources) = &self.coverage_sources {
            builder.set_coverage_sources(sources.iter().cloned());
        }
        if let Some(rerun_log) = &self.rerun_log {
            builder.set_rerun_log(rerun_log.clone());
        }
        builder
    }

    /// Returns a reporter builder with these settings applied.
    ///
    /// Whether to colorize is decided against standard output.
    pub fn reporter_builder(&self) -> TestReporterBuilder {
        let mut builder = TestReporterBuilder::default();
        builder
            .set_verbosity(self.verbosity)
            .set_colorize(self.color.should_colorize(supports_color::Stream::Stdout))
            .set_slowest_tests(self.slowest_tests);
        builder
    }

    // ---
    // Helper methods
    // ---

    /// `env` replaces the process environment when set.
    fn read_from_sources(
        file: Option<&Utf8Path>,
        workspace_root: &Utf8Path,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigReadError> {
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let environment = Environment::with_prefix(Self::ENV_PREFIX)
            .prefix_separator("_")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("coverage_sources")
            .source(env);

        Self::make_default_config()
            .add_source(source)
            .add_source(environment)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|err| ConfigReadError::new(config_file, err))
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }
}
