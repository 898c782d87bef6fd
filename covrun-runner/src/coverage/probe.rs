// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The built-in coverage backend, driven by the [`probe!`](crate::probe) macro.
//!
//! Instrumented code records lines by invoking `probe!()`. Hits are collected into a thread-local
//! recorder while [`ProbeCollector`] is started, and dropped otherwise.
//!
//! `file!()` is relative to wherever the compiler was invoked, which for a cargo workspace is the
//! workspace root rather than the package. Probe sites are therefore resolved against the
//! invoking crate's manifest directory and recorded relative to the current directory, the same
//! base that source roots are given in.

use super::{
    CoverageBackend, CoverageData, SourceFilter, SourceIndex, collect_sources,
    sources::relative_to_cwd,
};
use crate::errors::CoverageError;
use camino::{Utf8Path, Utf8PathBuf};
use std::{cell::RefCell, collections::HashMap, fs};
use tracing::debug;

thread_local! {
    static RECORDER: RefCell<Option<CoverageData>> = const { RefCell::new(None) };
    static SITES: RefCell<HashMap<(&'static str, &'static str), Utf8PathBuf>> =
        RefCell::new(HashMap::new());
}

const PROBE_MARKER: &str = "probe!(";

/// Records an executed line.
///
/// `file` is taken as-is, relative to the current directory. This is useful to record synthetic
/// locations; instrumented code should use [`probe!`](crate::probe) instead.
pub fn hit(file: &str, line: u32) {
    RECORDER.with_borrow_mut(|recorder| {
        if let Some(data) = recorder {
            data.add_line(Utf8Path::new(file), line);
        }
    });
}

/// Records an executed line at a `file!()` location within the crate at `manifest_dir`.
///
/// This is what [`probe!`](crate::probe) expands to.
pub fn hit_site(manifest_dir: &'static str, file: &'static str, line: u32) {
    RECORDER.with_borrow_mut(|recorder| {
        let Some(data) = recorder else {
            return;
        };
        SITES.with_borrow_mut(|sites| {
            let path = sites
                .entry((manifest_dir, file))
                .or_insert_with(|| relative_to_cwd(&resolve_site(manifest_dir, file)));
            data.add_line(path, line);
        });
    });
}

/// Finds the file a `file!()` path refers to.
///
/// A relative `file!()` path is relative to the manifest directory or one of its ancestors (the
/// workspace root). The first ancestor under which the file exists wins.
pub(crate) fn resolve_site(manifest_dir: &str, file: &str) -> Utf8PathBuf {
    let file = Utf8Path::new(file);
    if file.is_absolute() {
        return file.to_owned();
    }
    let manifest_dir = Utf8Path::new(manifest_dir);
    manifest_dir
        .ancestors()
        .map(|base| base.join(file))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| manifest_dir.join(file))
}

/// A [`CoverageBackend`] that gathers hits from `probe!()` invocations on the current thread.
#[derive(Debug, Default)]
pub struct ProbeCollector {
    recording: bool,
}

impl ProbeCollector {
    /// Creates a new collector. Nothing is recorded until it is started.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CoverageBackend for ProbeCollector {
    fn start(&mut self) -> Result<(), CoverageError> {
        RECORDER.with_borrow_mut(|recorder| {
            if recorder.is_some() {
                return Err(CoverageError::AlreadyRecording);
            }
            *recorder = Some(CoverageData::new());
            Ok(())
        })?;
        self.recording = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<CoverageData, CoverageError> {
        if !self.recording {
            return Err(CoverageError::NotRecording);
        }
        self.recording = false;
        RECORDER
            .with_borrow_mut(Option::take)
            .ok_or(CoverageError::NotRecording)
    }

    fn measurable_lines(&mut self, filter: &SourceFilter) -> Result<SourceIndex, CoverageError> {
        let sources = collect_sources(filter.roots(), &[])?;
        scan_probe_sites(&sources)
    }
}

impl Drop for ProbeCollector {
    fn drop(&mut self) {
        // Don't leave the thread recording if a run was abandoned while a scope was open.
        if self.recording {
            RECORDER.with_borrow_mut(|recorder| *recorder = None);
        }
    }
}

/// Builds an index of every line containing a `probe!()` invocation.
///
/// Line comments are skipped.
pub fn scan_probe_sites(sources: &[Utf8PathBuf]) -> Result<SourceIndex, CoverageError> {
    let mut index = SourceIndex::new();
    for path in sources {
        let contents = fs::read_to_string(path).map_err(|error| CoverageError::ReadSource {
            path: path.clone(),
            error,
        })?;
        let lines = contents
            .lines()
            .zip(1..)
            .filter(|(text, _)| {
                let text = text.trim_start();
                !text.starts_with("//") && text.contains(PROBE_MARKER)
            })
            .map(|(_, line)| line);

        index.insert(path, lines);
        debug!(%path, "scanned for probe sites");
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_only_while_started() {
        let mut collector = ProbeCollector::new();
        hit("lib.rs", 1);

        collector.start().unwrap();
        hit("lib.rs", 2);
        hit("./lib.rs", 3);
        let data = collector.stop().unwrap();
        hit("lib.rs", 4);

        let mut expected = CoverageData::new();
        expected.add_lines(Utf8Path::new("lib.rs"), [2, 3]);
        assert_eq!(data, expected);
    }

    #[test]
    fn probe_macro_records_its_location() {
        let mut collector = ProbeCollector::new();
        collector.start().unwrap();
        let line = line!() + 1;
        crate::probe!();
        let data = collector.stop().unwrap();

        // Tests run from the package directory, whatever the compiler's working directory was.
        let lines = data.lines(Utf8Path::new("src/coverage/probe.rs")).unwrap();
        assert!(lines.contains(&line), "{lines:?} contains {line}");
    }

    #[test]
    fn sites_resolve_against_workspace_root() {
        let dir = Utf8TempDir::new().unwrap();
        let package = dir.path().join("crates/pkg");
        fs::create_dir_all(package.join("src")).unwrap();
        fs::write(package.join("src/lib.rs"), "").unwrap();

        // Compiled from the workspace root.
        assert_eq!(
            resolve_site(package.as_str(), "crates/pkg/src/lib.rs"),
            package.join("src/lib.rs")
        );
        // Compiled from the package directory.
        assert_eq!(resolve_site(package.as_str(), "src/lib.rs"), package.join("src/lib.rs"));
        // Absolute paths are kept.
        let absolute = package.join("src/lib.rs");
        assert_eq!(resolve_site("/unused", absolute.as_str()), absolute);
        // Unknown files fall back to the manifest directory.
        assert_eq!(resolve_site(package.as_str(), "src/gone.rs"), package.join("src/gone.rs"));
    }

    #[test]
    fn start_and_stop_are_checked() {
        let mut collector = ProbeCollector::new();
        assert!(matches!(collector.stop(), Err(CoverageError::NotRecording)));

        collector.start().unwrap();
        let mut other = ProbeCollector::new();
        assert!(matches!(other.start(), Err(CoverageError::AlreadyRecording)));
        collector.stop().unwrap();
    }

    #[test]
    fn dropping_stops_recording() {
        let mut collector = ProbeCollector::new();
        collector.start().unwrap();
        drop(collector);

        let mut collector = ProbeCollector::new();
        collector.start().unwrap();
        collector.stop().unwrap();
    }

    #[test]
    fn scan_finds_probe_sites() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("lib.rs");
        fs::write(
            &path,
            indoc! {r#"
                pub fn add(a: u32, b: u32) -> u32 {
                    crate::probe!();
                    a + b
                }

                // probe!() in a comment isn't measurable
                pub fn double(a: u32) -> u32 { probe!(); a * 2 }
            "#},
        )
        .unwrap();

        let index = scan_probe_sites(std::slice::from_ref(&path)).unwrap();
        let sites: Vec<_> = index
            .iter()
            .map(|(file, lines)| (file.to_owned(), lines.iter().copied().collect::<Vec<_>>()))
            .collect();
        assert_eq!(sites, vec![(path, vec![2, 7])]);
    }
}
