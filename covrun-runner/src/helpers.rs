// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for covrun.

use std::io;

/// Utilities for pluralizing various words based on count.
pub(crate) mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "selector" if `count` is 1, otherwise "selectors".
    pub(crate) fn selectors_str(count: usize) -> &'static str {
        if count == 1 { "selector" } else { "selectors" }
    }
}

/// Collapses an atomic write error into the I/O error behind it.
///
/// Both internal failures (creating, syncing or renaming the temporary file) and failures in the
/// writer closure are I/O errors, so callers only need to attach the path.
pub(crate) fn flatten_atomic_error(error: atomicwrites::Error<io::Error>) -> io::Error {
    match error {
        atomicwrites::Error::Internal(error) | atomicwrites::Error::User(error) => error,
    }
}
