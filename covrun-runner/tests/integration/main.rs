// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod basic;
#[cfg(feature = "probe-coverage")]
mod coverage;
mod fixtures;
