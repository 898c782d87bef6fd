// Copyright (c) The covrun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structure in this module is [`TestRunner`].

mod events;
mod imp;
mod result;

pub use events::*;
pub use imp::*;
pub use result::*;
