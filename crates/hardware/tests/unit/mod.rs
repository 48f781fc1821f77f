//! # Unit Components
//!
//! Tests grouped by the crate module they exercise.

/// Unit-carrying values and address ranges.
pub mod common;
