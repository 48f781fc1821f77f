//! Core-side descriptors.
//!
//! This module contains everything that describes a single core: the CPU
//! model it runs, the feature toggles of the detailed model, and the units
//! (caches, branch predictors) it is built with.

/// CPU model kinds and out-of-order feature toggles.
pub mod cpu;

/// Configurable units (caches, replacement policies, branch predictors).
pub mod units;

pub use self::cpu::{CpuModel, MemoryMode};
