//! Configurable hardware units.
//!
//! The engine implements these units; this module holds the descriptors
//! the composition layer builds for them: caches with their replacement
//! policies, and branch predictors.

/// Branch prediction unit configuration (predictor kind, BTB geometry).
pub mod bru;

/// Cache descriptors, presets, and the hierarchy builder.
pub mod cache;
