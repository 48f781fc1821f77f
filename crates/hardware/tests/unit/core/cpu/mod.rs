
/// Memory modes and cache requirements per model.
pub mod models;
