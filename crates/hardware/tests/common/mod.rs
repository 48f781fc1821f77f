/// Tracing setup and configuration builders.
pub mod harness;
