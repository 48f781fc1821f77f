//! Hardware-system composition layer.
//!
//! This crate describes a simulated multi-core machine and hands it to an
//! external simulation engine. It implements the following:
//! 1. **Memory:** Partitioning the requested memory across a platform's regions.
//! 2. **Clusters:** Homogeneous CPU clusters with shared clock and voltage domains,
//!    out-of-order feature toggles, and PMU wiring.
//! 3. **Caches:** Per-level replacement-policy selection and an L1/L2/L3 hierarchy
//!    bounded by a requested depth.
//! 4. **Topology:** Buses, bridges and port links of the assembled system.
//! 5. **Run control:** Fidelity switching between CPU models, warm-up, phases, and checkpoints.

/// Common types and constants (address ranges, units, errors).
pub mod common;
/// Configuration record (defaults, clusters, switching, run loop, boot).
pub mod config;
/// CPU models, core features, and cache configuration.
pub mod core;
/// Engine interface, fidelity switching, and the run driver.
pub mod sim;
/// System-on-chip composition (platform, memory, clusters, interconnect, topology).
pub mod soc;

/// Root configuration type; use `SimConfig::default()` or load from JSON.
pub use crate::config::SimConfig;
/// Crate-wide error and result types.
pub use crate::common::{Error, Result};
/// Fidelity switch controller.
pub use crate::sim::{CpuModelSwitchController, SimulationEngine};
/// Composition entry points and the finished system description.
pub use crate::soc::{SystemBuilder, SystemTopology, build_topology};
