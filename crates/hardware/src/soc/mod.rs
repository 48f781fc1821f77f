//! System-on-Chip (SoC) composition.
//!
//! This module organizes everything that turns a configuration into a wired
//! system description: the platform memory map, memory range allocation,
//! CPU clusters, the interconnect, and the assembler that ties them together.

/// System builder and the configuration entry point.
pub mod builder;

/// CPU cluster composition and PMU wiring.
pub mod cluster;

/// Buses, bridges and port links.
pub mod interconnect;

/// Memory range allocation.
pub mod memory;

/// Platform memory maps and presets.
pub mod platform;

/// Topology assembly and the finished system description.
pub mod topology;

pub use builder::{SystemBuilder, build_topology};
pub use cluster::{ClusterId, ClusterRequest, ClusterSpec, CoreSpec, CpuClusterComposer};
pub use memory::MemoryRangeAllocator;
pub use platform::{Platform, PlatformKind};
pub use topology::{SystemTopology, TopologyAssembler};
