//! System construction.
//!
//! This module holds the mutable state a system is composed in. It performs:
//! 1. **Memory ranges:** Allocated from the platform before any cluster exists.
//! 2. **I/O path:** The memory bus, I/O bus, I/O bridge, and I/O cache or DMA bridge.
//! 3. **Cluster registry:** The cluster list and the monotonic CPU counter.
//! 4. **Entry point:** [`build_topology`] composes a whole system from a [`SimConfig`].

use tracing::{debug, info};

use crate::common::{ByteSize, MemoryRange, Result};
use crate::config::SimConfig;
use crate::core::MemoryMode;
use crate::core::units::cache::CacheSpec;
use crate::soc::cluster::{ClusterId, ClusterSpec, CpuClusterComposer};
use crate::soc::interconnect::Interconnect;
use crate::soc::memory::MemoryRangeAllocator;
use crate::soc::platform::Platform;
use crate::soc::topology::{SystemTopology, TopologyAssembler};

/// A system under composition.
///
/// Created once per system; clusters are registered through
/// [`CpuClusterComposer::compose`] and the builder is consumed by
/// [`TopologyAssembler::assemble`].
#[derive(Debug)]
pub struct SystemBuilder {
    pub(super) platform: Platform,
    pub(super) mem_size: ByteSize,
    pub(super) mem_mode: MemoryMode,
    pub(super) memory_ranges: Vec<MemoryRange>,
    pub(super) interconnect: Interconnect,
    pub(super) clusters: Vec<ClusterSpec>,
    num_cpus: usize,
}

impl SystemBuilder {
    /// Starts a system on `platform`.
    ///
    /// Memory ranges are allocated immediately. With `io_caches` device DMA
    /// goes through an I/O cache covering the ranges, otherwise through a
    /// DMA bridge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientPlatformCapacity`](crate::common::Error::InsufficientPlatformCapacity)
    /// if the platform cannot hold `mem_size`.
    pub fn new(
        platform: Platform,
        mem_size: ByteSize,
        mem_mode: MemoryMode,
        io_caches: bool,
    ) -> Result<Self> {
        let memory_ranges = MemoryRangeAllocator::allocate(mem_size.as_u64(), &platform.mem_regions)?;
        let io_cache = io_caches.then(CacheSpec::io);
        let interconnect = Interconnect::new(&memory_ranges, io_cache);

        debug!(
            platform = %platform.name,
            mem_size = %mem_size,
            %mem_mode,
            io_caches,
            "started system"
        );
        Ok(Self {
            platform,
            mem_size,
            mem_mode,
            memory_ranges,
            interconnect,
            clusters: Vec::new(),
            num_cpus: 0,
        })
    }

    /// Platform the system is built on.
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Memory mode the system runs in.
    pub const fn mem_mode(&self) -> MemoryMode {
        self.mem_mode
    }

    /// Allocated memory ranges.
    pub fn memory_ranges(&self) -> &[MemoryRange] {
        &self.memory_ranges
    }

    /// Cores registered so far.
    pub const fn num_cpus(&self) -> usize {
        self.num_cpus
    }

    /// Clusters registered so far.
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Registered clusters.
    pub fn clusters(&self) -> &[ClusterSpec] {
        &self.clusters
    }

    pub(super) fn register_cluster(&mut self, cluster: ClusterSpec) -> ClusterId {
        let id = self.clusters.len();
        self.num_cpus += cluster.num_cores();
        self.clusters.push(cluster);
        id
    }
}

/// Memory mode for a set of cluster models: timing if any cluster needs the
/// timing hierarchy, otherwise atomic if any cluster is atomic.
fn system_mem_mode(config: &SimConfig) -> MemoryMode {
    let modes = config.clusters.iter().map(|c| c.cpu_model.memory_mode());
    modes.fold(MemoryMode::AtomicNoncaching, |acc, mode| match (acc, mode) {
        (MemoryMode::Timing, _) | (_, MemoryMode::Timing) => MemoryMode::Timing,
        (MemoryMode::Atomic, _) | (_, MemoryMode::Atomic) => MemoryMode::Atomic,
        _ => MemoryMode::AtomicNoncaching,
    })
}

/// Composes the system `config` describes.
///
/// # Errors
///
/// Returns the first composition error; no partial system is produced.
pub fn build_topology(config: &SimConfig) -> Result<SystemTopology> {
    TopologyAssembler::check_depth(config.hierarchy_depth)?;

    let mem_mode = system_mem_mode(config);
    let io_caches = config.caches_enabled && mem_mode == MemoryMode::Timing;
    let mut system = SystemBuilder::new(config.platform(), config.mem_size, mem_mode, io_caches)?;

    for cluster in &config.clusters {
        let _ = CpuClusterComposer::compose(&mut system, cluster.to_request(config.run.warmup_insts))?;
    }

    let topology =
        TopologyAssembler::assemble(system, config.hierarchy_depth, config.caches_enabled)?;
    info!(
        clusters = topology.clusters.len(),
        cpus = topology.num_cpus(),
        depth = topology.hierarchy_depth,
        "system topology assembled"
    );
    Ok(topology)
}
