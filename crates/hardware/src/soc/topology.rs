//! Topology assembly.
//!
//! This module turns a populated [`SystemBuilder`] into an immutable
//! [`SystemTopology`]. It performs:
//! 1. **Validation:** Hierarchy depth and cluster presence, before any wiring.
//! 2. **Caches:** Per-core L1 and walker caches, per-cluster L2 behind an L2 crossbar,
//!    and one shared L3 behind an L3 crossbar, bounded by the depth.
//! 3. **Wiring:** Every cluster's memory side to the memory bus or the L3 crossbar.
//! 4. **PMUs:** Attached once the caches they observe exist.

use tracing::{debug, warn};

use crate::common::constants::CACHE_XBAR_WIDTH;
use crate::common::{ByteSize, Error, Frequency, MemoryRange, Result};
use crate::core::MemoryMode;
use crate::core::units::cache::policies::PolicyParameterMismatch;
use crate::core::units::cache::{CacheHierarchyBuilder, CacheLevel, CacheSpec};
use crate::soc::builder::SystemBuilder;
use crate::soc::cluster::{ClusterId, ClusterSpec, CoreSpec, CpuClusterComposer};
use crate::soc::interconnect::{Bus, BusKind, Interconnect, L3_BUS, MEMBUS};
use crate::soc::memory::MemoryRangeAllocator;
use crate::soc::platform::Platform;

/// Deepest supported cache level.
const MAX_HIERARCHY_DEPTH: u8 = 3;

/// A fully wired system, ready to hand to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemTopology {
    /// Platform the system is built on.
    pub platform: Platform,
    /// Memory mode the system runs in.
    pub mem_mode: MemoryMode,
    /// Requested memory size; equals the sum of `memory_ranges`.
    pub requested_mem_size: ByteSize,
    /// Allocated memory ranges, in platform order.
    pub memory_ranges: Vec<MemoryRange>,
    /// CPU clusters, in socket order.
    pub clusters: Vec<ClusterSpec>,
    /// Shared L3, present only at depth three with caches enabled.
    pub shared_l3: Option<CacheSpec>,
    /// Deepest cache level built.
    pub hierarchy_depth: u8,
    /// Whether the cache hierarchy was built.
    pub caches_enabled: bool,
    /// Buses, bridges and links.
    pub interconnect: Interconnect,
}

impl SystemTopology {
    /// Total cores across all clusters.
    pub fn num_cpus(&self) -> usize {
        self.clusters.iter().map(ClusterSpec::num_cores).sum()
    }

    /// Every core, in CPU-id order.
    pub fn cores(&self) -> impl Iterator<Item = &CoreSpec> {
        self.clusters.iter().flat_map(|c| c.cores.iter())
    }

    /// Looks up a cluster by id.
    pub fn cluster(&self, id: usize) -> Option<&ClusterSpec> {
        self.clusters.get(id)
    }

    /// Ignored replacement-policy parameters of every cluster.
    pub fn policy_mismatches(
        &self,
    ) -> impl Iterator<Item = (ClusterId, CacheLevel, PolicyParameterMismatch)> + '_ {
        self.clusters.iter().flat_map(|c| {
            c.policy_mismatches
                .iter()
                .map(move |&(level, mismatch)| (c.id, level, mismatch))
        })
    }

    /// Number of cluster L2 caches.
    pub fn l2_count(&self) -> usize {
        self.clusters.iter().filter(|c| c.l2.is_some()).count()
    }

    /// Every cache instance with its object path.
    pub fn cache_instances(&self) -> Vec<(String, &CacheSpec)> {
        let mut caches = Vec::new();
        for cluster in &self.clusters {
            for core in &cluster.cores {
                if let Some(l1) = &core.l1 {
                    caches.push((format!("{}.icache", core.path), &l1.icache));
                    caches.push((format!("{}.dcache", core.path), &l1.dcache));
                    if let Some(walk) = &l1.walk_i {
                        caches.push((format!("{}.itb_walker_cache", core.path), walk));
                    }
                    if let Some(walk) = &l1.walk_d {
                        caches.push((format!("{}.dtb_walker_cache", core.path), walk));
                    }
                }
            }
            if let Some(l2) = &cluster.l2 {
                caches.push((format!("{}.l2", cluster.name()), l2));
            }
        }
        if let Some(l3) = &self.shared_l3 {
            caches.push(("l3".to_string(), l3));
        }
        caches
    }

    /// Memory size in bytes covered by the allocated ranges.
    pub fn allocated_mem_size(&self) -> u64 {
        MemoryRangeAllocator::total(&self.memory_ranges)
    }
}

/// Wires clusters, caches and buses into a [`SystemTopology`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TopologyAssembler;

impl TopologyAssembler {
    /// Checks that `depth` names a buildable hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHierarchyDepth`] unless `depth` is 1, 2, or 3.
    pub fn check_depth(depth: u8) -> Result<()> {
        if depth == 0 || depth > MAX_HIERARCHY_DEPTH {
            return Err(Error::InvalidHierarchyDepth(depth));
        }
        Ok(())
    }

    /// Assembles the system.
    ///
    /// Without caches every cluster connects straight to the memory bus.
    /// With caches, L1s are built for every cluster, then L2s when `depth > 1`,
    /// then a shared L3 clocked at the fastest cluster clock when `depth > 2`.
    /// Clusters whose model bypasses the timing hierarchy get no caches at
    /// any depth.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidHierarchyDepth`], checked first.
    /// * [`Error::NoClusters`] if nothing was composed.
    /// * [`Error::PmuInterruptCount`] from a cluster's PMU request.
    pub fn assemble(
        system: SystemBuilder,
        depth: u8,
        caches_enabled: bool,
    ) -> Result<SystemTopology> {
        Self::check_depth(depth)?;
        if system.clusters.is_empty() {
            return Err(Error::NoClusters);
        }

        let SystemBuilder {
            platform,
            mem_size,
            mem_mode,
            memory_ranges,
            mut interconnect,
            mut clusters,
            ..
        } = system;

        let mut shared_l3 = None;
        if caches_enabled {
            for cluster in &mut clusters {
                add_l1(&mut interconnect, cluster);
            }
            if depth > 1 {
                for cluster in &mut clusters {
                    add_l2(&mut interconnect, cluster);
                }
            }
            let mut cluster_bus = MEMBUS;
            if depth > 2 {
                let clock = clusters
                    .iter()
                    .map(|c| c.clock)
                    .max()
                    .unwrap_or_default();
                shared_l3 = Some(add_l3(&mut interconnect, clock));
                cluster_bus = L3_BUS;
            }
            for cluster in &clusters {
                connect_mem_side(&mut interconnect, cluster, cluster_bus);
            }
        } else {
            for cluster in &clusters {
                connect_mem_side(&mut interconnect, cluster, MEMBUS);
            }
        }

        for cluster in &mut clusters {
            if let Some(request) = cluster.pmu_request.clone() {
                CpuClusterComposer::add_pmus(cluster, &request.interrupts, &request.events)?;
            }
        }

        let topology = SystemTopology {
            platform,
            mem_mode,
            requested_mem_size: mem_size,
            memory_ranges,
            clusters,
            shared_l3,
            hierarchy_depth: depth,
            caches_enabled,
            interconnect,
        };
        verify(&topology)?;
        Ok(topology)
    }
}

/// Builds the private caches of every core and links each core to them.
fn add_l1(ic: &mut Interconnect, cluster: &mut ClusterSpec) {
    for core in &mut cluster.cores {
        core.l1 = CacheHierarchyBuilder::build_l1(
            cluster.core_model,
            &cluster.templates,
            &cluster.requests,
        );
        let Some(l1) = &core.l1 else { continue };
        let path = &core.path;
        ic.link(&format!("{path}.icache_port"), &format!("{path}.icache.cpu_side"));
        ic.link(&format!("{path}.dcache_port"), &format!("{path}.dcache.cpu_side"));
        if l1.walk_i.is_some() {
            ic.link(
                &format!("{path}.mmu.itb_walker"),
                &format!("{path}.itb_walker_cache.cpu_side"),
            );
        }
        if l1.walk_d.is_some() {
            ic.link(
                &format!("{path}.mmu.dtb_walker"),
                &format!("{path}.dtb_walker_cache.cpu_side"),
            );
        }
    }
    if let Some(l1) = cluster.cores.iter().find_map(|c| c.l1.as_ref()) {
        cluster.policy_mismatches.extend(l1.mismatches.iter().copied());
        debug!(cluster = cluster.id, "added l1 caches");
    }
}

/// Builds the cluster L2 behind its crossbar and connects the cores to it.
fn add_l2(ic: &mut Interconnect, cluster: &mut ClusterSpec) {
    let Some(built) =
        CacheHierarchyBuilder::build_l2(cluster.core_model, &cluster.templates, &cluster.requests)
    else {
        return;
    };
    cluster.policy_mismatches.extend(built.tagged_mismatches());
    let l2 = built.spec;
    let bus = cluster.l2_bus_name();
    ic.add_bus(Bus {
        name: bus.clone(),
        kind: BusKind::L2XBar {
            width: CACHE_XBAR_WIDTH,
        },
        clock: Some(cluster.clock),
    });
    for core in &cluster.cores {
        connect_all_ports(ic, core, &bus);
    }
    ic.link(
        &format!("{bus}.mem_side_ports"),
        &format!("{}.l2.cpu_side", cluster.name()),
    );
    debug!(cluster = cluster.id, size = %l2.size, assoc = l2.assoc, "added l2 cache");
    cluster.l2 = Some(l2);
}

/// Builds the shared L3 behind its crossbar, in front of the memory bus.
fn add_l3(ic: &mut Interconnect, clock: Frequency) -> CacheSpec {
    ic.add_bus(Bus {
        name: L3_BUS.to_string(),
        kind: BusKind::L3XBar {
            width: CACHE_XBAR_WIDTH,
        },
        clock: None,
    });
    ic.link(&format!("{L3_BUS}.mem_side_ports"), "l3.cpu_side");
    ic.link("l3.mem_side", &format!("{MEMBUS}.cpu_side_ports"));
    debug!(%clock, "added shared l3 cache");
    CacheHierarchyBuilder::build_l3(clock)
}

/// Connects a core's outward-facing ports to `bus`: its L1 and walker
/// caches' memory sides when it has them, its own ports otherwise.
fn connect_all_ports(ic: &mut Interconnect, core: &CoreSpec, bus: &str) {
    let path = &core.path;
    let ports = match &core.l1 {
        Some(l1) => {
            let mut ports = vec![format!("{path}.icache.mem_side"), format!("{path}.dcache.mem_side")];
            ports.push(match l1.walk_i {
                Some(_) => format!("{path}.itb_walker_cache.mem_side"),
                None => format!("{path}.mmu.itb_walker"),
            });
            ports.push(match l1.walk_d {
                Some(_) => format!("{path}.dtb_walker_cache.mem_side"),
                None => format!("{path}.mmu.dtb_walker"),
            });
            ports
        }
        None => vec![
            format!("{path}.icache_port"),
            format!("{path}.dcache_port"),
            format!("{path}.mmu.itb_walker"),
            format!("{path}.mmu.dtb_walker"),
        ],
    };
    let target = format!("{bus}.cpu_side_ports");
    for port in ports {
        ic.link(&port, &target);
    }
}

/// Connects a cluster to `bus` through its L2 if it has one, core by core
/// otherwise. Self-bridged clusters are left alone.
fn connect_mem_side(ic: &mut Interconnect, cluster: &ClusterSpec, bus: &str) {
    if cluster.l2.is_some() {
        ic.link(
            &format!("{}.l2.mem_side", cluster.name()),
            &format!("{bus}.cpu_side_ports"),
        );
    } else if cluster.core_model.is_self_bridged() {
        debug!(cluster = cluster.id, "self-bridged cluster, no memory-side links");
    } else {
        for core in &cluster.cores {
            connect_all_ports(ic, core, bus);
        }
    }
}

/// Re-checks the invariants a finished topology must hold.
fn verify(topology: &SystemTopology) -> Result<()> {
    let allocated = topology.allocated_mem_size();
    if allocated != topology.requested_mem_size.as_u64() {
        return Err(Error::invalid(
            "memory_ranges",
            format!(
                "ranges cover {allocated:#x} bytes, {:#x} requested",
                topology.requested_mem_size.as_u64()
            ),
        ));
    }

    let depth = topology.hierarchy_depth;
    for cluster in &topology.clusters {
        let has_l1 = cluster.cores.iter().any(|c| c.l1.is_some());
        if cluster.l2.is_some() && (depth < 2 || !topology.caches_enabled) {
            return Err(Error::invalid(
                "hierarchy_depth",
                format!("cluster {} has an L2 at depth {depth}", cluster.id),
            ));
        }
        if (has_l1 || cluster.l2.is_some()) && !cluster.requires_caches() {
            return Err(Error::invalid(
                "caches",
                format!("cluster {} bypasses the timing hierarchy but has caches", cluster.id),
            ));
        }
    }
    if topology.shared_l3.is_some() != (topology.caches_enabled && depth > 2) {
        return Err(Error::invalid(
            "hierarchy_depth",
            format!("shared L3 presence does not match depth {depth}"),
        ));
    }
    if topology.caches_enabled && topology.clusters.iter().all(|c| !c.requires_caches()) {
        warn!("caches enabled but no cluster uses the timing hierarchy");
    }
    Ok(())
}
