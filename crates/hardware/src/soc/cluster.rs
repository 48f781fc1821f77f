//! CPU cluster composition.
//!
//! This module builds homogeneous CPU clusters and registers them with a
//! [`SystemBuilder`]. It performs:
//! 1. **Domains:** One clock and voltage domain shared by every core of the cluster.
//! 2. **Cores:** System-wide CPU ids, socket ids, thread contexts and interrupt controllers.
//! 3. **Features:** Out-of-order feature toggles, validated once per core.
//! 4. **PMUs:** One performance-monitoring unit per core, wired after caches exist.

use tracing::{debug, warn};

use crate::common::constants::SPI_BASE;
use crate::common::{Error, Frequency, Result, Voltage};
use crate::core::CpuModel;
use crate::core::cpu::{CoreFeatureSet, FeatureContext, O3Settings};
use crate::core::units::cache::policies::PolicyParameterMismatch;
use crate::core::units::cache::{CacheLevel, CacheRequests, CacheSpec, CacheTemplates, L1Caches};
use crate::soc::builder::SystemBuilder;

/// Index of a cluster within its system.
pub type ClusterId = usize;

/// Cores a single fast-model cluster can hold.
const FAST_MODEL_MAX_CORES: usize = 4;

/// A PMU interrupt line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PmuInterrupt {
    /// Private peripheral interrupt.
    Ppi(u32),
    /// Shared peripheral interrupt.
    Spi(u32),
}

impl PmuInterrupt {
    /// Classifies an interrupt number: below 32 is a PPI, the rest are SPIs.
    pub const fn from_number(num: u32) -> Self {
        if num < SPI_BASE {
            Self::Ppi(num)
        } else {
            Self::Spi(num)
        }
    }

    /// The interrupt number.
    pub const fn number(self) -> u32 {
        match self {
            Self::Ppi(n) | Self::Spi(n) => n,
        }
    }
}

/// Objects a PMU's architectural events are attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchEventSource {
    /// The core's commit and cycle probes.
    Core,
    /// Instruction TLB.
    Itb,
    /// Data TLB.
    Dtb,
    /// L1 instruction cache.
    ICache,
    /// L1 data cache.
    DCache,
    /// Cluster L2.
    L2,
}

/// Performance-monitoring unit of one core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PmuSpec {
    /// Interrupt line.
    pub interrupt: PmuInterrupt,
    /// Sources of the architectural events.
    pub arch_sources: Vec<ArchEventSource>,
    /// Additional events registered after the architectural ones.
    pub events: Vec<String>,
}

/// PMUs requested for a cluster: one interrupt per core, in core order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PmuRequest {
    /// Interrupt numbers.
    pub interrupts: Vec<u32>,
    /// Additional events for every PMU.
    pub events: Vec<String>,
}

/// Interrupt controller CPU interface of one core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterruptController {
    /// Object name.
    pub name: String,
    /// Memory-mapped CPU interface base, if the platform has one.
    pub cpu_addr: Option<u64>,
}

/// One core of a cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreSpec {
    /// Object path, e.g. `cpu_cluster0.cpus1`.
    pub path: String,
    /// System-wide CPU id.
    pub cpu_id: usize,
    /// Socket id; equal to the cluster's index.
    pub socket_id: usize,
    /// Hardware thread contexts.
    pub threads: u32,
    /// Interrupt controller interface.
    pub interrupt_controller: InterruptController,
    /// Private caches; `None` until a hierarchy is assembled, and always
    /// `None` for models that bypass the timing hierarchy.
    pub l1: Option<L1Caches>,
    /// Out-of-order settings; only the detailed model has them.
    pub o3: Option<O3Settings>,
    /// Performance-monitoring unit.
    pub pmu: Option<PmuSpec>,
}

/// A homogeneous cluster of cores.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterSpec {
    /// Index within the system.
    pub id: ClusterId,
    /// Model every core is composed from.
    pub core_model: CpuModel,
    /// Cluster clock.
    pub clock: Frequency,
    /// Cluster voltage.
    pub voltage: Voltage,
    /// Cores, in CPU-id order.
    pub cores: Vec<CoreSpec>,
    /// Cache presets of the core model.
    pub templates: CacheTemplates,
    /// Requested cache overrides.
    pub requests: CacheRequests,
    /// Cluster L2; present only for depth two or more on a timing model.
    pub l2: Option<CacheSpec>,
    /// PMUs to wire once the hierarchy is built.
    pub pmu_request: Option<PmuRequest>,
    /// Replacement-policy parameters ignored building the cluster's caches.
    pub policy_mismatches: Vec<(CacheLevel, PolicyParameterMismatch)>,
}

impl ClusterSpec {
    /// Object name of the cluster.
    pub fn name(&self) -> String {
        format!("cpu_cluster{}", self.id)
    }

    /// Object name of the cluster's L2 crossbar.
    pub fn l2_bus_name(&self) -> String {
        format!("{}.toL2Bus", self.name())
    }

    /// Returns `true` if the cluster's cores sit behind the timing hierarchy.
    pub const fn requires_caches(&self) -> bool {
        self.core_model.requires_caches()
    }

    /// Number of cores.
    pub fn num_cores(&self) -> usize {
        self.cores.len()
    }
}

/// Parameters of one cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterRequest {
    /// Number of cores; must be non-zero.
    pub core_count: usize,
    /// Cluster clock.
    pub clock: Frequency,
    /// Cluster voltage.
    pub voltage: Voltage,
    /// CPU model.
    pub core_model: CpuModel,
    /// Cache overrides.
    pub caches: CacheRequests,
    /// Out-of-order feature toggles.
    pub features: CoreFeatureSet,
    /// Warm-up instructions added to instruction caps.
    pub warmup_insts: Option<u64>,
    /// Thread contexts per core.
    pub threads_per_core: u32,
    /// PMUs, if any.
    pub pmu: Option<PmuRequest>,
}

impl ClusterRequest {
    /// A single-threaded cluster with default caches and features.
    pub fn new(core_count: usize, core_model: CpuModel, clock: Frequency) -> Self {
        Self {
            core_count,
            clock,
            voltage: Voltage::default(),
            core_model,
            caches: CacheRequests::default(),
            features: CoreFeatureSet::default(),
            warmup_insts: None,
            threads_per_core: 1,
            pmu: None,
        }
    }
}

/// Builds clusters into a [`SystemBuilder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuClusterComposer;

impl CpuClusterComposer {
    /// Composes a cluster and registers it with `system`.
    ///
    /// CPU ids continue from the cores already registered; the socket id is
    /// the cluster's index. Feature toggles are validated once per core and
    /// only for the out-of-order model.
    ///
    /// # Errors
    ///
    /// * [`Error::EmptyCluster`] for a zero core count.
    /// * [`Error::InvalidConfig`] for a zero thread count, too many fast-model
    ///   cores, or invalid feature toggles.
    pub fn compose(system: &mut SystemBuilder, request: ClusterRequest) -> Result<ClusterId> {
        if request.core_count == 0 {
            return Err(Error::EmptyCluster);
        }
        if request.threads_per_core == 0 {
            return Err(Error::invalid(
                "threads_per_core",
                "must be greater than zero",
            ));
        }
        if request.core_model.is_self_bridged() && request.core_count > FAST_MODEL_MAX_CORES {
            return Err(Error::invalid(
                "cores",
                format!(
                    "a fast-model cluster holds at most {FAST_MODEL_MAX_CORES} cores, got {}",
                    request.core_count
                ),
            ));
        }

        let o3 = if request.core_model.is_out_of_order() {
            let ctx = FeatureContext {
                warmup_insts: request.warmup_insts,
                analysis_opt: request.caches.opt,
                emissary_in_use: request.caches.uses_emissary(),
            };
            Some(request.features.resolve(ctx)?)
        } else {
            if !request.features.is_default() {
                warn!(
                    model = %request.core_model,
                    "core feature toggles apply only to the out-of-order model; ignored"
                );
            }
            None
        };

        let id = system.num_clusters();
        let first_cpu = system.num_cpus();
        let cpu_addr = system.platform().gic_cpu_addr;

        let cores = (0..request.core_count)
            .map(|idx| {
                let path = format!("cpu_cluster{id}.cpus{idx}");
                CoreSpec {
                    interrupt_controller: InterruptController {
                        name: format!("{path}.interrupts"),
                        cpu_addr,
                    },
                    path,
                    cpu_id: first_cpu + idx,
                    socket_id: id,
                    threads: request.threads_per_core,
                    l1: None,
                    o3: o3.clone(),
                    pmu: None,
                }
            })
            .collect();

        let cluster = ClusterSpec {
            id,
            core_model: request.core_model,
            clock: request.clock,
            voltage: request.voltage,
            cores,
            templates: request.core_model.cache_templates(),
            requests: request.caches,
            l2: None,
            pmu_request: request.pmu,
            policy_mismatches: Vec::new(),
        };

        debug!(
            cluster = id,
            model = %cluster.core_model,
            cores = cluster.num_cores(),
            clock = %cluster.clock,
            "composed cpu cluster"
        );
        Ok(system.register_cluster(cluster))
    }

    /// Attaches one PMU per core of `cluster`.
    ///
    /// Interrupts are matched to cores in order. Architectural events are
    /// attached to the core, both TLBs, and whichever of the L1 caches and
    /// the cluster L2 exist at the time of the call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PmuInterruptCount`] unless exactly one interrupt is
    /// given per core.
    pub fn add_pmus(cluster: &mut ClusterSpec, interrupts: &[u32], events: &[String]) -> Result<()> {
        if interrupts.len() != cluster.cores.len() {
            return Err(Error::PmuInterruptCount {
                cluster: cluster.id,
                given: interrupts.len(),
                cores: cluster.cores.len(),
            });
        }

        let has_l2 = cluster.l2.is_some();
        for (core, &num) in cluster.cores.iter_mut().zip(interrupts) {
            let mut arch_sources = vec![
                ArchEventSource::Core,
                ArchEventSource::Itb,
                ArchEventSource::Dtb,
            ];
            if core.l1.is_some() {
                arch_sources.extend([ArchEventSource::ICache, ArchEventSource::DCache]);
            }
            if has_l2 {
                arch_sources.push(ArchEventSource::L2);
            }
            core.pmu = Some(PmuSpec {
                interrupt: PmuInterrupt::from_number(num),
                arch_sources,
                events: events.to_vec(),
            });
        }
        debug!(cluster = cluster.id, "attached pmus");
        Ok(())
    }
}
