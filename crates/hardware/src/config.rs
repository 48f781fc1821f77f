//! Configuration system for system composition and run control.
//!
//! This module defines the typed configuration record a system is composed
//! from. It provides:
//! 1. **Defaults:** Baseline platform, memory, cluster, and run-loop constants.
//! 2. **Structures:** Hierarchical config for platform, clusters, switching, run loop, and boot.
//! 3. **Loading:** JSON parsing from a string or a file.
//!
//! Every field has a default, so `{}` is a valid configuration: one
//! single-core atomic cluster on the default platform with 2 GiB of memory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{ByteSize, Frequency, PlatformRegion, Result, Voltage};
use crate::core::CpuModel;
use crate::core::cpu::CoreFeatureSet;
use crate::core::units::cache::CacheRequests;
use crate::soc::cluster::{ClusterRequest, PmuRequest};
use crate::soc::platform::{Platform, PlatformKind};

/// Default configuration constants.
mod defaults {
    use crate::common::ByteSize;
    use crate::core::CpuModel;

    /// System memory size (2 GiB).
    pub const MEM_SIZE: ByteSize = ByteSize::gib(2);

    /// Deepest cache level built: L1, L2 and a shared L3.
    pub const HIERARCHY_DEPTH: u8 = 3;

    /// Cores per cluster.
    pub const CORES: usize = 1;

    /// Cluster clock in hertz (2 GHz).
    pub const CLUSTER_CLOCK_HZ: u64 = 2_000_000_000;

    /// Hardware threads per core.
    pub const THREADS_PER_CORE: u32 = 1;

    /// Fidelity order a run switches through.
    pub const FIDELITY_SEQUENCE: [CpuModel; 3] = [CpuModel::Atomic, CpuModel::Timing, CpuModel::O3];

    /// Output directory for statistics and checkpoints.
    pub const OUTDIR: &str = "m5out";

    /// Ticks simulated per warm-up quantum.
    pub const WARMUP_QUANTUM_TICKS: u64 = 250_000_000;

    /// Committed instructions that end warm-up when no count is configured.
    pub const WARMUP_THRESHOLD: u64 = 5_000_000;

    /// Kernel root device.
    pub const ROOT_DEVICE: &str = "/dev/vda";

    /// Kernel console device.
    pub const CONSOLE: &str = "ttyAMA0";

    /// Loops-per-jiffy the kernel is told, skipping delay calibration.
    pub const LPJ: u64 = 19_988_480;
}

/// Root configuration record.
///
/// # Examples
///
/// ```
/// use simtopo_core::config::SimConfig;
/// use simtopo_core::core::CpuModel;
///
/// let json = r#"{
///     "platform": "vexpress_gem5_v1",
///     "mem_size": "4GB",
///     "hierarchy_depth": 2,
///     "clusters": [
///         { "cores": 2, "cpu_model": "o3", "clock": "3GHz",
///           "caches": { "l1i": { "replacement_policy": "Emissary-LRU", "preserve_ways": 4 } } }
///     ]
/// }"#;
///
/// let config = SimConfig::from_json_str(json).unwrap();
/// assert_eq!(config.mem_size.as_u64(), 4 << 30);
/// assert_eq!(config.clusters[0].cpu_model, CpuModel::O3);
/// assert!(config.caches_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimConfig {
    /// Platform preset.
    #[serde(default)]
    pub platform: PlatformKind,

    /// Explicit memory regions; replaces the preset's regions when set.
    #[serde(default)]
    pub mem_regions: Option<Vec<PlatformRegion>>,

    /// System memory size.
    #[serde(default = "SimConfig::default_mem_size")]
    pub mem_size: ByteSize,

    /// Build the cache hierarchy; when false every cluster sits on the memory bus.
    #[serde(default = "SimConfig::default_caches_enabled")]
    pub caches_enabled: bool,

    /// Deepest cache level built (1, 2, or 3).
    #[serde(default = "SimConfig::default_hierarchy_depth")]
    pub hierarchy_depth: u8,

    /// CPU clusters, in socket order.
    #[serde(default = "SimConfig::default_clusters")]
    pub clusters: Vec<ClusterConfig>,

    /// CPU-model switching.
    #[serde(default)]
    pub switching: SwitchingConfig,

    /// Run loop.
    #[serde(default)]
    pub run: RunConfig,

    /// Kernel boot arguments.
    #[serde(default)]
    pub boot: BootConfig,
}

impl SimConfig {
    fn default_mem_size() -> ByteSize {
        defaults::MEM_SIZE
    }

    fn default_caches_enabled() -> bool {
        true
    }

    fn default_hierarchy_depth() -> u8 {
        defaults::HIERARCHY_DEPTH
    }

    fn default_clusters() -> Vec<ClusterConfig> {
        vec![ClusterConfig::default()]
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::common::Error::Json) for malformed
    /// documents or values that do not parse.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::common::Error::Io) if the file cannot be
    /// read, or the errors of [`SimConfig::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The platform the system is composed on, with configured regions
    /// replacing the preset's.
    pub fn platform(&self) -> Platform {
        let mut platform = Platform::preset(self.platform);
        if let Some(regions) = &self.mem_regions {
            platform.mem_regions = regions.clone();
        }
        platform
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            platform: PlatformKind::default(),
            mem_regions: None,
            mem_size: defaults::MEM_SIZE,
            caches_enabled: true,
            hierarchy_depth: defaults::HIERARCHY_DEPTH,
            clusters: Self::default_clusters(),
            switching: SwitchingConfig::default(),
            run: RunConfig::default(),
            boot: BootConfig::default(),
        }
    }
}

/// One CPU cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterConfig {
    /// Number of cores.
    #[serde(default = "ClusterConfig::default_cores")]
    pub cores: usize,

    /// CPU model the cluster is composed from.
    #[serde(default)]
    pub cpu_model: CpuModel,

    /// Cluster clock.
    #[serde(default = "ClusterConfig::default_clock")]
    pub clock: Frequency,

    /// Cluster voltage.
    #[serde(default)]
    pub voltage: Voltage,

    /// Cache overrides.
    #[serde(default)]
    pub caches: CacheRequests,

    /// Out-of-order feature toggles.
    #[serde(default)]
    pub features: CoreFeatureSet,

    /// Hardware threads per core.
    #[serde(default = "ClusterConfig::default_threads_per_core")]
    pub threads_per_core: u32,

    /// PMU interrupt numbers, one per core. No PMUs when unset.
    #[serde(default)]
    pub pmu_interrupts: Option<Vec<u32>>,

    /// Extra events registered with every PMU.
    #[serde(default)]
    pub pmu_events: Vec<String>,
}

impl ClusterConfig {
    fn default_cores() -> usize {
        defaults::CORES
    }

    fn default_clock() -> Frequency {
        Frequency(defaults::CLUSTER_CLOCK_HZ)
    }

    fn default_threads_per_core() -> u32 {
        defaults::THREADS_PER_CORE
    }

    /// The composition request for this cluster.
    pub fn to_request(&self, warmup_insts: Option<u64>) -> ClusterRequest {
        ClusterRequest {
            core_count: self.cores,
            clock: self.clock,
            voltage: self.voltage,
            core_model: self.cpu_model,
            caches: self.caches.clone(),
            features: self.features.clone(),
            warmup_insts,
            threads_per_core: self.threads_per_core,
            pmu: self.pmu_interrupts.as_ref().map(|interrupts| PmuRequest {
                interrupts: interrupts.clone(),
                events: self.pmu_events.clone(),
            }),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cores: defaults::CORES,
            cpu_model: CpuModel::default(),
            clock: Self::default_clock(),
            voltage: Voltage::default(),
            caches: CacheRequests::default(),
            features: CoreFeatureSet::default(),
            threads_per_core: defaults::THREADS_PER_CORE,
            pmu_interrupts: None,
            pmu_events: Vec::new(),
        }
    }
}

/// CPU-model switching.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwitchingConfig {
    /// Fidelity order; the first entry must equal every cluster's model.
    #[serde(default = "SwitchingConfig::default_sequence")]
    pub sequence: Vec<CpuModel>,

    /// Instruction cap applied to every switched-in core.
    #[serde(default)]
    pub max_insts: Option<u64>,

    /// Attach a checker core to every switched-in core.
    #[serde(default)]
    pub checker: bool,
}

impl SwitchingConfig {
    fn default_sequence() -> Vec<CpuModel> {
        defaults::FIDELITY_SEQUENCE.to_vec()
    }
}

impl Default for SwitchingConfig {
    fn default() -> Self {
        Self {
            sequence: Self::default_sequence(),
            max_insts: None,
            checker: false,
        }
    }
}

/// One phase of a phased run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhaseConfig {
    /// Fidelity every cluster runs at during the phase.
    pub fidelity: CpuModel,

    /// Tick budget of the phase; `None` runs until the workload exits.
    #[serde(default)]
    pub ticks: Option<u64>,
}

/// Run-loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Directory statistics and checkpoints are written to.
    #[serde(default = "RunConfig::default_outdir")]
    pub outdir: PathBuf,

    /// Committed instructions to warm up for; no warm-up when unset.
    #[serde(default)]
    pub warmup_insts: Option<u64>,

    /// Ticks simulated between warm-up progress checks.
    #[serde(default = "RunConfig::default_warmup_quantum_ticks")]
    pub warmup_quantum_ticks: u64,

    /// Warm-up threshold used when `warmup_insts` is zero.
    #[serde(default = "RunConfig::default_warmup_threshold")]
    pub warmup_threshold_default: u64,

    /// Checkpoint directory to restore from.
    #[serde(default)]
    pub restore: Option<PathBuf>,

    /// Step every cluster back to the first fidelity before a checkpoint.
    #[serde(default = "RunConfig::default_revert_before_checkpoint")]
    pub revert_before_checkpoint: bool,

    /// Phased fidelity schedule; empty runs at the first fidelity throughout.
    #[serde(default)]
    pub phases: Vec<PhaseConfig>,
}

impl RunConfig {
    fn default_outdir() -> PathBuf {
        PathBuf::from(defaults::OUTDIR)
    }

    fn default_warmup_quantum_ticks() -> u64 {
        defaults::WARMUP_QUANTUM_TICKS
    }

    fn default_warmup_threshold() -> u64 {
        defaults::WARMUP_THRESHOLD
    }

    fn default_revert_before_checkpoint() -> bool {
        true
    }

    /// Instruction count that ends warm-up, or `None` when no warm-up is configured.
    pub fn warmup_threshold(&self) -> Option<u64> {
        self.warmup_insts.map(|n| {
            if n == 0 {
                self.warmup_threshold_default
            } else {
                n
            }
        })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            outdir: Self::default_outdir(),
            warmup_insts: None,
            warmup_quantum_ticks: defaults::WARMUP_QUANTUM_TICKS,
            warmup_threshold_default: defaults::WARMUP_THRESHOLD,
            restore: None,
            revert_before_checkpoint: true,
            phases: Vec::new(),
        }
    }
}

/// Kernel boot arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BootConfig {
    /// Root filesystem device.
    #[serde(default = "BootConfig::default_root_device")]
    pub root_device: String,

    /// Console device.
    #[serde(default = "BootConfig::default_console")]
    pub console: String,

    /// Loops per jiffy.
    #[serde(default = "BootConfig::default_lpj")]
    pub lpj: u64,

    /// Extra arguments appended after the standard ones.
    #[serde(default)]
    pub extra: Vec<String>,
}

impl BootConfig {
    fn default_root_device() -> String {
        defaults::ROOT_DEVICE.to_string()
    }

    fn default_console() -> String {
        defaults::CONSOLE.to_string()
    }

    fn default_lpj() -> u64 {
        defaults::LPJ
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            root_device: Self::default_root_device(),
            console: Self::default_console(),
            lpj: defaults::LPJ,
            extra: Vec::new(),
        }
    }
}
