//! CPU model kinds.
//!
//! A cluster is built from one CPU model. The model decides how the core
//! talks to memory and therefore whether the timing cache hierarchy is
//! built for it at all:
//! 1. **Memory mode:** `atomic`, `timing`, or `atomic_noncaching` accesses.
//! 2. **Cache requirements:** Whether private caches and walk caches are instantiated.
//! 3. **Presets:** The cache templates a model ships with (the HPI model carries its own).

/// Out-of-order core feature toggles and their validated settings.
pub mod features;

use std::fmt;

use serde::Deserialize;

use crate::core::units::cache::CacheTemplates;

pub use features::{
    CacheReplMode, CoreFeatureSet, FeatureContext, FetchFeatures, InstructionLimits, O3Settings,
    StarvationFeatures,
};

/// How a CPU model issues memory accesses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryMode {
    /// Functional accesses that complete immediately; caches are bypassed.
    Atomic,
    /// Timed accesses that traverse the cache hierarchy.
    Timing,
    /// Accesses handled outside the engine's memory system (virtualized or external models).
    AtomicNoncaching,
}

impl fmt::Display for MemoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Atomic => "atomic",
            Self::Timing => "timing",
            Self::AtomicNoncaching => "atomic_noncaching",
        })
    }
}

/// CPU model implementations a cluster can be composed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuModel {
    /// Fast functional model.
    #[default]
    #[serde(alias = "AtomicSimpleCPU")]
    Atomic,
    /// Simple timing model.
    #[serde(alias = "TimingSimpleCPU")]
    Timing,
    /// In-order pipelined model.
    #[serde(alias = "MinorCPU")]
    Minor,
    /// High-performance in-order model with its own cache presets.
    #[serde(alias = "HPI")]
    Hpi,
    /// Detailed out-of-order model.
    #[serde(alias = "ooo", alias = "O3CPU", alias = "DerivO3CPU")]
    O3,
    /// Hardware-virtualized execution.
    #[serde(alias = "ArmV8KvmCPU")]
    Kvm,
    /// External fast model bridged into the system.
    #[serde(alias = "fast_model", alias = "FastModelCortexA76")]
    FastModel,
}

impl CpuModel {
    /// Returns the memory mode the model requires from the system.
    pub const fn memory_mode(self) -> MemoryMode {
        match self {
            Self::Atomic => MemoryMode::Atomic,
            Self::Timing | Self::Minor | Self::Hpi | Self::O3 => MemoryMode::Timing,
            Self::Kvm | Self::FastModel => MemoryMode::AtomicNoncaching,
        }
    }

    /// Returns `true` if cores of this model sit behind the timing cache hierarchy.
    pub const fn requires_caches(self) -> bool {
        matches!(self.memory_mode(), MemoryMode::Timing)
    }

    /// Returns `true` if the model's page-table walkers get their own caches.
    pub const fn requires_walk_caches(self) -> bool {
        matches!(self, Self::Minor | Self::Hpi | Self::O3)
    }

    /// Returns `true` for the detailed out-of-order model, the only model
    /// that accepts core feature toggles.
    pub const fn is_out_of_order(self) -> bool {
        matches!(self, Self::O3)
    }

    /// Returns `true` if the model bridges itself into the system and needs
    /// no memory-side wiring.
    pub const fn is_self_bridged(self) -> bool {
        matches!(self, Self::FastModel)
    }

    /// Returns the cache templates the model is composed with.
    pub fn cache_templates(self) -> CacheTemplates {
        match self {
            Self::Atomic | Self::Timing | Self::Minor | Self::O3 => CacheTemplates::classic(),
            Self::Hpi => CacheTemplates::hpi(),
            Self::Kvm | Self::FastModel => CacheTemplates::none(),
        }
    }

    /// Short lowercase tag used in object names (`atomic`, `timing`, `o3`, ...).
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Timing => "timing",
            Self::Minor => "minor",
            Self::Hpi => "hpi",
            Self::O3 => "o3",
            Self::Kvm => "kvm",
            Self::FastModel => "fastmodel",
        }
    }

    /// Engine class name the model is instantiated as.
    pub const fn engine_class(self) -> &'static str {
        match self {
            Self::Atomic => "AtomicSimpleCPU",
            Self::Timing => "TimingSimpleCPU",
            Self::Minor => "MinorCPU",
            Self::Hpi => "HPI",
            Self::O3 => "DerivO3CPU",
            Self::Kvm => "ArmV8KvmCPU",
            Self::FastModel => "FastModelCortexA76",
        }
    }
}

impl fmt::Display for CpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_class())
    }
}
