//! Cache descriptors and the cache hierarchy builder.
//!
//! This module describes each cache instance the engine will build: its
//! geometry, latencies, miss-handling resources, and replacement policy. It
//! provides:
//! 1. **Presets:** The classic L1I/L1D/walk/L2/L3 set and the HPI model's set.
//! 2. **Requests:** Per-level overrides (policy, size, associativity) from configuration.
//! 3. **Builder:** Per-core L1 and walk caches, per-cluster L2, and the shared L3.

/// Cache replacement policy selection.
pub mod policies;

use std::fmt;

use serde::Deserialize;
use tracing::debug;

use self::policies::{
    CachePolicyConfig, GeometryOverride, PolicyKind, PolicyKnobs, PolicyParameterMismatch,
    ReplacementPolicySelector,
};
use crate::common::{ByteSize, Frequency};
use crate::core::cpu::CpuModel;

/// Position of a cache in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLevel {
    /// Private L1 instruction cache.
    L1I,
    /// Private L1 data cache.
    L1D,
    /// Private page-table walker cache.
    Walk,
    /// Cluster-shared L2.
    L2,
    /// System-shared L3.
    L3,
    /// I/O coherence cache between the I/O bus and memory.
    Io,
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::L1I => "l1i",
            Self::L1D => "l1d",
            Self::Walk => "walk",
            Self::L2 => "l2",
            Self::L3 => "l3",
            Self::Io => "io",
        })
    }
}

/// Inclusion behavior of a cache relative to the levels above it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Clusivity {
    /// Lines filled from below are also kept here.
    #[default]
    MostlyInclusive,
    /// Lines moved up are dropped from here.
    MostlyExclusive,
}

/// Description of one cache instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheSpec {
    /// Hierarchy position.
    pub level: CacheLevel,
    /// Capacity.
    pub size: ByteSize,
    /// Associativity (ways).
    pub assoc: u32,
    /// Tag lookup latency in cycles.
    pub tag_latency: u32,
    /// Data access latency in cycles.
    pub data_latency: u32,
    /// Response latency in cycles.
    pub response_latency: u32,
    /// Outstanding miss slots.
    pub mshrs: u32,
    /// Requests that may wait on one miss slot.
    pub tgts_per_mshr: u32,
    /// Write buffer depth.
    pub write_buffers: u32,
    /// Write clean lines back on eviction.
    pub writeback_clean: bool,
    /// Inclusion behavior.
    pub clusivity: Clusivity,
    /// Replacement policy.
    pub policy: CachePolicyConfig,
    /// Clock domain, for caches not clocked with their cluster.
    pub clock: Option<Frequency>,
}

impl CacheSpec {
    /// Common shape of the private caches in the classic preset set.
    const fn private(level: CacheLevel, size: ByteSize) -> Self {
        Self {
            level,
            size,
            assoc: 8,
            tag_latency: 2,
            data_latency: 2,
            response_latency: 0,
            mshrs: 16,
            tgts_per_mshr: 20,
            write_buffers: 16,
            writeback_clean: false,
            clusivity: Clusivity::MostlyInclusive,
            policy: CachePolicyConfig::Lru,
            clock: None,
        }
    }

    /// 32 KiB 8-way L1 instruction cache.
    pub const fn l1i() -> Self {
        Self::private(CacheLevel::L1I, ByteSize::kib(32))
    }

    /// 64 KiB 8-way L1 data cache.
    pub const fn l1d() -> Self {
        Self::private(CacheLevel::L1D, ByteSize::kib(64))
    }

    /// 32 KiB 8-way page-table walker cache.
    pub const fn walk() -> Self {
        Self::private(CacheLevel::Walk, ByteSize::kib(32))
    }

    /// 1 MiB 16-way cluster L2.
    pub const fn l2() -> Self {
        Self {
            level: CacheLevel::L2,
            size: ByteSize::mib(1),
            assoc: 16,
            tag_latency: 10,
            data_latency: 10,
            response_latency: 0,
            mshrs: 32,
            tgts_per_mshr: 20,
            write_buffers: 32,
            writeback_clean: true,
            clusivity: Clusivity::MostlyInclusive,
            policy: CachePolicyConfig::Lru,
            clock: None,
        }
    }

    /// 2 MiB 16-way mostly-exclusive shared L3.
    pub const fn l3() -> Self {
        Self {
            level: CacheLevel::L3,
            size: ByteSize::mib(2),
            assoc: 16,
            tag_latency: 20,
            data_latency: 20,
            response_latency: 0,
            mshrs: 64,
            tgts_per_mshr: 20,
            write_buffers: 64,
            writeback_clean: false,
            clusivity: Clusivity::MostlyExclusive,
            policy: CachePolicyConfig::Lru,
            clock: None,
        }
    }

    /// I/O cache in front of memory for device DMA.
    pub const fn io() -> Self {
        Self {
            level: CacheLevel::Io,
            size: ByteSize::kib(1),
            assoc: 8,
            tag_latency: 50,
            data_latency: 50,
            response_latency: 50,
            mshrs: 20,
            tgts_per_mshr: 12,
            write_buffers: 8,
            writeback_clean: false,
            clusivity: Clusivity::MostlyInclusive,
            policy: CachePolicyConfig::Lru,
            clock: None,
        }
    }

    /// HPI L1 instruction cache: 32 KiB, 2-way.
    pub const fn hpi_icache() -> Self {
        Self {
            level: CacheLevel::L1I,
            size: ByteSize::kib(32),
            assoc: 2,
            tag_latency: 1,
            data_latency: 1,
            response_latency: 1,
            mshrs: 2,
            tgts_per_mshr: 8,
            write_buffers: 8,
            writeback_clean: false,
            clusivity: Clusivity::MostlyInclusive,
            policy: CachePolicyConfig::Lru,
            clock: None,
        }
    }

    /// HPI L1 data cache: 32 KiB, 4-way.
    pub const fn hpi_dcache() -> Self {
        Self {
            level: CacheLevel::L1D,
            size: ByteSize::kib(32),
            assoc: 4,
            tag_latency: 1,
            data_latency: 1,
            response_latency: 1,
            mshrs: 4,
            tgts_per_mshr: 8,
            write_buffers: 4,
            writeback_clean: false,
            clusivity: Clusivity::MostlyInclusive,
            policy: CachePolicyConfig::Lru,
            clock: None,
        }
    }

    /// HPI walker cache: 1 KiB, 8-way.
    pub const fn hpi_walk() -> Self {
        Self {
            level: CacheLevel::Walk,
            size: ByteSize::kib(1),
            assoc: 8,
            tag_latency: 4,
            data_latency: 4,
            response_latency: 4,
            mshrs: 6,
            tgts_per_mshr: 8,
            write_buffers: 16,
            writeback_clean: false,
            clusivity: Clusivity::MostlyInclusive,
            policy: CachePolicyConfig::Lru,
            clock: None,
        }
    }

    /// HPI L2: 1 MiB, 16-way.
    pub const fn hpi_l2() -> Self {
        Self {
            level: CacheLevel::L2,
            size: ByteSize::mib(1),
            assoc: 16,
            tag_latency: 13,
            data_latency: 13,
            response_latency: 5,
            mshrs: 4,
            tgts_per_mshr: 8,
            write_buffers: 16,
            writeback_clean: true,
            clusivity: Clusivity::MostlyInclusive,
            policy: CachePolicyConfig::Lru,
            clock: None,
        }
    }

    /// Oracle-baseline geometry for this level: `(size, assoc)`.
    ///
    /// Used in analysis mode only; the requested size is discarded.
    const fn oracle_baseline(level: CacheLevel) -> (ByteSize, u32) {
        match level {
            CacheLevel::L2 | CacheLevel::L3 => (ByteSize::mib(2), 32),
            CacheLevel::L1I | CacheLevel::L1D | CacheLevel::Walk | CacheLevel::Io => {
                (ByteSize::kib(1024), 256)
            }
        }
    }

    /// Replaces the geometry with the level's oracle baseline.
    pub const fn apply_oracle_baseline(&mut self) {
        let (size, assoc) = Self::oracle_baseline(self.level);
        self.size = size;
        self.assoc = assoc;
    }

    /// Number of sets for a given line size.
    pub const fn sets(&self, line_bytes: u32) -> u64 {
        let per_set = self.assoc as u64 * line_bytes as u64;
        if per_set == 0 { 0 } else { self.size.0 / per_set }
    }
}

/// The cache presets a core model is composed with. `None` means the model
/// has no cache at that position.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CacheTemplates {
    /// L1 instruction cache.
    pub l1i: Option<CacheSpec>,
    /// L1 data cache.
    pub l1d: Option<CacheSpec>,
    /// Walker cache (instantiated twice per core: instruction and data side).
    pub walk: Option<CacheSpec>,
    /// Cluster L2.
    pub l2: Option<CacheSpec>,
}

impl CacheTemplates {
    /// Classic preset set.
    pub const fn classic() -> Self {
        Self {
            l1i: Some(CacheSpec::l1i()),
            l1d: Some(CacheSpec::l1d()),
            walk: Some(CacheSpec::walk()),
            l2: Some(CacheSpec::l2()),
        }
    }

    /// HPI preset set.
    pub const fn hpi() -> Self {
        Self {
            l1i: Some(CacheSpec::hpi_icache()),
            l1d: Some(CacheSpec::hpi_dcache()),
            walk: Some(CacheSpec::hpi_walk()),
            l2: Some(CacheSpec::hpi_l2()),
        }
    }

    /// No caches.
    pub const fn none() -> Self {
        Self {
            l1i: None,
            l1d: None,
            walk: None,
            l2: None,
        }
    }
}

/// Requested overrides for one cache level.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CacheLevelRequest {
    /// Replacement policy; `None` is plain LRU.
    pub replacement_policy: Option<PolicyKind>,
    /// Emissary-LRU preserved ways.
    pub preserve_ways: Option<u32>,
    /// Policy-specific knobs.
    #[serde(flatten)]
    pub knobs: PolicyKnobs,
    /// Capacity override.
    pub size: Option<ByteSize>,
    /// Associativity override.
    pub assoc: Option<u32>,
}

impl CacheLevelRequest {
    /// Returns `true` if the level asks for the given policy.
    pub fn uses(&self, kind: PolicyKind) -> bool {
        self.replacement_policy == Some(kind)
    }
}

/// Requested overrides for every level of a cluster's hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CacheRequests {
    /// L1 instruction cache.
    pub l1i: CacheLevelRequest,
    /// L1 data cache.
    pub l1d: CacheLevelRequest,
    /// Cluster L2.
    pub l2: CacheLevelRequest,
    /// Analysis mode: oracle-baseline geometry for L1I and L2.
    pub opt: bool,
}

impl CacheRequests {
    /// Returns `true` if L1I or L2 uses Emissary-LRU.
    pub fn uses_emissary(&self) -> bool {
        self.l1i.uses(PolicyKind::EmissaryLru) || self.l2.uses(PolicyKind::EmissaryLru)
    }
}

/// Private caches of one core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct L1Caches {
    /// L1 instruction cache.
    pub icache: CacheSpec,
    /// L1 data cache.
    pub dcache: CacheSpec,
    /// Instruction-side walker cache.
    pub walk_i: Option<CacheSpec>,
    /// Data-side walker cache.
    pub walk_d: Option<CacheSpec>,
    /// Policy parameters ignored building the L1I and L1D, tagged by level.
    pub mismatches: Vec<(CacheLevel, PolicyParameterMismatch)>,
}

/// A built cache plus the policy parameters that were ignored building it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltCache {
    /// The cache.
    pub spec: CacheSpec,
    /// Ignored policy parameters.
    pub mismatches: Vec<PolicyParameterMismatch>,
}

impl BuiltCache {
    /// Ignored parameters paired with the cache's level.
    pub fn tagged_mismatches(
        &self,
    ) -> impl Iterator<Item = (CacheLevel, PolicyParameterMismatch)> + '_ {
        self.mismatches.iter().map(|&m| (self.spec.level, m))
    }
}

/// Builds cache instances for one cluster.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheHierarchyBuilder;

impl CacheHierarchyBuilder {
    /// Applies a level request to a template.
    ///
    /// Size and associativity overrides apply first, then the policy is
    /// selected against the resulting associativity. An OPT policy or
    /// `force_baseline` replaces the geometry with the oracle baseline.
    pub fn configure(
        template: &CacheSpec,
        request: &CacheLevelRequest,
        force_baseline: bool,
    ) -> BuiltCache {
        let mut spec = template.clone();
        if let Some(size) = request.size {
            spec.size = size;
        }
        if let Some(assoc) = request.assoc {
            spec.assoc = assoc;
        }

        let selection = ReplacementPolicySelector::select_kind(
            request.replacement_policy.unwrap_or_default(),
            spec.assoc,
            request.preserve_ways,
            &request.knobs,
        );
        spec.policy = selection.policy;

        if force_baseline || selection.geometry == Some(GeometryOverride::OracleBaseline) {
            spec.apply_oracle_baseline();
            debug!(cache = %spec.level, size = %spec.size, assoc = spec.assoc, "oracle baseline geometry");
        }

        BuiltCache {
            spec,
            mismatches: selection.mismatches,
        }
    }

    /// Builds one core's L1 instruction, data, and walker caches.
    ///
    /// Returns `None` when the model bypasses the timing hierarchy or has no
    /// L1 templates. Walker caches are built only for models that cache
    /// page-table walks.
    pub fn build_l1(
        model: CpuModel,
        templates: &CacheTemplates,
        requests: &CacheRequests,
    ) -> Option<L1Caches> {
        if !model.requires_caches() {
            return None;
        }
        let (Some(l1i), Some(l1d)) = (&templates.l1i, &templates.l1d) else {
            return None;
        };

        let icache = Self::configure(l1i, &requests.l1i, requests.opt);
        let dcache = Self::configure(l1d, &requests.l1d, false);
        let mismatches = icache
            .tagged_mismatches()
            .chain(dcache.tagged_mismatches())
            .collect();
        let walk = templates
            .walk
            .as_ref()
            .filter(|_| model.requires_walk_caches());

        Some(L1Caches {
            icache: icache.spec,
            dcache: dcache.spec,
            walk_i: walk.cloned(),
            walk_d: walk.cloned(),
            mismatches,
        })
    }

    /// Builds a cluster's L2.
    ///
    /// Returns `None` when the model bypasses the timing hierarchy or has no
    /// L2 template. OPT requested for the L1I, or analysis mode, also puts
    /// the L2 on its oracle baseline.
    pub fn build_l2(
        model: CpuModel,
        templates: &CacheTemplates,
        requests: &CacheRequests,
    ) -> Option<BuiltCache> {
        if !model.requires_caches() {
            return None;
        }
        let template = templates.l2.as_ref()?;
        let force = requests.opt || requests.l1i.uses(PolicyKind::Opt);
        Some(Self::configure(template, &requests.l2, force))
    }

    /// Builds the shared L3 in the given clock domain.
    pub fn build_l3(clock: Frequency) -> CacheSpec {
        CacheSpec {
            clock: Some(clock),
            ..CacheSpec::l3()
        }
    }
}
