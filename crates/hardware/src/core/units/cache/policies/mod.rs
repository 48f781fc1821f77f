//! Cache Replacement Policies.
//!
//! Maps a requested policy to the descriptor one cache instance is built with.
//! The engine implements the policies; this module only selects and
//! parameterizes them.
//!
//! # Policies
//!
//! - `Lru`: Least Recently Used.
//! - `Bip`: Bimodal insertion; inserts at MRU with a small probability, LRU otherwise.
//! - `Sbip`: Starvation-aware BIP.
//! - `Lip`: LRU insertion.
//! - `Opt`: Offline-optimal emulation; forces an oversized cache geometry.
//! - `MlpLinear`: Memory-level-parallelism aware linear policy.
//! - `EmissaryLru`: LRU with a reserved set of preserved ways.

/// Bimodal insertion parameters.
pub mod bip;

/// Emissary-LRU way partitioning.
pub mod emissary;

use std::fmt;

use serde::Deserialize;
use tracing::warn;

pub use bip::DEFAULT_BYPASS_PROBABILITY;
pub use emissary::DEFAULT_PRESERVE_WAYS;

/// Policy families a cache may be configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "String")]
pub enum PolicyKind {
    /// Least Recently Used.
    #[default]
    Lru,
    /// Bimodal insertion.
    Bip,
    /// Starvation-aware bimodal insertion.
    Sbip,
    /// LRU insertion.
    Lip,
    /// Offline-optimal emulation.
    Opt,
    /// MLP-aware linear policy.
    MlpLinear,
    /// LRU with preserved ways.
    EmissaryLru,
}

impl PolicyKind {
    /// Maps a policy name to its kind.
    ///
    /// Matching is case-sensitive. `LRUEmissary` and `MLP` are accepted as
    /// alternative spellings; any other unrecognized name is LRU.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Emissary-LRU" | "LRUEmissary" => Self::EmissaryLru,
            "OPT" => Self::Opt,
            "LIP" => Self::Lip,
            "SBIP" => Self::Sbip,
            "BIP" => Self::Bip,
            "MLP-Linear" | "MLP" => Self::MlpLinear,
            "LRU" => Self::Lru,
            other => {
                warn!(policy = other, "unknown replacement policy, using LRU");
                Self::Lru
            }
        }
    }

    /// Canonical policy name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lru => "LRU",
            Self::Bip => "BIP",
            Self::Sbip => "SBIP",
            Self::Lip => "LIP",
            Self::Opt => "OPT",
            Self::MlpLinear => "MLP-Linear",
            Self::EmissaryLru => "Emissary-LRU",
        }
    }
}

impl From<String> for PolicyKind {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully parameterized replacement policy for one cache instance.
///
/// Each variant carries only the parameters of its own policy.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum CachePolicyConfig {
    /// Least Recently Used.
    #[default]
    Lru,
    /// Bimodal insertion.
    Bip {
        /// Percent chance (0-100) that an inserted line goes to the MRU position.
        bypass_probability: u8,
    },
    /// Starvation-aware bimodal insertion.
    Sbip,
    /// LRU insertion.
    Lip,
    /// Offline-optimal emulation.
    Opt,
    /// MLP-aware linear policy.
    MlpLinear,
    /// LRU with preserved ways.
    EmissaryLru {
        /// Ways reserved for long-term retention.
        preserve_ways: u32,
        /// Ways managed by plain LRU (`associativity - preserve_ways`).
        lru_ways: u32,
        /// Period, in cycles, at which the preservation history is flushed.
        flush_period_cycles: Option<u64>,
    },
}

impl CachePolicyConfig {
    /// Returns the policy family.
    pub const fn kind(&self) -> PolicyKind {
        match self {
            Self::Lru => PolicyKind::Lru,
            Self::Bip { .. } => PolicyKind::Bip,
            Self::Sbip => PolicyKind::Sbip,
            Self::Lip => PolicyKind::Lip,
            Self::Opt => PolicyKind::Opt,
            Self::MlpLinear => PolicyKind::MlpLinear,
            Self::EmissaryLru { .. } => PolicyKind::EmissaryLru,
        }
    }

    /// Engine class name of the policy.
    pub const fn engine_class(&self) -> &'static str {
        match self {
            Self::Lru => "LRURP",
            Self::Bip { .. } => "BIPRP",
            Self::Sbip => "SBIPRP",
            Self::Lip => "LIPRP",
            Self::Opt => "OPTRP",
            Self::MlpLinear => "MLPLINRP",
            Self::EmissaryLru { .. } => "LRUEmissaryRP",
        }
    }
}

/// Policy-specific knobs that may accompany a policy name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct PolicyKnobs {
    /// Emissary-LRU: preservation-history flush period in cycles.
    pub flush_period_cycles: Option<u64>,
    /// BIP: MRU-insertion probability in percent.
    pub bypass_probability: Option<u8>,
}

/// A policy parameter supplied for a policy kind that does not take it.
///
/// Tuning-only; the parameter is ignored and the kind's defaults apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("parameter `{parameter}` does not apply to the {policy} policy; ignored")]
pub struct PolicyParameterMismatch {
    /// Policy the parameter was supplied with.
    pub policy: PolicyKind,
    /// Name of the ignored parameter.
    pub parameter: &'static str,
}

/// Signal to the caller that the cache level's geometry must be replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryOverride {
    /// Replace size and associativity with the level's oracle baseline.
    OracleBaseline,
}

/// Result of selecting a policy for one cache instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicySelection {
    /// The configured policy.
    pub policy: CachePolicyConfig,
    /// Geometry override the caller must apply, if any.
    pub geometry: Option<GeometryOverride>,
    /// Parameters that were supplied but ignored.
    pub mismatches: Vec<PolicyParameterMismatch>,
}

/// Selects and parameterizes replacement policies.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplacementPolicySelector;

impl ReplacementPolicySelector {
    /// Selects a policy by name.
    ///
    /// See [`PolicyKind::from_name`] for the name mapping.
    pub fn select(
        name: &str,
        associativity: u32,
        preserve_ways: Option<u32>,
        knobs: &PolicyKnobs,
    ) -> PolicySelection {
        Self::select_kind(PolicyKind::from_name(name), associativity, preserve_ways, knobs)
    }

    /// Selects a policy of a known kind.
    ///
    /// Every call builds a fresh descriptor; parameters the kind does not
    /// take are reported in `mismatches`, logged, and dropped.
    pub fn select_kind(
        kind: PolicyKind,
        associativity: u32,
        preserve_ways: Option<u32>,
        knobs: &PolicyKnobs,
    ) -> PolicySelection {
        let mut mismatches = Vec::new();
        let mut reject = |parameter: &'static str, supplied: bool| {
            if supplied {
                let mismatch = PolicyParameterMismatch {
                    policy: kind,
                    parameter,
                };
                warn!("{mismatch}");
                mismatches.push(mismatch);
            }
        };

        if kind != PolicyKind::EmissaryLru {
            reject("preserve_ways", preserve_ways.is_some());
            reject("flush_period_cycles", knobs.flush_period_cycles.is_some());
        }
        if kind != PolicyKind::Bip {
            reject("bypass_probability", knobs.bypass_probability.is_some());
        }

        let (policy, geometry) = match kind {
            PolicyKind::Lru => (CachePolicyConfig::Lru, None),
            PolicyKind::Sbip => (CachePolicyConfig::Sbip, None),
            PolicyKind::Lip => (CachePolicyConfig::Lip, None),
            PolicyKind::MlpLinear => (CachePolicyConfig::MlpLinear, None),
            PolicyKind::Opt => (CachePolicyConfig::Opt, Some(GeometryOverride::OracleBaseline)),
            PolicyKind::Bip => (bip::configure(knobs.bypass_probability), None),
            PolicyKind::EmissaryLru => (
                emissary::configure(associativity, preserve_ways, knobs.flush_period_cycles),
                None,
            ),
        };

        PolicySelection {
            policy,
            geometry,
            mismatches,
        }
    }
}
