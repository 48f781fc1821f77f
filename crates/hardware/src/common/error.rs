//! Error definitions.
//!
//! This module defines every failure the composition layer can report. It provides:
//! 1. **Configuration errors:** Raised while composing a system; no topology is produced.
//! 2. **Run errors:** Raised while switching CPU models or checkpointing; the run aborts.
//! 3. **Classification:** `is_configuration` and `exit_code` for the caller's exit path.
//!
//! Non-fatal tuning problems (policy parameters supplied for the wrong policy)
//! are not errors; see
//! [`PolicyParameterMismatch`](crate::core::units::cache::policies::PolicyParameterMismatch).

use std::fmt;

use crate::core::cpu::CpuModel;
use crate::sim::engine::EngineError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reasons a CPU-model switch request is rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionFault {
    /// The target is not next to the current fidelity in the configured sequence.
    NotAdjacent {
        /// Fidelity the slots are currently on.
        from: CpuModel,
        /// Requested fidelity.
        to: CpuModel,
    },
    /// The requested model does not appear in the fidelity sequence.
    NotInSequence(CpuModel),
    /// Another batch for the same cluster has not completed.
    SwitchInFlight,
    /// A previous batch for the cluster failed mid-handoff.
    ClusterPoisoned,
    /// The batch does not cover every slot of the cluster exactly once.
    PartialBatch {
        /// Distinct slots named by the request.
        covered: usize,
        /// Slots in the cluster.
        slots: usize,
    },
    /// The request names a slot the cluster does not have.
    UnknownSlot(usize),
    /// The request asks for more than one target fidelity.
    MixedTargets,
    /// The cluster's slots are not all on the same fidelity.
    MixedFidelity,
    /// A batch was committed or aborted without holding its cluster's token.
    StaleBatch,
}

impl fmt::Display for TransitionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAdjacent { from, to } => {
                write!(f, "{from} -> {to} is not an adjacent step in the sequence")
            }
            Self::NotInSequence(model) => write!(f, "{model} is not in the fidelity sequence"),
            Self::SwitchInFlight => write!(f, "a switch for this cluster is already in flight"),
            Self::ClusterPoisoned => write!(f, "an earlier switch for this cluster was aborted"),
            Self::PartialBatch { covered, slots } => {
                write!(f, "batch covers {covered} of {slots} slots")
            }
            Self::UnknownSlot(slot) => write!(f, "no slot {slot} in cluster"),
            Self::MixedTargets => write!(f, "batch requests more than one target fidelity"),
            Self::MixedFidelity => write!(f, "slots are not on a common fidelity"),
            Self::StaleBatch => write!(f, "batch does not hold the cluster's switch token"),
        }
    }
}

/// Errors reported by composition and run control.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested memory does not fit in the platform's memory regions.
    #[error(
        "memory size {requested:#x} too big for platform capabilities ({available:#x} available)"
    )]
    InsufficientPlatformCapacity {
        /// Requested memory size in bytes.
        requested: u64,
        /// Total capacity of the platform regions in bytes.
        available: u64,
    },

    /// The cache hierarchy depth is outside `1..=3`.
    #[error("cache hierarchy depth {0} is outside 1..=3")]
    InvalidHierarchyDepth(u8),

    /// A cluster was requested with no cores.
    #[error("a CPU cluster needs at least one core")]
    EmptyCluster,

    /// A topology was assembled before any cluster was composed.
    #[error("system has no CPU clusters")]
    NoClusters,

    /// The PMU interrupt list does not match the cluster's core count.
    #[error("cluster {cluster}: {given} PMU interrupts for {cores} cores")]
    PmuInterruptCount {
        /// Cluster index.
        cluster: usize,
        /// Interrupts supplied.
        given: usize,
        /// Cores in the cluster.
        cores: usize,
    },

    /// A configuration field holds a value the layer cannot use.
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        reason: String,
    },

    /// A string could not be parsed into a unit-carrying value.
    #[error("invalid {what} `{value}`")]
    Parse {
        /// Kind of value that was expected.
        what: &'static str,
        /// Input that failed to parse.
        value: String,
    },

    /// The configuration document is not valid JSON for [`SimConfig`](crate::config::SimConfig).
    #[error("configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// A CPU-model switch was rejected.
    #[error("cluster {cluster}: unsupported switch transition: {fault}")]
    UnsupportedSwitchTransition {
        /// Cluster index.
        cluster: usize,
        /// Why the request was rejected.
        fault: TransitionFault,
    },

    /// A checkpoint was requested while a slot was not on the first fidelity.
    #[error("cluster {cluster} slot {slot} is on {active}; checkpoints require {required}")]
    CheckpointRequiresAtomic {
        /// Cluster index.
        cluster: usize,
        /// Slot index within the cluster.
        slot: usize,
        /// Fidelity the slot is on.
        active: CpuModel,
        /// Fidelity checkpoints must be taken on.
        required: CpuModel,
    },

    /// The simulation engine reported a failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Error {
    /// Builds a [`Error::Parse`] for `value`.
    pub fn parse(what: &'static str, value: &str) -> Self {
        Self::Parse {
            what,
            value: value.to_string(),
        }
    }

    /// Builds an [`Error::InvalidConfig`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Builds an [`Error::UnsupportedSwitchTransition`].
    pub const fn transition(cluster: usize, fault: TransitionFault) -> Self {
        Self::UnsupportedSwitchTransition { cluster, fault }
    }

    /// Returns `true` for errors raised while composing a system, before any
    /// topology is handed to the engine.
    pub const fn is_configuration(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedSwitchTransition { .. }
                | Self::CheckpointRequiresAtomic { .. }
                | Self::Engine(_)
        )
    }

    /// Process exit code for this error: 1 for configuration errors, 2 for
    /// errors that abort a run.
    pub const fn exit_code(&self) -> i32 {
        if self.is_configuration() { 1 } else { 2 }
    }
}
