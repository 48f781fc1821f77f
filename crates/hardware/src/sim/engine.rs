//! Simulation engine interface.
//!
//! This module defines the seam between the composition layer and the
//! engine that executes instructions and models timing. It provides:
//! 1. **Lifecycle:** Instantiation from a topology, optionally restoring a checkpoint.
//! 2. **Execution:** Tick-bounded simulation returning the event that stopped it.
//! 3. **State:** Checkpointing, CPU handoff, and statistics.
//!
//! The crate never executes anything itself; a real engine or a test double
//! implements [`SimulationEngine`].

use std::path::Path;

use crate::common::constants::{CAUSE_CHECKPOINT, CAUSE_LIMIT_REACHED};
use crate::sim::switch::SwitchBatch;
use crate::soc::SystemTopology;

/// Why `simulate` returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitEvent {
    /// Cause string reported by the engine.
    pub cause: String,
    /// Exit code carried by the event.
    pub code: i32,
}

impl ExitEvent {
    /// Creates an exit event.
    pub fn new(cause: impl Into<String>, code: i32) -> Self {
        Self {
            cause: cause.into(),
            code,
        }
    }

    /// The tick budget ran out.
    pub fn limit_reached() -> Self {
        Self::new(CAUSE_LIMIT_REACHED, 0)
    }

    /// The workload asked for a checkpoint.
    pub fn checkpoint_request() -> Self {
        Self::new(CAUSE_CHECKPOINT, 0)
    }

    /// Returns `true` if the tick budget ran out.
    pub fn is_limit_reached(&self) -> bool {
        self.cause == CAUSE_LIMIT_REACHED
    }

    /// Returns `true` if the workload asked for a checkpoint.
    pub fn is_checkpoint_request(&self) -> bool {
        self.cause == CAUSE_CHECKPOINT
    }
}

/// Statistics read back from the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Instructions committed since the last reset.
    pub sim_insts: u64,
}

/// A failure reported by the engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("simulation engine: {message}")]
pub struct EngineError {
    /// Engine-provided description.
    pub message: String,
}

impl EngineError {
    /// Creates an engine error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The external simulation engine.
pub trait SimulationEngine {
    /// Builds the engine's objects for `topology`, booting the kernel with
    /// `cmdline` and restoring `restore` if given.
    fn instantiate(
        &mut self,
        topology: &SystemTopology,
        cmdline: &str,
        restore: Option<&Path>,
    ) -> Result<(), EngineError>;

    /// Runs until an exit event, or for at most `tick_limit` ticks.
    fn simulate(&mut self, tick_limit: Option<u64>) -> Result<ExitEvent, EngineError>;

    /// Writes a checkpoint into `dir`.
    fn checkpoint(&mut self, dir: &Path) -> Result<(), EngineError>;

    /// Current simulated tick.
    fn cur_tick(&self) -> u64;

    /// Hands every slot of `batch` from its outgoing instance to its incoming one.
    fn switch_cpus(&mut self, batch: &SwitchBatch) -> Result<(), EngineError>;

    /// Writes the current statistics and returns the counters the run loop reads.
    fn dump_stats(&mut self) -> Result<StatsSnapshot, EngineError>;

    /// Resets statistics.
    fn reset_stats(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}
