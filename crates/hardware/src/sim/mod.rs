//! Simulation control.
//!
//! Everything that happens once a topology exists: the engine interface,
//! CPU-model switching, the run loop, and the kernel command line.

/// Simulation engine interface.
pub mod engine;

/// Run driver: warm-up, phases, and checkpoints.
pub mod runner;

/// CPU-model switching between fidelities.
pub mod switch;

/// Kernel boot arguments.
pub mod workload;

pub use engine::{EngineError, ExitEvent, SimulationEngine, StatsSnapshot};
pub use runner::{Phase, RunOptions, RunOutcome, SimulationRunner, run_from_config};
pub use switch::{
    CoreInstance, CoreSlot, CpuModelSwitchController, FidelitySequence, SharedCoreState,
    SwitchBatch, SwitchOptions, SwitchPair, SwitchableCoreSet,
};
pub use workload::BootArgs;
