//! Run driver.
//!
//! This module drives a composed system through the engine. It performs:
//! 1. **Warm-up:** Fixed tick quanta until the committed instruction count
//!    reaches the threshold, then a statistics reset.
//! 2. **Phases:** An optional schedule of fidelities, each with a tick budget.
//! 3. **Checkpoints:** Every checkpoint exit event writes `<outdir>/cpt.<tick>`,
//!    after stepping every cluster back to the first fidelity.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::common::constants::CHECKPOINT_DIR_PREFIX;
use crate::common::{Error, Result};
use crate::config::{RunConfig, SimConfig};
use crate::core::CpuModel;
use crate::sim::engine::{ExitEvent, SimulationEngine, StatsSnapshot};
use crate::sim::switch::{CpuModelSwitchController, FidelitySequence, SwitchOptions};
use crate::sim::workload::BootArgs;
use crate::soc::{SystemTopology, build_topology};

/// One phase of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase {
    /// Fidelity every cluster runs at.
    pub fidelity: CpuModel,
    /// Tick budget; `None` runs until the workload exits.
    pub ticks: Option<u64>,
}

/// Run-loop settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Directory checkpoints are written to.
    pub outdir: PathBuf,
    /// Committed instructions that end warm-up; no warm-up when `None`.
    pub warmup_threshold: Option<u64>,
    /// Ticks per warm-up quantum.
    pub warmup_quantum_ticks: u64,
    /// Checkpoint to restore from.
    pub restore: Option<PathBuf>,
    /// Step back to the first fidelity before checkpointing.
    pub revert_before_checkpoint: bool,
    /// Phase schedule; empty runs one unbounded phase at the first fidelity.
    pub phases: Vec<Phase>,
    /// Kernel boot arguments; the command line is rendered against the
    /// topology being run.
    pub boot: BootArgs,
}

impl RunOptions {
    /// Run options from configuration, with default boot arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero warm-up quantum.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        if config.warmup_insts.is_some() && config.warmup_quantum_ticks == 0 {
            return Err(Error::invalid(
                "run.warmup_quantum_ticks",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            outdir: config.outdir.clone(),
            warmup_threshold: config.warmup_threshold(),
            warmup_quantum_ticks: config.warmup_quantum_ticks,
            restore: config.restore.clone(),
            revert_before_checkpoint: config.revert_before_checkpoint,
            phases: config
                .phases
                .iter()
                .map(|p| Phase {
                    fidelity: p.fidelity,
                    ticks: p.ticks,
                })
                .collect(),
            boot: BootArgs::default(),
        })
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            outdir: RunConfig::default().outdir,
            warmup_threshold: None,
            warmup_quantum_ticks: RunConfig::default().warmup_quantum_ticks,
            restore: None,
            revert_before_checkpoint: true,
            phases: Vec::new(),
            boot: BootArgs::default(),
        }
    }
}

/// What a finished run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// Event that ended the run.
    pub exit: ExitEvent,
    /// Checkpoint directories written, in order.
    pub checkpoints: Vec<PathBuf>,
    /// Warm-up quanta simulated.
    pub warmup_quanta: usize,
    /// Statistics dumped at the end of the run.
    pub final_stats: StatsSnapshot,
}

impl RunOutcome {
    /// Process exit code: the exit event's code.
    pub const fn exit_code(&self) -> i32 {
        self.exit.code
    }
}

/// Drives one run of a topology.
pub struct SimulationRunner<'a, E: SimulationEngine + ?Sized> {
    engine: &'a mut E,
    controller: &'a mut CpuModelSwitchController,
    options: RunOptions,
    checkpoints: Vec<PathBuf>,
}

impl<E: SimulationEngine + ?Sized> fmt::Debug for SimulationRunner<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("options", &self.options)
            .field("checkpoints", &self.checkpoints)
            .finish_non_exhaustive()
    }
}

impl<'a, E: SimulationEngine + ?Sized> SimulationRunner<'a, E> {
    /// Creates a runner.
    pub fn new(
        engine: &'a mut E,
        controller: &'a mut CpuModelSwitchController,
        options: RunOptions,
    ) -> Self {
        Self {
            engine,
            controller,
            options,
            checkpoints: Vec::new(),
        }
    }

    /// Instantiates `topology` and runs it to completion.
    ///
    /// # Errors
    ///
    /// Engine failures, rejected switches, and checkpoints requested while
    /// a slot is off the first fidelity all abort the run.
    pub fn run(mut self, topology: &SystemTopology) -> Result<RunOutcome> {
        if let Some(path) = &self.options.restore {
            info!(checkpoint = %path.display(), "restoring checkpoint");
        }
        let cmdline = self.options.boot.command_line(topology);
        debug!(%cmdline, "kernel command line");
        self.engine
            .instantiate(topology, &cmdline, self.options.restore.as_deref())?;

        let (warmup_quanta, warmup_exit) = self.warm_up()?;
        let exit = match warmup_exit {
            Some(exit) => exit,
            None => self.run_phases()?,
        };

        let final_stats = self.engine.dump_stats()?;
        info!(
            cause = %exit.cause,
            code = exit.code,
            tick = self.engine.cur_tick(),
            "simulation exited"
        );
        Ok(RunOutcome {
            exit,
            checkpoints: self.checkpoints,
            warmup_quanta,
            final_stats,
        })
    }

    /// Simulates warm-up quanta until enough instructions have committed.
    ///
    /// Returns the quanta simulated and, if the workload exited during
    /// warm-up, its exit event.
    fn warm_up(&mut self) -> Result<(usize, Option<ExitEvent>)> {
        let Some(threshold) = self.options.warmup_threshold else {
            return Ok((0, None));
        };
        let mut quanta = 0;
        loop {
            let exit = self
                .engine
                .simulate(Some(self.options.warmup_quantum_ticks))?;
            let stats = self.engine.dump_stats()?;
            quanta += 1;
            debug!(quanta, sim_insts = stats.sim_insts, threshold, "warm-up quantum");
            if !exit.is_limit_reached() && !exit.is_checkpoint_request() {
                return Ok((quanta, Some(exit)));
            }
            if stats.sim_insts >= threshold {
                break;
            }
        }
        self.engine.reset_stats()?;
        info!(quanta, threshold, "warm-up complete, statistics reset");
        Ok((quanta, None))
    }

    fn run_phases(&mut self) -> Result<ExitEvent> {
        let phases = if self.options.phases.is_empty() {
            vec![Phase {
                fidelity: self.controller.sequence().first(),
                ticks: None,
            }]
        } else {
            self.options.phases.clone()
        };

        let mut last = ExitEvent::limit_reached();
        for phase in phases {
            self.enter(phase.fidelity)?;
            info!(fidelity = %phase.fidelity, ticks = ?phase.ticks, "phase start");
            last = self.simulate_phase(phase)?;
            if !last.is_limit_reached() {
                break;
            }
        }
        Ok(last)
    }

    /// Simulates one phase, taking a checkpoint for every checkpoint request.
    fn simulate_phase(&mut self, phase: Phase) -> Result<ExitEvent> {
        loop {
            let exit = self.engine.simulate(phase.ticks)?;
            if !exit.is_checkpoint_request() {
                return Ok(exit);
            }
            self.checkpoint()?;
            self.enter(phase.fidelity)?;
        }
    }

    fn enter(&mut self, fidelity: CpuModel) -> Result<()> {
        for cluster in 0..self.controller.sets().len() {
            let _ = self
                .controller
                .step_toward(&mut *self.engine, cluster, fidelity)?;
        }
        Ok(())
    }

    fn checkpoint(&mut self) -> Result<()> {
        if self.options.revert_before_checkpoint {
            self.controller.revert_all(&mut *self.engine)?;
        }
        self.controller.ensure_checkpointable()?;

        let tick = self.engine.cur_tick();
        let dir = self
            .options
            .outdir
            .join(format!("{CHECKPOINT_DIR_PREFIX}{tick}"));
        info!(tick, dir = %dir.display(), "dropping checkpoint");
        self.engine.checkpoint(&dir)?;
        self.checkpoints.push(dir);
        Ok(())
    }
}

/// Composes the system `config` describes and runs it on `engine`.
///
/// # Errors
///
/// Returns composition errors before the engine is touched, run errors after.
pub fn run_from_config<E: SimulationEngine + ?Sized>(
    config: &SimConfig,
    engine: &mut E,
) -> Result<RunOutcome> {
    let topology = build_topology(config)?;
    let sequence = FidelitySequence::new(config.switching.sequence.clone())?;
    let switch_options = SwitchOptions {
        max_insts: config.switching.max_insts,
        checker: config.switching.checker,
    };
    let mut controller = CpuModelSwitchController::new(&topology, sequence, switch_options)?;
    let options = RunOptions {
        boot: BootArgs::from_config(&config.boot),
        ..RunOptions::from_config(&config.run)?
    };

    SimulationRunner::new(engine, &mut controller, options).run(&topology)
}
