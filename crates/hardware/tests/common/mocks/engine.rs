use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use simtopo_core::SystemTopology;
use simtopo_core::sim::{EngineError, ExitEvent, SimulationEngine, StatsSnapshot, SwitchBatch};

/// Exit cause the mock reports when the workload runs to completion.
pub const WORKLOAD_EXIT: &str = "exiting with last active thread context";

/// One call made to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    Instantiate { restore: Option<PathBuf>, cpus: usize, cmdline: String },
    Simulate(Option<u64>),
    Checkpoint(PathBuf),
    Switch { cluster: usize, outgoing: Vec<String>, incoming: Vec<String> },
    DumpStats,
    ResetStats,
}

/// Engine double that records every call.
///
/// `simulate` pops the next scripted exit event. With the script exhausted it
/// reports the tick limit when one was given and a workload exit otherwise.
/// Each call advances the tick by the limit (or `ticks_per_run`) and the
/// committed instruction count by `insts_per_run`.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<EngineCall>,
    pub script: VecDeque<ExitEvent>,
    pub tick: u64,
    pub sim_insts: u64,
    pub insts_per_run: u64,
    pub ticks_per_run: u64,
    pub fail_switches: bool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            ticks_per_run: 1_000,
            ..Self::default()
        }
    }

    pub fn with_script(events: impl IntoIterator<Item = ExitEvent>) -> Self {
        Self {
            script: events.into_iter().collect(),
            ..Self::new()
        }
    }

    /// Switch calls as `(cluster, outgoing, incoming)`.
    pub fn switches(&self) -> Vec<(usize, Vec<String>, Vec<String>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Switch {
                    cluster,
                    outgoing,
                    incoming,
                } => Some((*cluster, outgoing.clone(), incoming.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn checkpoints(&self) -> Vec<PathBuf> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Checkpoint(dir) => Some(dir.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl SimulationEngine for RecordingEngine {
    fn instantiate(
        &mut self,
        topology: &SystemTopology,
        cmdline: &str,
        restore: Option<&Path>,
    ) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Instantiate {
            restore: restore.map(Path::to_path_buf),
            cpus: topology.num_cpus(),
            cmdline: cmdline.to_string(),
        });
        Ok(())
    }

    fn simulate(&mut self, tick_limit: Option<u64>) -> Result<ExitEvent, EngineError> {
        self.calls.push(EngineCall::Simulate(tick_limit));
        self.tick += tick_limit.unwrap_or(self.ticks_per_run);
        self.sim_insts += self.insts_per_run;
        Ok(match self.script.pop_front() {
            Some(event) => event,
            None if tick_limit.is_some() => ExitEvent::limit_reached(),
            None => ExitEvent::new(WORKLOAD_EXIT, 0),
        })
    }

    fn checkpoint(&mut self, dir: &Path) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Checkpoint(dir.to_path_buf()));
        Ok(())
    }

    fn cur_tick(&self) -> u64 {
        self.tick
    }

    fn switch_cpus(&mut self, batch: &SwitchBatch) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Switch {
            cluster: batch.cluster(),
            outgoing: batch.pairs().iter().map(|p| p.outgoing.name.clone()).collect(),
            incoming: batch.pairs().iter().map(|p| p.incoming.name.clone()).collect(),
        });
        if self.fail_switches {
            return Err(EngineError::new("drain timed out"));
        }
        Ok(())
    }

    fn dump_stats(&mut self) -> Result<StatsSnapshot, EngineError> {
        self.calls.push(EngineCall::DumpStats);
        Ok(StatsSnapshot {
            sim_insts: self.sim_insts,
        })
    }

    fn reset_stats(&mut self) -> Result<(), EngineError> {
        self.calls.push(EngineCall::ResetStats);
        self.sim_insts = 0;
        Ok(())
    }
}
