//! CPU-model switching.
//!
//! Every core of a switchable cluster is a slot owning one instance per
//! fidelity of the configured sequence. All instances of a slot share one
//! [`SharedCoreState`], so architectural state survives the handoff. A switch
//! is a batch covering every slot of one cluster:
//! 1. **Begin:** Validates the request and takes the cluster's switch token.
//! 2. **Handoff:** The engine moves state from outgoing to incoming instances.
//! 3. **Commit / abort:** Flips the active pointers, or poisons the cluster.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, info};

use crate::common::{Error, Frequency, Result, TransitionFault};
use crate::core::CpuModel;
use crate::sim::engine::SimulationEngine;
use crate::soc::{ClusterId, SystemTopology};

/// Ordered list of fidelities a run moves through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FidelitySequence(Vec<CpuModel>);

impl FidelitySequence {
    /// Validates a sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty sequence or a repeated model.
    pub fn new(models: Vec<CpuModel>) -> Result<Self> {
        if models.is_empty() {
            return Err(Error::invalid("switching.sequence", "must not be empty"));
        }
        for (i, model) in models.iter().enumerate() {
            if models[..i].contains(model) {
                return Err(Error::invalid(
                    "switching.sequence",
                    format!("{model} appears more than once"),
                ));
            }
        }
        Ok(Self(models))
    }

    /// The fidelity every slot starts on and checkpoints are taken on.
    pub fn first(&self) -> CpuModel {
        self.0[0]
    }

    /// Position of `model`, if it is in the sequence.
    pub fn position(&self, model: CpuModel) -> Option<usize> {
        self.0.iter().position(|&m| m == model)
    }

    /// Model at `idx`.
    pub fn get(&self, idx: usize) -> Option<CpuModel> {
        self.0.get(idx).copied()
    }

    /// Number of fidelities.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a sequence holds at least one model.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Models in order.
    pub fn models(&self) -> &[CpuModel] {
        &self.0
    }
}

impl Default for FidelitySequence {
    fn default() -> Self {
        Self(vec![CpuModel::Atomic, CpuModel::Timing, CpuModel::O3])
    }
}

/// State every fidelity instance of one core refers to.
#[derive(Debug, PartialEq, Eq)]
pub struct SharedCoreState {
    /// System-wide CPU id.
    pub cpu_id: usize,
    /// ISA state object.
    pub isa: String,
    /// Workload object.
    pub workload: String,
    /// Clock domain object.
    pub clk_domain: String,
    /// Clock of the domain.
    pub clock: Frequency,
}

/// One fidelity instance of a core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreInstance {
    /// Object name.
    pub name: String,
    /// CPU model.
    pub model: CpuModel,
    /// Instruction cap; only switched-in instances carry one.
    pub max_insts_any_thread: Option<u64>,
    /// A checker core is attached.
    pub checker: bool,
    /// State shared by every instance of the slot.
    pub shared: Arc<SharedCoreState>,
}

/// One core: an instance per fidelity and the index of the active one.
#[derive(Clone, Debug)]
pub struct CoreSlot {
    instances: Vec<CoreInstance>,
    active: usize,
}

impl CoreSlot {
    /// The active instance.
    pub fn active(&self) -> &CoreInstance {
        &self.instances[self.active]
    }

    /// Index of the active fidelity.
    pub const fn active_index(&self) -> usize {
        self.active
    }

    /// All instances, in sequence order.
    pub fn instances(&self) -> &[CoreInstance] {
        &self.instances
    }
}

/// Source of batch tokens, unique across every controller of the process.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SetState {
    Idle,
    InFlight(u64),
    Poisoned,
}

/// The switchable slots of one cluster.
#[derive(Clone, Debug)]
pub struct SwitchableCoreSet {
    cluster: ClusterId,
    slots: Vec<CoreSlot>,
    state: SetState,
}

impl SwitchableCoreSet {
    /// Cluster the set belongs to.
    pub const fn cluster(&self) -> ClusterId {
        self.cluster
    }

    /// Slots, in core order.
    pub fn slots(&self) -> &[CoreSlot] {
        &self.slots
    }

    /// Returns `true` once a failed handoff has poisoned the cluster.
    pub fn is_poisoned(&self) -> bool {
        self.state == SetState::Poisoned
    }

    /// Returns `true` while a batch is in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, SetState::InFlight(_))
    }

    fn common_active(&self) -> Option<usize> {
        let first = self.slots.first()?.active;
        self.slots.iter().all(|s| s.active == first).then_some(first)
    }
}

/// One slot's handoff within a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwitchPair {
    /// Slot index within the cluster.
    pub slot: usize,
    /// Instance being switched out.
    pub outgoing: CoreInstance,
    /// Instance being switched in.
    pub incoming: CoreInstance,
}

/// A validated switch holding its cluster's token.
///
/// Only [`CpuModelSwitchController::begin`] creates batches, and
/// [`commit`](CpuModelSwitchController::commit) or
/// [`abort`](CpuModelSwitchController::abort) consumes them.
#[derive(Debug)]
pub struct SwitchBatch {
    token: u64,
    cluster: ClusterId,
    from: usize,
    to: usize,
    pairs: Vec<SwitchPair>,
}

impl SwitchBatch {
    /// Cluster being switched.
    pub const fn cluster(&self) -> ClusterId {
        self.cluster
    }

    /// Handoff pairs, one per slot.
    pub fn pairs(&self) -> &[SwitchPair] {
        &self.pairs
    }
}

/// Settings of the instances that get switched in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SwitchOptions {
    /// Instruction cap for switched-in instances.
    pub max_insts: Option<u64>,
    /// Attach a checker core to switched-in instances.
    pub checker: bool,
}

/// Drives fidelity switches for every cluster of a system.
#[derive(Clone, Debug)]
pub struct CpuModelSwitchController {
    sequence: FidelitySequence,
    sets: Vec<SwitchableCoreSet>,
}

impl CpuModelSwitchController {
    /// Builds one slot per core, with one instance per fidelity; every slot
    /// starts on the first fidelity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a cluster's model is not the first
    /// fidelity of `sequence`. Every cluster of a switched system starts on
    /// that fidelity, so a system mixing core models cannot be driven by one
    /// controller.
    pub fn new(
        topology: &SystemTopology,
        sequence: FidelitySequence,
        options: SwitchOptions,
    ) -> Result<Self> {
        let mut sets = Vec::with_capacity(topology.clusters.len());
        for cluster in &topology.clusters {
            if cluster.core_model != sequence.first() {
                return Err(Error::invalid(
                    "switching.sequence",
                    format!(
                        "cluster {} is composed from {} but the sequence starts at {}; \
                         every cluster must be composed from the first fidelity, \
                         so compose it from {} or start the sequence at {}",
                        cluster.id,
                        cluster.core_model,
                        sequence.first(),
                        sequence.first(),
                        cluster.core_model
                    ),
                ));
            }

            let slots = cluster
                .cores
                .iter()
                .map(|core| {
                    let shared = Arc::new(SharedCoreState {
                        cpu_id: core.cpu_id,
                        isa: format!("{}.isa", core.path),
                        workload: format!("{}.workload", core.path),
                        clk_domain: format!("{}.clk_domain", cluster.name()),
                        clock: cluster.clock,
                    });
                    let instances = sequence
                        .models()
                        .iter()
                        .enumerate()
                        .map(|(idx, &model)| {
                            if idx == 0 {
                                CoreInstance {
                                    name: core.path.clone(),
                                    model,
                                    max_insts_any_thread: None,
                                    checker: false,
                                    shared: Arc::clone(&shared),
                                }
                            } else {
                                CoreInstance {
                                    name: format!("{}_cpus{}", model.tag(), core.cpu_id),
                                    model,
                                    max_insts_any_thread: options.max_insts,
                                    checker: options.checker,
                                    shared: Arc::clone(&shared),
                                }
                            }
                        })
                        .collect();
                    CoreSlot {
                        instances,
                        active: 0,
                    }
                })
                .collect();

            sets.push(SwitchableCoreSet {
                cluster: cluster.id,
                slots,
                state: SetState::Idle,
            });
        }
        Ok(Self { sequence, sets })
    }

    /// The fidelity sequence.
    pub const fn sequence(&self) -> &FidelitySequence {
        &self.sequence
    }

    /// Per-cluster slot sets.
    pub fn sets(&self) -> &[SwitchableCoreSet] {
        &self.sets
    }

    /// Fidelity every slot of `cluster` is on; `None` if the slots differ or
    /// the cluster does not exist.
    pub fn active_fidelity(&self, cluster: ClusterId) -> Option<CpuModel> {
        let idx = self.sets.get(cluster)?.common_active()?;
        self.sequence.get(idx)
    }

    /// Fidelity one slot is on.
    pub fn slot_fidelity(&self, cluster: ClusterId, slot: usize) -> Option<CpuModel> {
        let slot = self.sets.get(cluster)?.slots.get(slot)?;
        Some(slot.active().model)
    }

    fn set(&self, cluster: ClusterId) -> Result<&SwitchableCoreSet> {
        self.sets
            .get(cluster)
            .ok_or_else(|| Error::invalid("cluster", format!("no cluster {cluster}")))
    }

    /// Validates a switch request and takes the cluster's token.
    ///
    /// The request must name every slot of the cluster exactly once, with
    /// one target shared by all, and the target must be next to the slots'
    /// common fidelity in the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedSwitchTransition`] describing the first
    /// violated condition; the cluster is left untouched.
    pub fn begin(
        &mut self,
        cluster: ClusterId,
        requests: &[(usize, CpuModel)],
    ) -> Result<SwitchBatch> {
        let set = self.set(cluster)?;
        let reject = |fault| Error::transition(cluster, fault);

        match set.state {
            SetState::Poisoned => return Err(reject(TransitionFault::ClusterPoisoned)),
            SetState::InFlight(_) => return Err(reject(TransitionFault::SwitchInFlight)),
            SetState::Idle => {}
        }

        let slots = set.slots.len();
        if let Some(&(slot, _)) = requests.iter().find(|(slot, _)| *slot >= slots) {
            return Err(reject(TransitionFault::UnknownSlot(slot)));
        }
        let covered: BTreeSet<usize> = requests.iter().map(|&(slot, _)| slot).collect();
        if covered.len() != slots || requests.len() != slots {
            return Err(reject(TransitionFault::PartialBatch {
                covered: covered.len(),
                slots,
            }));
        }

        let Some(&(_, target)) = requests.first() else {
            return Err(reject(TransitionFault::PartialBatch { covered: 0, slots }));
        };
        if requests.iter().any(|&(_, model)| model != target) {
            return Err(reject(TransitionFault::MixedTargets));
        }
        let to = self
            .sequence
            .position(target)
            .ok_or_else(|| reject(TransitionFault::NotInSequence(target)))?;
        let from = set
            .common_active()
            .ok_or_else(|| reject(TransitionFault::MixedFidelity))?;
        if from.abs_diff(to) != 1 {
            return Err(reject(TransitionFault::NotAdjacent {
                from: self.sequence.get(from).unwrap_or_default(),
                to: target,
            }));
        }

        let pairs = set
            .slots
            .iter()
            .enumerate()
            .map(|(slot, s)| SwitchPair {
                slot,
                outgoing: s.instances[from].clone(),
                incoming: s.instances[to].clone(),
            })
            .collect();

        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        self.sets[cluster].state = SetState::InFlight(token);
        Ok(SwitchBatch {
            token,
            cluster,
            from,
            to,
            pairs,
        })
    }

    fn claim(&mut self, batch: &SwitchBatch) -> Result<&mut SwitchableCoreSet> {
        let reject = || Error::transition(batch.cluster, TransitionFault::StaleBatch);
        let set = self.sets.get_mut(batch.cluster).ok_or_else(reject)?;
        if set.state != SetState::InFlight(batch.token) {
            return Err(reject());
        }
        Ok(set)
    }

    /// Makes the batch's incoming instances active and releases the token.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionFault::StaleBatch`] if the batch does not hold the
    /// token of its cluster on this controller; nothing changes.
    pub fn commit(&mut self, batch: SwitchBatch) -> Result<()> {
        let set = self.claim(&batch)?;
        for slot in &mut set.slots {
            slot.active = batch.to;
        }
        set.state = SetState::Idle;
        info!(
            cluster = batch.cluster,
            from = %self.sequence.get(batch.from).unwrap_or_default(),
            to = %self.sequence.get(batch.to).unwrap_or_default(),
            slots = batch.pairs.len(),
            "switched cpus"
        );
        Ok(())
    }

    /// Poisons the batch's cluster; it accepts no further switches.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionFault::StaleBatch`] under the same conditions as
    /// [`commit`](Self::commit); the cluster is not poisoned.
    pub fn abort(&mut self, batch: SwitchBatch) -> Result<()> {
        let set = self.claim(&batch)?;
        set.state = SetState::Poisoned;
        error!(cluster = batch.cluster, "cpu switch aborted, cluster poisoned");
        Ok(())
    }

    /// Switches the listed slots through `engine`: begin, handoff, commit.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`begin`](Self::begin), or
    /// [`Error::Engine`] after aborting when the handoff fails.
    pub fn switch_slots<E: SimulationEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        cluster: ClusterId,
        requests: &[(usize, CpuModel)],
    ) -> Result<()> {
        let batch = self.begin(cluster, requests)?;
        match engine.switch_cpus(&batch) {
            Ok(()) => self.commit(batch),
            Err(err) => {
                self.abort(batch)?;
                Err(err.into())
            }
        }
    }

    /// Switches every slot of `cluster` to `target`.
    ///
    /// # Errors
    ///
    /// See [`switch_slots`](Self::switch_slots).
    pub fn switch_to<E: SimulationEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        cluster: ClusterId,
        target: CpuModel,
    ) -> Result<()> {
        let slots = self.set(cluster)?.slots.len();
        let requests: Vec<_> = (0..slots).map(|slot| (slot, target)).collect();
        self.switch_slots(engine, cluster, &requests)
    }

    /// Walks `cluster` one adjacent step at a time until it reaches `target`.
    ///
    /// Returns the number of switches performed.
    ///
    /// # Errors
    ///
    /// Fails with [`TransitionFault::NotInSequence`] for an unknown target or
    /// [`TransitionFault::MixedFidelity`] if the slots disagree, otherwise
    /// with the first failing step.
    pub fn step_toward<E: SimulationEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        cluster: ClusterId,
        target: CpuModel,
    ) -> Result<usize> {
        let to = self
            .sequence
            .position(target)
            .ok_or_else(|| Error::transition(cluster, TransitionFault::NotInSequence(target)))?;
        let mut steps = 0;
        loop {
            let from = self
                .set(cluster)?
                .common_active()
                .ok_or_else(|| Error::transition(cluster, TransitionFault::MixedFidelity))?;
            if from == to {
                return Ok(steps);
            }
            let next = if to > from { from + 1 } else { from - 1 };
            let model = self.sequence.get(next).unwrap_or(target);
            self.switch_to(engine, cluster, model)?;
            steps += 1;
        }
    }

    /// Steps every cluster back to the first fidelity.
    ///
    /// # Errors
    ///
    /// See [`step_toward`](Self::step_toward).
    pub fn revert_all<E: SimulationEngine + ?Sized>(&mut self, engine: &mut E) -> Result<()> {
        let first = self.sequence.first();
        for cluster in 0..self.sets.len() {
            let _ = self.step_toward(engine, cluster, first)?;
        }
        Ok(())
    }

    /// Checks that every slot is on the first fidelity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CheckpointRequiresAtomic`] for the first slot that is not.
    pub fn ensure_checkpointable(&self) -> Result<()> {
        for set in &self.sets {
            for (slot, s) in set.slots.iter().enumerate() {
                if s.active != 0 {
                    return Err(Error::CheckpointRequiresAtomic {
                        cluster: set.cluster,
                        slot,
                        active: s.active().model,
                        required: self.sequence.first(),
                    });
                }
            }
        }
        Ok(())
    }
}
