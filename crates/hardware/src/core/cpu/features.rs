//! Out-of-order core feature toggles.
//!
//! `CoreFeatureSet` is the typed record of every micro-architectural knob the
//! detailed model accepts. It is validated once, per core, into
//! `O3Settings`; cores of any other model ignore it.

use std::path::PathBuf;

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::core::units::bru::{BranchPredictorConfig, BranchPredictorSettings};

/// Cache replacement mode the core's instruction-starvation tracking assumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheReplMode {
    /// Oracle replacement (analysis mode).
    Oracle = 0,
    /// Least recently used.
    #[default]
    Lru = 1,
    /// Random replacement.
    Random = 2,
    /// No replacement tracking.
    None = 3,
}

/// Fetch engine toggles.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct FetchFeatures {
    /// Fetch-directed instruction prefetching.
    pub fdip: bool,
    /// Treat every instruction fetch as an L1I hit.
    pub perfect_icache: bool,
    /// Fetch queue depth in instructions.
    pub fetch_queue_size: Option<u32>,
    /// Fetch target queue depth in entries.
    pub ftq_size: Option<u32>,
    /// Instructions per fetch target queue entry; must be non-zero.
    pub ftq_inst: Option<u32>,
}

/// Instruction-starvation avoidance and oracle knobs.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct StarvationFeatures {
    /// Minimum starvation count before a line is marked for preservation.
    pub starve_at_least: Option<u32>,
    /// Mark starving lines at random.
    pub random_starve: bool,
    /// Probability (percent) used by random starvation marking.
    pub starve_randomness: Option<u32>,
    /// Ignore starvation signals and mark purely at random.
    pub pure_random: bool,
    /// Randomize the preservation history.
    pub hist_random: bool,
    /// Drive preservation from a recorded oracle trace.
    pub oracle_emissary: bool,
    /// Oracle trace file.
    pub oracle_starvations_file: Option<PathBuf>,
    /// Starvation count threshold applied to the oracle trace.
    pub oracle_starvation_count_threshold: Option<u32>,
}

/// Instruction-count caps. Both are extended by the warm-up instruction count.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct InstructionLimits {
    /// Stop after any thread commits this many instructions.
    pub max_insts: Option<u64>,
    /// Total committed instructions the core's own accounting stops at.
    pub total_sim_insts: Option<u64>,
}

/// Every feature toggle accepted by the out-of-order model.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CoreFeatureSet {
    /// Fetch engine toggles.
    pub fetch: FetchFeatures,
    /// Starvation avoidance knobs.
    pub starvation: StarvationFeatures,
    /// Branch predictor; `None` keeps the model's default predictor.
    pub branch_predictor: Option<BranchPredictorConfig>,
    /// BTB confidence threshold.
    pub btb_conf_threshold: Option<u32>,
    /// Minimum committed instructions before BTB confidence is tracked.
    pub btb_conf_min_inst: Option<u64>,
    /// Dump BTB confidence at exit.
    pub dump_btb_conf: bool,
    /// Dump per-line starvation counts at exit.
    pub dump_tms: bool,
    /// Instruction-count caps.
    pub limits: InstructionLimits,
    /// L1I set count the starvation tables are sized for.
    pub num_sets: Option<u32>,
}

/// Cluster-wide inputs that shape a core's settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FeatureContext {
    /// Warm-up instructions added to every instruction cap.
    pub warmup_insts: Option<u64>,
    /// Analysis mode: oracle replacement everywhere.
    pub analysis_opt: bool,
    /// The cluster's L1I or L2 uses the Emissary-LRU policy.
    pub emissary_in_use: bool,
}

/// Validated per-core settings of an out-of-order core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct O3Settings {
    /// Fetch engine toggles.
    pub fetch: FetchFeatures,
    /// Starvation avoidance knobs.
    pub starvation: StarvationFeatures,
    /// Enable starvation-driven preservation in the Emissary policy.
    pub enable_starvation_emissary: bool,
    /// Branch predictor, when overridden.
    pub branch_predictor: Option<BranchPredictorSettings>,
    /// BTB confidence threshold.
    pub btb_conf_threshold: Option<u32>,
    /// Minimum committed instructions before BTB confidence is tracked.
    pub btb_conf_min_inst: Option<u64>,
    /// Dump BTB confidence at exit.
    pub dump_btb_conf: bool,
    /// Dump per-line starvation counts at exit.
    pub dump_tms: bool,
    /// `max_insts` plus warm-up.
    pub max_insts_any_thread: Option<u64>,
    /// `total_sim_insts` plus warm-up.
    pub total_sim_insts: Option<u64>,
    /// Replacement mode the starvation tracking assumes.
    pub cache_repl: CacheReplMode,
    /// L1I set count.
    pub num_sets: Option<u32>,
}

/// Adds the warm-up count to a cap; a cap that is not set stays unset.
fn with_warmup(cap: Option<u64>, warmup: Option<u64>) -> Option<u64> {
    cap.map(|n| n.saturating_add(warmup.unwrap_or(0)))
}

impl CoreFeatureSet {
    /// Returns `true` if no toggle differs from its default.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Validates the feature set into the settings of one out-of-order core.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero `ftq_inst` or a BTB entry
    /// count that is not a power of two.
    pub fn resolve(&self, ctx: FeatureContext) -> Result<O3Settings> {
        if self.fetch.ftq_inst == Some(0) {
            return Err(Error::invalid("ftq_inst", "must be greater than zero"));
        }
        let branch_predictor = self
            .branch_predictor
            .as_ref()
            .map(BranchPredictorConfig::resolve)
            .transpose()?;

        Ok(O3Settings {
            fetch: self.fetch.clone(),
            starvation: self.starvation.clone(),
            enable_starvation_emissary: ctx.emissary_in_use,
            branch_predictor,
            btb_conf_threshold: self.btb_conf_threshold,
            btb_conf_min_inst: self.btb_conf_min_inst,
            dump_btb_conf: self.dump_btb_conf,
            dump_tms: self.dump_tms,
            max_insts_any_thread: with_warmup(self.limits.max_insts, ctx.warmup_insts),
            total_sim_insts: with_warmup(self.limits.total_sim_insts, ctx.warmup_insts),
            cache_repl: if ctx.analysis_opt {
                CacheReplMode::Oracle
            } else {
                CacheReplMode::default()
            },
            num_sets: self.num_sets,
        })
    }
}
