//! Branch prediction unit (BRU) configuration.
//!
//! The predictors themselves live in the engine. This module selects which
//! one an out-of-order core is built with and sizes its branch target buffer.

use serde::Deserialize;

use crate::common::{Error, Result};

/// Bits of a 64-bit address that are never part of a BTB tag: the index bits
/// plus the two bits of instruction alignment.
const BTB_ALIGNMENT_BITS: u32 = 2;

/// Direction predictor implementations available in the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum BranchPredictorKind {
    /// Per-branch saturating counters.
    #[serde(rename = "LocalBP")]
    Local,
    /// Bi-mode predictor.
    #[serde(rename = "BiModeBP")]
    BiMode,
    /// Local/global tournament predictor.
    #[default]
    #[serde(rename = "TournamentBP")]
    Tournament,
    /// Tagged geometric history length predictor.
    #[serde(rename = "TAGE")]
    Tage,
    /// TAGE with a loop predictor.
    #[serde(rename = "LTAGE")]
    Ltage,
    /// TAGE with statistical corrector and loop predictor (64 KB budget).
    #[serde(rename = "TAGE_SC_L_64KB")]
    TageScL64Kb,
    /// Multiperspective perceptron (64 KB budget).
    #[serde(rename = "MultiperspectivePerceptron64KB")]
    MultiperspectivePerceptron64Kb,
}

impl BranchPredictorKind {
    /// Engine class name of the predictor.
    pub const fn engine_class(self) -> &'static str {
        match self {
            Self::Local => "LocalBP",
            Self::BiMode => "BiModeBP",
            Self::Tournament => "TournamentBP",
            Self::Tage => "TAGE",
            Self::Ltage => "LTAGE",
            Self::TageScL64Kb => "TAGE_SC_L_64KB",
            Self::MultiperspectivePerceptron64Kb => "MultiperspectivePerceptron64KB",
        }
    }
}

/// Indirect branch target predictor implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum IndirectPredictorKind {
    /// Indirect-target TAGE.
    #[default]
    #[serde(rename = "ITTAGE")]
    Ittage,
    /// Set-associative indirect target cache.
    #[serde(rename = "SimpleIndirectPredictor")]
    Simple,
}

/// Requested branch predictor for an out-of-order core.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct BranchPredictorConfig {
    /// Direction predictor.
    pub kind: BranchPredictorKind,
    /// BTB entry count; must be a power of two. `None` keeps the predictor's default.
    pub btb_entries: Option<u64>,
    /// Indirect target predictor.
    pub indirect: IndirectPredictorKind,
}

/// Validated branch predictor settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchPredictorSettings {
    /// Direction predictor.
    pub kind: BranchPredictorKind,
    /// BTB geometry, when overridden.
    pub btb: Option<BtbGeometry>,
    /// Indirect target predictor.
    pub indirect: IndirectPredictorKind,
}

/// BTB entry count with its derived tag width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BtbGeometry {
    /// Number of BTB entries.
    pub entries: u64,
    /// Tag bits per entry: `64 - (log2(entries) + 2)`.
    pub tag_bits: u32,
}

impl BtbGeometry {
    /// Derives the tag width for a BTB of `entries` entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] unless `entries` is a power of two
    /// that leaves at least one tag bit.
    pub fn new(entries: u64) -> Result<Self> {
        if !entries.is_power_of_two() {
            return Err(Error::invalid(
                "btb_entries",
                format!("{entries} is not a power of two"),
            ));
        }
        let index_bits = entries.ilog2() + BTB_ALIGNMENT_BITS;
        if index_bits >= u64::BITS {
            return Err(Error::invalid(
                "btb_entries",
                format!("{entries} entries leave no tag bits"),
            ));
        }
        Ok(Self {
            entries,
            tag_bits: u64::BITS - index_bits,
        })
    }
}

impl BranchPredictorConfig {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Propagates [`BtbGeometry::new`] failures.
    pub fn resolve(&self) -> Result<BranchPredictorSettings> {
        let btb = self.btb_entries.map(BtbGeometry::new).transpose()?;
        Ok(BranchPredictorSettings {
            kind: self.kind,
            btb,
            indirect: self.indirect,
        })
    }
}
