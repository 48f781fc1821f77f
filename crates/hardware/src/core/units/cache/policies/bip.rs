//! Bimodal Insertion Policy (BIP) parameters.
//!
//! BIP behaves like LRU on hits but inserts new lines at the LRU position,
//! except for a small fraction inserted at MRU. That fraction is the
//! bypass-throttle probability.

use tracing::warn;

use super::CachePolicyConfig;

/// MRU-insertion probability, in percent, when none is supplied.
pub const DEFAULT_BYPASS_PROBABILITY: u8 = 3;

/// Largest meaningful probability.
const MAX_PROBABILITY: u8 = 100;

/// Builds a BIP descriptor; probabilities above 100 are clamped.
pub fn configure(bypass_probability: Option<u8>) -> CachePolicyConfig {
    let requested = bypass_probability.unwrap_or(DEFAULT_BYPASS_PROBABILITY);
    if requested > MAX_PROBABILITY {
        warn!(requested, "BIP bypass probability above 100%, clamping");
    }
    CachePolicyConfig::Bip {
        bypass_probability: requested.min(MAX_PROBABILITY),
    }
}
