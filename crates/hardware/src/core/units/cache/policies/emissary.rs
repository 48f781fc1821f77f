//! Emissary-LRU way partitioning.
//!
//! Each set is split into preserved ways, which hold lines whose misses
//! starved the front end, and an LRU-managed remainder. The split is fixed
//! when the cache is built; only the preservation history is flushed at run
//! time.

use tracing::warn;

use super::CachePolicyConfig;

/// Preserved ways when none are requested.
pub const DEFAULT_PRESERVE_WAYS: u32 = 6;

/// Builds an Emissary-LRU descriptor for a cache of `associativity` ways.
///
/// The preserved portion is clamped so at least one way stays LRU-managed
/// whenever the cache has more than one way.
pub fn configure(
    associativity: u32,
    preserve_ways: Option<u32>,
    flush_period_cycles: Option<u64>,
) -> CachePolicyConfig {
    let requested = preserve_ways.unwrap_or(DEFAULT_PRESERVE_WAYS);
    let ceiling = associativity.saturating_sub(1);
    let preserve_ways = if requested > ceiling {
        warn!(
            requested,
            associativity, "preserved ways leave no LRU way, clamping to {ceiling}"
        );
        ceiling
    } else {
        requested
    };

    CachePolicyConfig::EmissaryLru {
        preserve_ways,
        lru_ways: associativity - preserve_ways,
        flush_period_cycles,
    }
}
