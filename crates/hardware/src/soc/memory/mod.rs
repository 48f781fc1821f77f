//! System memory range allocation.
//!
//! This module carves the requested system memory out of a platform's
//! physical regions. It provides:
//! 1. **Allocation:** Regions are consumed in platform order, each from its start address.
//! 2. **Capacity check:** A request larger than the platform fails without partial output.
//! 3. **Totals:** Summing an allocated range list.

use tracing::debug;

use crate::common::{Error, MemoryRange, PlatformRegion, Result};

/// Partitions a requested memory size across a platform's regions.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryRangeAllocator;

impl MemoryRangeAllocator {
    /// Allocates `requested` bytes from `regions`.
    ///
    /// Each region contributes `min(remaining, region.size)` bytes starting at
    /// its base address. The walk stops as soon as the request is satisfied,
    /// so later regions are left untouched. Ranges are returned in region
    /// order and never merged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientPlatformCapacity`] if the regions together
    /// hold fewer than `requested` bytes.
    pub fn allocate(requested: u64, regions: &[PlatformRegion]) -> Result<Vec<MemoryRange>> {
        let mut remaining = requested;
        let mut ranges = Vec::new();

        for region in regions {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(region.size);
            if take == 0 {
                continue;
            }
            ranges.push(MemoryRange::new(region.start, take));
            remaining -= take;
        }

        if remaining > 0 {
            return Err(Error::InsufficientPlatformCapacity {
                requested,
                available: requested - remaining,
            });
        }

        debug!(requested, ranges = ranges.len(), "allocated memory ranges");
        Ok(ranges)
    }

    /// Total bytes covered by `ranges`.
    pub fn total(ranges: &[MemoryRange]) -> u64 {
        ranges.iter().map(|r| r.size).sum()
    }
}
