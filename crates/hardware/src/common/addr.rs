//! Physical address ranges.
//!
//! This module defines the half-open address interval used for both platform
//! memory regions and the memory ranges carved out of them. It provides:
//! 1. **Geometry:** Start, size, and exclusive end of an interval.
//! 2. **Relations:** Containment and overlap tests between intervals.
//! 3. **Aliases:** `PlatformRegion` and `MemoryRange` name the two roles a range plays.

use std::fmt;

use serde::Deserialize;

/// A contiguous, half-open interval `[start, start + size)` of physical addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct AddrRange {
    /// First address covered by the range.
    pub start: u64,
    /// Number of bytes covered by the range.
    pub size: u64,
}

/// A physical memory region exposed by a platform's memory map.
pub type PlatformRegion = AddrRange;

/// A memory range allocated to the system from exactly one platform region.
pub type MemoryRange = AddrRange;

impl AddrRange {
    /// Creates a new range from a start address and a size in bytes.
    #[inline]
    pub const fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }

    /// Returns the exclusive end address of the range.
    ///
    /// Saturates at `u64::MAX` for ranges that touch the top of the address space.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }

    /// Returns `true` if the range covers no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns `true` if `addr` lies within the range.
    #[inline]
    pub const fn contains_addr(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Returns `true` if `other` lies entirely within this range.
    pub const fn contains(&self, other: &Self) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Returns `true` if the two ranges share at least one address.
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end())
    }
}
