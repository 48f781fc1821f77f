//! # Memory Range Allocation Tests
//!
//! Concrete scenarios plus property checks over arbitrary region lists.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use simtopo_core::common::{ByteSize, Error, MemoryRange, PlatformRegion};
use simtopo_core::soc::MemoryRangeAllocator;

const GIB: u64 = ByteSize::gib(1).0;

#[test]
fn fills_first_region_then_spills() {
    let regions = [
        PlatformRegion::new(0, 2 * GIB),
        PlatformRegion::new(4 * GIB, 4 * GIB),
    ];
    let ranges = MemoryRangeAllocator::allocate(3 * GIB, &regions).unwrap();
    assert_eq!(
        ranges,
        vec![MemoryRange::new(0, 2 * GIB), MemoryRange::new(4 * GIB, GIB)]
    );
}

#[test]
fn stops_once_request_is_met() {
    let regions = [
        PlatformRegion::new(0, 2 * GIB),
        PlatformRegion::new(4 * GIB, 4 * GIB),
    ];
    let ranges = MemoryRangeAllocator::allocate(GIB, &regions).unwrap();
    assert_eq!(ranges, vec![MemoryRange::new(0, GIB)]);
}

#[test]
fn skips_empty_regions() {
    let regions = [
        PlatformRegion::new(0x1000, 0),
        PlatformRegion::new(8 * GIB, GIB),
    ];
    let ranges = MemoryRangeAllocator::allocate(GIB, &regions).unwrap();
    assert_eq!(ranges, vec![MemoryRange::new(8 * GIB, GIB)]);
}

#[test]
fn oversized_request_reports_capacity() {
    let regions = [
        PlatformRegion::new(0, 2 * GIB),
        PlatformRegion::new(4 * GIB, GIB),
    ];
    let err = MemoryRangeAllocator::allocate(4 * GIB, &regions).unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientPlatformCapacity {
            requested,
            available,
        } if requested == 4 * GIB && available == 3 * GIB
    ));
}

fn regions_strategy() -> impl Strategy<Value = Vec<PlatformRegion>> {
    prop::collection::vec(0u64..(8 * GIB), 0..6).prop_map(|sizes| {
        let mut start = 0;
        sizes
            .into_iter()
            .map(|size| {
                let region = PlatformRegion::new(start, size);
                start += size + GIB;
                region
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn allocation_is_exact_or_fails(regions in regions_strategy(), requested in 0u64..(32 * GIB)) {
        let capacity: u64 = regions.iter().map(|r| r.size).sum();
        match MemoryRangeAllocator::allocate(requested, &regions) {
            Ok(ranges) => {
                prop_assert!(requested <= capacity);
                prop_assert_eq!(MemoryRangeAllocator::total(&ranges), requested);
            }
            Err(Error::InsufficientPlatformCapacity { available, .. }) => {
                prop_assert!(requested > capacity);
                prop_assert_eq!(available, capacity);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn ranges_start_at_region_bases_in_order(regions in regions_strategy(), requested in 0u64..(32 * GIB)) {
        if let Ok(ranges) = MemoryRangeAllocator::allocate(requested, &regions) {
            let mut used = regions.iter().filter(|r| !r.is_empty());
            for range in &ranges {
                let region = used.next();
                prop_assert!(region.is_some());
                let region = region.unwrap();
                prop_assert_eq!(range.start, region.start);
                prop_assert!(region.contains(range));
                prop_assert!(!range.is_empty());
            }
        }
    }
}
