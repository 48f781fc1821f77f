//! # Topology Assembly Tests
//!
//! Cache placement and port wiring across hierarchy depths and cluster mixes.

use pretty_assertions::assert_eq;
use rstest::rstest;
use simtopo_core::common::{Error, Frequency};
use simtopo_core::core::units::cache::policies::{PolicyKind, PolicyParameterMismatch};
use simtopo_core::core::units::cache::{CacheLevel, CacheLevelRequest};
use simtopo_core::core::{CpuModel, MemoryMode};
use simtopo_core::soc::interconnect::{BusKind, DmaPath, IOBUS, L3_BUS, MEMBUS};
use simtopo_core::build_topology;

use crate::common::harness::{cluster, config_with, topology};

#[rstest]
#[case(1, 0, false)]
#[case(2, 1, false)]
#[case(3, 1, true)]
fn depth_decides_shared_levels(#[case] depth: u8, #[case] l2s: usize, #[case] l3: bool) {
    let mut config = config_with(vec![cluster(2, CpuModel::O3, 2)]);
    config.hierarchy_depth = depth;
    let topo = topology(&config);

    assert_eq!(topo.l2_count(), l2s);
    assert_eq!(topo.shared_l3.is_some(), l3);
    assert!(topo.cores().all(|c| c.l1.is_some()));
    assert_eq!(topo.interconnect.bus(L3_BUS).is_some(), l3);
}

#[test]
fn depth_one_links_l1s_to_membus() {
    let mut config = config_with(vec![cluster(1, CpuModel::O3, 2)]);
    config.hierarchy_depth = 1;
    let topo = topology(&config);
    let ic = &topo.interconnect;
    let target = format!("{MEMBUS}.cpu_side_ports");
    for port in [
        "icache.mem_side",
        "dcache.mem_side",
        "itb_walker_cache.mem_side",
        "dtb_walker_cache.mem_side",
    ] {
        assert!(ic.is_linked(&format!("cpu_cluster0.cpus0.{port}"), &target), "{port}");
    }
}

#[test]
fn depth_three_routes_through_l2_and_l3() {
    let topo = topology(&config_with(vec![cluster(2, CpuModel::O3, 2)]));
    let ic = &topo.interconnect;

    assert!(ic.is_linked(
        "cpu_cluster0.cpus1.icache.mem_side",
        "cpu_cluster0.toL2Bus.cpu_side_ports"
    ));
    assert!(ic.is_linked("cpu_cluster0.toL2Bus.mem_side_ports", "cpu_cluster0.l2.cpu_side"));
    assert!(ic.is_linked("cpu_cluster0.l2.mem_side", "toL3Bus.cpu_side_ports"));
    assert!(ic.is_linked("toL3Bus.mem_side_ports", "l3.cpu_side"));
    assert!(ic.is_linked("l3.mem_side", "membus.cpu_side_ports"));
    assert_eq!(
        ic.bus("cpu_cluster0.toL2Bus").map(|b| b.kind),
        Some(BusKind::L2XBar { width: 64 })
    );

    let paths: Vec<_> = topo.cache_instances().into_iter().map(|(path, _)| path).collect();
    assert_eq!(
        paths,
        vec![
            "cpu_cluster0.cpus0.icache",
            "cpu_cluster0.cpus0.dcache",
            "cpu_cluster0.cpus0.itb_walker_cache",
            "cpu_cluster0.cpus0.dtb_walker_cache",
            "cpu_cluster0.cpus1.icache",
            "cpu_cluster0.cpus1.dcache",
            "cpu_cluster0.cpus1.itb_walker_cache",
            "cpu_cluster0.cpus1.dtb_walker_cache",
            "cpu_cluster0.l2",
            "l3",
        ]
    );
}

#[test]
fn caches_disabled_connects_cores_to_membus() {
    let mut config = config_with(vec![cluster(1, CpuModel::Timing, 2)]);
    config.caches_enabled = false;
    let topo = topology(&config);

    assert!(topo.cache_instances().is_empty());
    assert!(topo.shared_l3.is_none());
    assert!(matches!(topo.interconnect.dma, DmaPath::Bridge(_)));
    for port in ["icache_port", "dcache_port", "mmu.itb_walker", "mmu.dtb_walker"] {
        assert!(topo
            .interconnect
            .is_linked(&format!("cpu_cluster0.cpus0.{port}"), "membus.cpu_side_ports"));
    }
}

#[test]
fn atomic_cluster_gets_no_caches_at_any_depth() {
    let topo = topology(&config_with(vec![cluster(2, CpuModel::Atomic, 2)]));
    assert_eq!(topo.mem_mode, MemoryMode::Atomic);
    assert!(topo.cores().all(|c| c.l1.is_none()));
    assert_eq!(topo.l2_count(), 0);
    assert!(topo.shared_l3.is_some());
    assert!(topo
        .interconnect
        .is_linked("cpu_cluster0.cpus0.icache_port", "toL3Bus.cpu_side_ports"));
    assert!(matches!(topo.interconnect.dma, DmaPath::Bridge(_)));
}

#[test]
fn mixed_clusters_share_l3_at_fastest_clock() {
    let topo = topology(&config_with(vec![
        cluster(2, CpuModel::O3, 3),
        cluster(4, CpuModel::Minor, 1),
    ]));
    assert_eq!(topo.num_cpus(), 6);
    assert_eq!(topo.l2_count(), 2);
    assert_eq!(topo.shared_l3.as_ref().and_then(|l3| l3.clock), Some(Frequency::ghz(3)));
    assert_eq!(
        topo.interconnect.bus("cpu_cluster1.toL2Bus").and_then(|b| b.clock),
        Some(Frequency::ghz(1))
    );
    assert_eq!(topo.mem_mode, MemoryMode::Timing);
}

#[test]
fn timing_and_fast_model_clusters_coexist() {
    let topo = topology(&config_with(vec![
        cluster(1, CpuModel::Timing, 2),
        cluster(2, CpuModel::FastModel, 2),
    ]));
    let fast = topo.cluster(1).unwrap();
    assert!(fast.l2.is_none());
    assert!(fast.cores.iter().all(|c| c.l1.is_none()));
    assert_eq!(topo.interconnect.links_from("cpu_cluster1").count(), 0);
    assert!(topo.cluster(0).unwrap().l2.is_some());
}

#[test]
fn timed_system_uses_io_cache() {
    let topo = topology(&config_with(vec![cluster(1, CpuModel::O3, 2)]));
    let ic = &topo.interconnect;
    assert_eq!(ic.dma.name(), "iocache");
    assert!(ic.is_linked("iocache.mem_side", "membus.cpu_side_ports"));
    assert!(ic.is_linked(&format!("{IOBUS}.mem_side_ports"), "iocache.cpu_side"));
    assert!(ic.is_linked("iobridge.mem_side_port", "iobus.cpu_side_ports"));
    assert!(ic.is_linked("membus.mem_side_ports", "iobridge.cpu_side_port"));
    assert!(ic.is_linked("system_port", "membus.cpu_side_ports"));
}

#[test]
fn memory_ranges_match_request() {
    let topo = topology(&config_with(vec![cluster(1, CpuModel::Atomic, 1)]));
    assert_eq!(topo.allocated_mem_size(), topo.requested_mem_size.as_u64());
    assert_eq!(topo.memory_ranges.len(), 1);
    assert_eq!(topo.memory_ranges[0].start, 0x8000_0000);
}

#[rstest]
#[case(0)]
#[case(4)]
fn invalid_depth_is_reported_before_missing_clusters(#[case] depth: u8) {
    let mut config = config_with(Vec::new());
    config.hierarchy_depth = depth;
    let err = build_topology(&config).unwrap_err();
    assert!(matches!(err, Error::InvalidHierarchyDepth(d) if d == depth));
}

#[test]
fn system_without_clusters_is_rejected() {
    let err = build_topology(&config_with(Vec::new())).unwrap_err();
    assert!(matches!(err, Error::NoClusters));
}

#[test]
fn ignored_policy_knobs_surface_once_per_cluster() {
    let mut o3 = cluster(2, CpuModel::O3, 2);
    o3.caches.l1i = CacheLevelRequest {
        replacement_policy: Some(PolicyKind::Bip),
        preserve_ways: Some(4),
        ..CacheLevelRequest::default()
    };
    o3.caches.l2.preserve_ways = Some(2);
    let mut config = config_with(vec![o3, cluster(1, CpuModel::Timing, 1)]);
    config.hierarchy_depth = 2;
    let topo = topology(&config);

    let preserve_ways = |policy| PolicyParameterMismatch {
        policy,
        parameter: "preserve_ways",
    };
    assert_eq!(
        topo.policy_mismatches().collect::<Vec<_>>(),
        vec![
            (0, CacheLevel::L1I, preserve_ways(PolicyKind::Bip)),
            (0, CacheLevel::L2, preserve_ways(PolicyKind::Lru)),
        ]
    );
    assert!(topo.cluster(1).unwrap().policy_mismatches.is_empty());
}
