//! # Cluster Composition Tests
//!
//! CPU id assignment, cluster validation, feature resolution and PMU wiring.

use pretty_assertions::assert_eq;
use simtopo_core::common::{ByteSize, Error, Frequency, PlatformRegion};
use simtopo_core::core::cpu::InstructionLimits;
use simtopo_core::core::units::bru::BranchPredictorConfig;
use simtopo_core::core::units::cache::policies::PolicyKind;
use simtopo_core::core::{CpuModel, MemoryMode};
use simtopo_core::soc::cluster::{ArchEventSource, PmuInterrupt, PmuRequest};
use simtopo_core::soc::{ClusterRequest, CpuClusterComposer, Platform, SystemBuilder, TopologyAssembler};

fn builder(mode: MemoryMode) -> SystemBuilder {
    let platform = Platform::custom("test", vec![PlatformRegion::new(0, ByteSize::gib(4).0)]);
    SystemBuilder::new(platform, ByteSize::gib(1), mode, false).unwrap()
}

#[test]
fn cpu_ids_continue_across_clusters() {
    let mut system = builder(MemoryMode::Timing);
    let big = CpuClusterComposer::compose(
        &mut system,
        ClusterRequest::new(2, CpuModel::O3, Frequency::ghz(3)),
    )
    .unwrap();
    let little = CpuClusterComposer::compose(
        &mut system,
        ClusterRequest::new(3, CpuModel::Minor, Frequency::ghz(1)),
    )
    .unwrap();

    assert_eq!((big, little), (0, 1));
    assert_eq!(system.num_cpus(), 5);
    let ids: Vec<_> = system
        .clusters()
        .iter()
        .flat_map(|c| c.cores.iter().map(|core| (core.cpu_id, core.socket_id)))
        .collect();
    assert_eq!(ids, vec![(0, 0), (1, 0), (2, 1), (3, 1), (4, 1)]);
    assert_eq!(system.clusters()[1].cores[2].path, "cpu_cluster1.cpus2");
    assert_eq!(
        system.clusters()[1].cores[2].interrupt_controller.name,
        "cpu_cluster1.cpus2.interrupts"
    );
}

#[test]
fn empty_cluster_is_rejected() {
    let mut system = builder(MemoryMode::Atomic);
    let err = CpuClusterComposer::compose(
        &mut system,
        ClusterRequest::new(0, CpuModel::Atomic, Frequency::ghz(1)),
    )
    .unwrap_err();
    assert!(matches!(err, Error::EmptyCluster));
    assert_eq!(system.num_clusters(), 0);
}

#[test]
fn zero_threads_per_core_is_rejected() {
    let mut system = builder(MemoryMode::Atomic);
    let mut request = ClusterRequest::new(1, CpuModel::Atomic, Frequency::ghz(1));
    request.threads_per_core = 0;
    let err = CpuClusterComposer::compose(&mut system, request).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { field: "threads_per_core", .. }));
}

#[test]
fn fast_model_cluster_is_capped() {
    let mut system = builder(MemoryMode::AtomicNoncaching);
    let err = CpuClusterComposer::compose(
        &mut system,
        ClusterRequest::new(5, CpuModel::FastModel, Frequency::ghz(2)),
    )
    .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn o3_cores_carry_resolved_features() {
    let mut system = builder(MemoryMode::Timing);
    let mut request = ClusterRequest::new(2, CpuModel::O3, Frequency::ghz(2));
    request.warmup_insts = Some(1_000);
    request.features.limits = InstructionLimits {
        max_insts: Some(10_000),
        total_sim_insts: None,
    };
    request.features.branch_predictor = Some(BranchPredictorConfig {
        btb_entries: Some(8192),
        ..BranchPredictorConfig::default()
    });
    request.caches.l2.replacement_policy = Some(PolicyKind::EmissaryLru);
    let _ = CpuClusterComposer::compose(&mut system, request).unwrap();

    for core in &system.clusters()[0].cores {
        let o3 = core.o3.as_ref().unwrap();
        assert_eq!(o3.max_insts_any_thread, Some(11_000));
        assert!(o3.enable_starvation_emissary);
        let btb = o3.branch_predictor.as_ref().unwrap().btb.unwrap();
        assert_eq!(btb.tag_bits, 49);
    }
}

#[test]
fn invalid_btb_fails_composition() {
    let mut system = builder(MemoryMode::Timing);
    let mut request = ClusterRequest::new(1, CpuModel::O3, Frequency::ghz(2));
    request.features.branch_predictor = Some(BranchPredictorConfig {
        btb_entries: Some(1000),
        ..BranchPredictorConfig::default()
    });
    assert!(CpuClusterComposer::compose(&mut system, request).is_err());
    assert_eq!(system.num_clusters(), 0);
}

#[test]
fn non_o3_cores_ignore_features() {
    let mut system = builder(MemoryMode::Timing);
    let mut request = ClusterRequest::new(1, CpuModel::Timing, Frequency::ghz(2));
    request.features.dump_tms = true;
    let _ = CpuClusterComposer::compose(&mut system, request).unwrap();
    assert!(system.clusters()[0].cores[0].o3.is_none());
}

#[test]
fn pmus_classify_interrupts_and_see_caches() {
    let mut system = builder(MemoryMode::Timing);
    let mut request = ClusterRequest::new(2, CpuModel::O3, Frequency::ghz(2));
    request.pmu = Some(PmuRequest {
        interrupts: vec![23, 40],
        events: vec!["l1i_refill".to_string()],
    });
    let _ = CpuClusterComposer::compose(&mut system, request).unwrap();
    let topology = TopologyAssembler::assemble(system, 2, true).unwrap();

    let cores = &topology.clusters[0].cores;
    let first = cores[0].pmu.as_ref().unwrap();
    let second = cores[1].pmu.as_ref().unwrap();
    assert_eq!(first.interrupt, PmuInterrupt::Ppi(23));
    assert_eq!(second.interrupt, PmuInterrupt::Spi(40));
    assert_eq!(
        first.arch_sources,
        vec![
            ArchEventSource::Core,
            ArchEventSource::Itb,
            ArchEventSource::Dtb,
            ArchEventSource::ICache,
            ArchEventSource::DCache,
            ArchEventSource::L2,
        ]
    );
    assert_eq!(first.events, vec!["l1i_refill".to_string()]);
}

#[test]
fn pmu_count_must_match_cores() {
    let mut system = builder(MemoryMode::Atomic);
    let mut request = ClusterRequest::new(2, CpuModel::Atomic, Frequency::ghz(2));
    request.pmu = Some(PmuRequest {
        interrupts: vec![23],
        events: Vec::new(),
    });
    let _ = CpuClusterComposer::compose(&mut system, request).unwrap();
    let err = TopologyAssembler::assemble(system, 1, false).unwrap_err();
    assert!(matches!(
        err,
        Error::PmuInterruptCount {
            cluster: 0,
            given: 1,
            cores: 2
        }
    ));
}
