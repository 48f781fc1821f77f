//! # CPU Model Tests

use rstest::rstest;
use simtopo_core::core::{CpuModel, MemoryMode};

#[rstest]
#[case(CpuModel::Atomic, MemoryMode::Atomic, false)]
#[case(CpuModel::Timing, MemoryMode::Timing, true)]
#[case(CpuModel::Minor, MemoryMode::Timing, true)]
#[case(CpuModel::Hpi, MemoryMode::Timing, true)]
#[case(CpuModel::O3, MemoryMode::Timing, true)]
#[case(CpuModel::Kvm, MemoryMode::AtomicNoncaching, false)]
#[case(CpuModel::FastModel, MemoryMode::AtomicNoncaching, false)]
fn memory_mode_decides_caching(
    #[case] model: CpuModel,
    #[case] mode: MemoryMode,
    #[case] caches: bool,
) {
    assert_eq!(model.memory_mode(), mode);
    assert_eq!(model.requires_caches(), caches);
}

#[test]
fn only_pipelined_models_cache_walks() {
    assert!(!CpuModel::Timing.requires_walk_caches());
    assert!(CpuModel::Minor.requires_walk_caches());
    assert!(CpuModel::O3.requires_walk_caches());
    assert!(!CpuModel::Atomic.requires_walk_caches());
}

#[test]
fn hpi_carries_its_own_presets() {
    let hpi = CpuModel::Hpi.cache_templates();
    let classic = CpuModel::O3.cache_templates();
    assert_ne!(hpi.l1i, classic.l1i);
    assert!(CpuModel::Kvm.cache_templates().l1i.is_none());
}

#[test]
fn model_names_accept_engine_spellings() {
    let models: Vec<CpuModel> =
        serde_json::from_str(r#"["atomic", "TimingSimpleCPU", "ooo", "O3CPU", "hpi", "kvm"]"#)
            .unwrap();
    assert_eq!(
        models,
        vec![
            CpuModel::Atomic,
            CpuModel::Timing,
            CpuModel::O3,
            CpuModel::O3,
            CpuModel::Hpi,
            CpuModel::Kvm
        ]
    );
    assert_eq!(CpuModel::O3.to_string(), "DerivO3CPU");
}
