use simtopo_core::SystemTopology;
use simtopo_core::build_topology;
use simtopo_core::common::{ByteSize, Frequency, PlatformRegion};
use simtopo_core::config::{ClusterConfig, SimConfig};
use simtopo_core::core::CpuModel;
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once per process; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A cluster of `cores` cores of `model` at `ghz` GHz.
pub fn cluster(cores: usize, model: CpuModel, ghz: u64) -> ClusterConfig {
    ClusterConfig {
        cores,
        cpu_model: model,
        clock: Frequency::ghz(ghz),
        ..ClusterConfig::default()
    }
}

/// A 1 GiB system on one flat 4 GiB region with the given clusters.
pub fn config_with(clusters: Vec<ClusterConfig>) -> SimConfig {
    SimConfig {
        mem_regions: Some(vec![PlatformRegion::new(0x8000_0000, ByteSize::gib(4).0)]),
        mem_size: ByteSize::gib(1),
        clusters,
        ..SimConfig::default()
    }
}

/// Builds the topology `config` describes, panicking on composition errors.
pub fn topology(config: &SimConfig) -> SystemTopology {
    init_tracing();
    build_topology(config).expect("topology should compose")
}
