//! # Kernel Command Line Tests

use simtopo_core::common::ByteSize;
use simtopo_core::core::CpuModel;
use simtopo_core::sim::BootArgs;

use crate::common::harness::{cluster, config_with, topology};

#[test]
fn command_line_reflects_memory_size() {
    let mut config = config_with(vec![cluster(1, CpuModel::Atomic, 2)]);
    config.mem_size = ByteSize::gib(3);
    let topo = topology(&config);
    assert_eq!(
        BootArgs::default().command_line(&topo),
        "console=ttyAMA0 lpj=19988480 norandmaps root=/dev/vda rw mem=3G"
    );
}

#[test]
fn extra_arguments_are_appended() {
    let topo = topology(&config_with(vec![cluster(1, CpuModel::Atomic, 2)]));
    let args = BootArgs {
        root_device: "/dev/sda1".to_string(),
        extra: vec!["init=/sbin/init".to_string(), "quiet".to_string()],
        ..BootArgs::default()
    };
    let line = args.command_line(&topo);
    assert!(line.contains("root=/dev/sda1"));
    assert!(line.contains("mem=1G"));
    assert!(line.ends_with("init=/sbin/init quiet"));
}
