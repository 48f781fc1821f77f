//! Platform descriptions.
//!
//! A platform supplies the ordered physical memory regions a system's memory
//! is carved from, and where the interrupt controller's CPU interface sits.
//! Presets cover the boards the system is usually composed for; custom
//! region lists come from configuration.

use serde::Deserialize;

use crate::common::{ByteSize, PlatformRegion};

/// Platform presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// Versatile Express style board with a GICv2 CPU interface.
    #[serde(alias = "VExpress_GEM5_V1")]
    VexpressGem5V1,
    /// QEMU `virt` style board.
    #[default]
    #[serde(alias = "QEMU_Virt")]
    QemuVirt,
    /// QEMU `virt` board with an Apple M1 style memory map.
    #[serde(alias = "QEMU_VirtM1")]
    QemuVirtM1,
}

/// A platform's memory map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Platform {
    /// Platform name.
    pub name: String,
    /// Physical memory regions, in allocation order.
    pub mem_regions: Vec<PlatformRegion>,
    /// Base address of the interrupt controller's CPU interface, if memory-mapped.
    pub gic_cpu_addr: Option<u64>,
}

impl Platform {
    /// Builds a preset platform.
    pub fn preset(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::VexpressGem5V1 => Self {
                name: "VExpress_GEM5_V1".to_string(),
                mem_regions: vec![PlatformRegion::new(0x8000_0000, ByteSize::gib(510).0)],
                gic_cpu_addr: Some(0x2c00_2000),
            },
            PlatformKind::QemuVirt => Self {
                name: "QEMU_Virt".to_string(),
                mem_regions: vec![
                    PlatformRegion::new(0x4000_0000, ByteSize::gib(3).0),
                    PlatformRegion::new(0x1_0000_0000, ByteSize::gib(252).0),
                ],
                gic_cpu_addr: Some(0x0801_0000),
            },
            PlatformKind::QemuVirtM1 => Self {
                name: "QEMU_VirtM1".to_string(),
                mem_regions: vec![PlatformRegion::new(0x8_0000_0000, ByteSize::gib(64).0)],
                gic_cpu_addr: None,
            },
        }
    }

    /// Builds a platform from an explicit region list.
    pub fn custom(name: impl Into<String>, mem_regions: Vec<PlatformRegion>) -> Self {
        Self {
            name: name.into(),
            mem_regions,
            gic_cpu_addr: None,
        }
    }

    /// Total bytes the platform's regions can hold.
    pub fn capacity(&self) -> u64 {
        self.mem_regions
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.size))
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::preset(PlatformKind::default())
    }
}
