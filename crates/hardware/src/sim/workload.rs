//! Kernel boot arguments.

use crate::config::BootConfig;
use crate::soc::SystemTopology;

/// Linux command-line settings for a full-system boot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootArgs {
    /// Console device.
    pub console: String,
    /// Loops per jiffy.
    pub lpj: u64,
    /// Root filesystem device.
    pub root_device: String,
    /// Extra arguments appended at the end.
    pub extra: Vec<String>,
}

impl BootArgs {
    /// Boot arguments from configuration.
    pub fn from_config(config: &BootConfig) -> Self {
        Self {
            console: config.console.clone(),
            lpj: config.lpj,
            root_device: config.root_device.clone(),
            extra: config.extra.clone(),
        }
    }

    /// Kernel command line for `topology`; `mem=` is the system's memory size.
    pub fn command_line(&self, topology: &SystemTopology) -> String {
        let mut args = vec![
            format!("console={}", self.console),
            format!("lpj={}", self.lpj),
            "norandmaps".to_string(),
            format!("root={}", self.root_device),
            "rw".to_string(),
            format!("mem={}", topology.requested_mem_size.to_kernel_arg()),
        ];
        args.extend(self.extra.iter().cloned());
        args.join(" ")
    }
}

impl Default for BootArgs {
    fn default() -> Self {
        Self::from_config(&BootConfig::default())
    }
}
