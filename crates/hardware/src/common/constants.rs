//! Global constants.
//!
//! This module defines values shared across the composition layer. It includes:
//! 1. **Time:** Engine tick resolution.
//! 2. **Interconnect:** Crossbar widths and bridge delays used when wiring buses.
//! 3. **Interrupts:** The PPI/SPI boundary used when assigning PMU interrupts.
//! 4. **Run control:** Exit causes and checkpoint directory naming.

/// Engine ticks per simulated second (one tick is one picosecond).
pub const TICKS_PER_SECOND: u64 = 1_000_000_000_000;

/// System cache line size in bytes.
pub const CACHE_LINE_BYTES: u32 = 64;

/// Width in bytes of the L2 and L3 crossbars.
pub const CACHE_XBAR_WIDTH: u32 = 64;

/// Delay of the I/O and DMA bridges, in nanoseconds.
pub const BRIDGE_DELAY_NS: u32 = 50;

/// Interrupt numbers below this value are private peripheral interrupts (PPIs);
/// the rest are shared peripheral interrupts (SPIs).
pub const SPI_BASE: u32 = 32;

/// Exit cause reported by the engine when a `simulate` tick budget runs out.
pub const CAUSE_LIMIT_REACHED: &str = "simulate() limit reached";

/// Exit cause reported by the engine when the workload requests a checkpoint.
pub const CAUSE_CHECKPOINT: &str = "checkpoint";

/// Prefix of checkpoint directory names; the capture tick is appended.
pub const CHECKPOINT_DIR_PREFIX: &str = "cpt.";
