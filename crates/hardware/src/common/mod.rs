//! Common types used throughout the composition layer.
//!
//! This module provides the building blocks shared by every component. It includes:
//! 1. **Address Types:** Half-open physical address ranges for regions and allocations.
//! 2. **Units:** Byte sizes, clock frequencies, and voltages parsed from configuration strings.
//! 3. **Constants:** Tick resolution, crossbar widths, and run-control strings.
//! 4. **Error Handling:** The crate-wide error enum and result alias.

/// Address range type definitions.
pub mod addr;

/// Common constants used throughout the crate.
pub mod constants;

/// Error types.
pub mod error;

/// Unit-carrying values (sizes, frequencies, voltages).
pub mod units;

pub use addr::{AddrRange, MemoryRange, PlatformRegion};
pub use error::{Error, Result, TransitionFault};
pub use units::{ByteSize, Frequency, Voltage};
