

/// Byte size, frequency, and voltage parsing.
pub mod units;
