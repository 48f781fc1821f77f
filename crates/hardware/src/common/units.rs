//! Unit-carrying configuration values.
//!
//! Configuration files express sizes, clocks, and voltages the way the
//! engine's parameter system does: `"32kB"`, `"2GiB"`, `"2GHz"`, `"1.0V"`.
//! This module parses those strings into strong types:
//! 1. **`ByteSize`:** Byte counts with binary multiples (`kB` and `KiB` are both 1024).
//! 2. **`Frequency`:** Clock rates in hertz, with a period in engine ticks.
//! 3. **`Voltage`:** Supply voltages, stored in millivolts so they compare exactly.
//!
//! All three deserialize from either a string or a bare integer.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use super::constants::TICKS_PER_SECOND;
use super::error::Error;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

/// Splits `"2.5GHz"` into its numeric part and its unit suffix.
fn split_number(s: &str) -> (&str, &str) {
    let idx = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    (s[..idx].trim(), s[idx..].trim())
}

/// Scales a decimal string by an integer multiplier without going through
/// floating point for whole numbers.
fn scale(number: &str, multiplier: u64) -> Option<u64> {
    if number.is_empty() {
        return None;
    }
    if let Ok(whole) = number.parse::<u64>() {
        return whole.checked_mul(multiplier);
    }
    let value: f64 = number.parse().ok()?;
    let scaled = value * multiplier as f64;
    if !scaled.is_finite() || scaled < 0.0 || scaled > u64::MAX as f64 {
        return None;
    }
    Some(scaled.round() as u64)
}

/// A size in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(pub u64);

impl ByteSize {
    /// Creates a size from a raw byte count.
    pub const fn bytes(n: u64) -> Self {
        Self(n)
    }

    /// Creates a size of `n` KiB.
    pub const fn kib(n: u64) -> Self {
        Self(n * KIB)
    }

    /// Creates a size of `n` MiB.
    pub const fn mib(n: u64) -> Self {
        Self(n * MIB)
    }

    /// Creates a size of `n` GiB.
    pub const fn gib(n: u64) -> Self {
        Self(n * GIB)
    }

    /// Returns the raw byte count.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Formats the size the way the Linux `mem=` boot argument expects
    /// (`K`/`M`/`G` suffixes, largest exact unit).
    pub fn to_kernel_arg(self) -> String {
        match self.0 {
            0 => "0".to_string(),
            n if n % GIB == 0 => format!("{}G", n / GIB),
            n if n % MIB == 0 => format!("{}M", n / MIB),
            n if n % KIB == 0 => format!("{}K", n / KIB),
            n => n.to_string(),
        }
    }
}

impl FromStr for ByteSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, unit) = split_number(s.trim());
        let multiplier = match unit {
            "" | "B" => 1,
            "kB" | "KB" | "KiB" | "k" | "K" => KIB,
            "MB" | "MiB" | "M" => MIB,
            "GB" | "GiB" | "G" => GIB,
            "TB" | "TiB" | "T" => TIB,
            _ => return Err(Error::parse("byte size", s)),
        };
        scale(number, multiplier)
            .map(Self)
            .ok_or_else(|| Error::parse("byte size", s))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "0B"),
            n if n % GIB == 0 => write!(f, "{}GiB", n / GIB),
            n if n % MIB == 0 => write!(f, "{}MiB", n / MIB),
            n if n % KIB == 0 => write!(f, "{}KiB", n / KIB),
            n => write!(f, "{n}B"),
        }
    }
}

/// A clock frequency in hertz.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(pub u64);

impl Frequency {
    /// Creates a frequency of `n` MHz.
    pub const fn mhz(n: u64) -> Self {
        Self(n * 1_000_000)
    }

    /// Creates a frequency of `n` GHz.
    pub const fn ghz(n: u64) -> Self {
        Self(n * 1_000_000_000)
    }

    /// Returns the frequency in hertz.
    pub const fn hz(self) -> u64 {
        self.0
    }

    /// Returns the clock period in engine ticks (picoseconds).
    ///
    /// A zero frequency has no meaningful period and reports `u64::MAX`.
    pub const fn period_ticks(self) -> u64 {
        if self.0 == 0 {
            u64::MAX
        } else {
            TICKS_PER_SECOND / self.0
        }
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::ghz(1)
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, unit) = split_number(s.trim());
        let multiplier = match unit {
            "" | "Hz" => 1,
            "kHz" => 1_000,
            "MHz" => 1_000_000,
            "GHz" => 1_000_000_000,
            _ => return Err(Error::parse("frequency", s)),
        };
        match scale(number, multiplier) {
            Some(hz) if hz > 0 => Ok(Self(hz)),
            _ => Err(Error::parse("frequency", s)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            n if n >= 1_000_000_000 && n % 1_000_000 == 0 => {
                write!(f, "{}GHz", n as f64 / 1e9)
            }
            n if n >= 1_000_000 && n % 1_000 == 0 => write!(f, "{}MHz", n as f64 / 1e6),
            n => write!(f, "{n}Hz"),
        }
    }
}

/// A supply voltage, stored in millivolts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Voltage(pub u32);

impl Voltage {
    /// Creates a voltage from millivolts.
    pub const fn millivolts(mv: u32) -> Self {
        Self(mv)
    }

    /// Returns the voltage in millivolts.
    pub const fn as_millivolts(self) -> u32 {
        self.0
    }
}

impl Default for Voltage {
    fn default() -> Self {
        Self(1000)
    }
}

impl FromStr for Voltage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, unit) = split_number(s.trim());
        let multiplier = match unit {
            "" | "V" => 1000,
            "mV" => 1,
            _ => return Err(Error::parse("voltage", s)),
        };
        scale(number, multiplier)
            .and_then(|mv| u32::try_from(mv).ok())
            .map(Self)
            .ok_or_else(|| Error::parse("voltage", s))
    }
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}V", self.0 / 1000, self.0 % 1000)
    }
}

/// Serde visitor shared by the three unit types: accepts a string through
/// `FromStr` or an unsigned integer through `From<u64>`.
struct UnitVisitor<T> {
    expecting: &'static str,
    from_int: fn(u64) -> Option<T>,
}

impl<T> Visitor<'_> for UnitVisitor<T>
where
    T: FromStr<Err = Error>,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.expecting)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        (self.from_int)(v).ok_or_else(|| E::custom(format!("{v} is out of range")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        let v = u64::try_from(v).map_err(|_| E::custom("negative values are not allowed"))?;
        self.visit_u64(v)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UnitVisitor {
            expecting: "a byte count or a size string such as \"32kB\"",
            from_int: |v| Some(Self(v)),
        })
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UnitVisitor {
            expecting: "a frequency in Hz or a string such as \"2GHz\"",
            from_int: |v| (v > 0).then_some(Self(v)),
        })
    }
}

impl<'de> Deserialize<'de> for Voltage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UnitVisitor {
            expecting: "a voltage in mV or a string such as \"1.0V\"",
            from_int: |v| u32::try_from(v).ok().map(Self),
        })
    }
}
