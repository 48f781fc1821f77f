//! # Unit Value Tests
//!
//! Parsing and formatting of byte sizes, frequencies, and voltages as they
//! appear in configuration files.

use rstest::rstest;
use simtopo_core::common::{ByteSize, Frequency, Voltage};

#[rstest]
#[case("32kB", 32 * 1024)]
#[case("32KiB", 32 * 1024)]
#[case("2GiB", 2 << 30)]
#[case("2GB", 2 << 30)]
#[case("1024kB", 1 << 20)]
#[case("512", 512)]
#[case(" 1.5GB ", 3 << 29)]
fn byte_sizes_use_binary_multiples(#[case] text: &str, #[case] bytes: u64) {
    assert_eq!(text.parse::<ByteSize>().unwrap(), ByteSize(bytes));
}

#[rstest]
#[case("")]
#[case("GB")]
#[case("12 parsecs")]
#[case("-1GB")]
fn malformed_sizes_are_rejected(#[case] text: &str) {
    assert!(text.parse::<ByteSize>().is_err());
}

#[test]
fn kernel_arg_uses_largest_exact_unit() {
    assert_eq!(ByteSize::gib(3).to_kernel_arg(), "3G");
    assert_eq!(ByteSize::mib(1536).to_kernel_arg(), "1536M");
    assert_eq!(ByteSize::kib(4).to_kernel_arg(), "4K");
    assert_eq!(ByteSize(100).to_kernel_arg(), "100");
}

#[test]
fn byte_size_display() {
    assert_eq!(ByteSize::mib(512).to_string(), "512MiB");
    assert_eq!(ByteSize::gib(2).to_string(), "2GiB");
}

#[test]
fn frequencies_parse_and_convert_to_ticks() {
    let f: Frequency = "2GHz".parse().unwrap();
    assert_eq!(f, Frequency::ghz(2));
    assert_eq!(f.period_ticks(), 500);
    assert_eq!("800MHz".parse::<Frequency>().unwrap(), Frequency::mhz(800));
    assert!("0Hz".parse::<Frequency>().is_err());
    assert!("2 GHz!".parse::<Frequency>().is_err());
}

#[test]
fn voltages_are_millivolts() {
    assert_eq!("1.0V".parse::<Voltage>().unwrap(), Voltage::millivolts(1000));
    assert_eq!("950mV".parse::<Voltage>().unwrap(), Voltage::millivolts(950));
    assert_eq!(Voltage::millivolts(950).to_string(), "0.950V");
}

#[test]
fn units_deserialize_from_strings_and_integers() {
    let size: ByteSize = serde_json::from_str("\"64kB\"").unwrap();
    assert_eq!(size, ByteSize::kib(64));
    let size: ByteSize = serde_json::from_str("4096").unwrap();
    assert_eq!(size, ByteSize(4096));

    let clock: Frequency = serde_json::from_str("1000000000").unwrap();
    assert_eq!(clock, Frequency::ghz(1));
    assert!(serde_json::from_str::<Frequency>("0").is_err());
    assert!(serde_json::from_str::<ByteSize>("-5").is_err());
}
