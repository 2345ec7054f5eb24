//! Command line arguments of the `tof` tool.

use clap::Parser;

use crate::{config::ConfigError, DistanceMode};

/// VL53L1X distance reader. Prints one distance in millimeters per line.
#[derive(Parser, Debug)]
#[command(name = "tof", version)]
pub struct Args {
    /// I2C bus index or '/dev/i2c-<n>'
    #[arg(long, env = "AMUST_TOF_BUS", default_value = "1")]
    pub bus: String,

    /// I2C address (e.g. 0x29)
    #[arg(long, env = "AMUST_TOF_ADDR", default_value = "0x29")]
    pub addr: String,

    /// Polling interval in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 0.5)]
    pub interval: f64,

    /// Total duration in seconds (0 = infinite)
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub duration: f64,

    /// Distance mode
    #[arg(long, value_enum, default_value_t = DistanceMode::Short)]
    pub mode: DistanceMode,

    /// Timing budget in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 33)]
    pub timing_budget: u16,

    /// Inter-measurement period in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 50)]
    pub inter_measurement: u32,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a bus given as an index (`1`) or a device path (`/dev/i2c-1`).
pub fn parse_bus(bus: &str) -> Result<u8, ConfigError> {
    let bus = bus.trim();
    let index = bus.strip_prefix("/dev/i2c-").unwrap_or(bus);
    index
        .parse()
        .map_err(|_| ConfigError::InvalidBus(bus.to_owned()))
}

/// Parse a 7-bit address. `0x`, `0o` and `0b` prefixes select the radix,
/// anything else is decimal. Signs, `_` separators and leading zeros on a
/// decimal (`00`, `041`) are refused.
pub fn parse_addr(addr: &str) -> Result<u16, ConfigError> {
    let invalid = || ConfigError::InvalidAddress(addr.to_owned());
    let trimmed = addr.trim();
    let lower = trimmed.to_ascii_lowercase();

    let (digits, radix) = match lower.get(..2) {
        Some("0x") => (&lower[2..], 16),
        Some("0o") => (&lower[2..], 8),
        Some("0b") => (&lower[2..], 2),
        _ => (lower.as_str(), 10),
    };

    // "010" is ambiguous, so leading zeros are only allowed on plain zero
    if digits.is_empty()
        || digits.starts_with('+')
        || (radix == 10 && digits.len() > 1 && digits.starts_with('0'))
    {
        return Err(invalid());
    }

    let value = u32::from_str_radix(digits, radix).map_err(|_| invalid())?;
    if value > 0x7f {
        return Err(ConfigError::AddressOutOfRange(value));
    }

    Ok(value as u16)
}
