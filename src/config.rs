//! Validated runtime configuration of the `tof` tool.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{
    cli::{parse_addr, parse_bus, Args},
    poll::PollSettings,
    DistanceMode, RangingConfig,
};

/// Shortest polling interval; faster requests are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(50);

/// Environment variable that turns the reader off when truthy.
pub const DISABLE_ENV: &str = "AMUST_DISABLE_TOF";

/// Invalid command line input.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// The bus is neither an index nor `/dev/i2c-<n>`.
    #[error("invalid bus: {0}")]
    InvalidBus(String),

    /// The address is not an integer.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The address does not fit in seven bits.
    #[error("address {0:#x} is not a 7-bit address")]
    AddressOutOfRange(u32),

    /// Negative, NaN or too large an interval.
    #[error("invalid interval: {0}")]
    InvalidInterval(f64),

    /// NaN duration.
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),

    /// The timing budget is not available in the chosen mode.
    #[error("timing budget of {budget_ms} ms is not supported in {mode:?} mode")]
    UnsupportedTimingBudget {
        /// Chosen distance mode.
        mode: DistanceMode,
        /// Requested budget.
        budget_ms: u16,
    },

    /// The sensor would be asked to start a measurement before the last one
    /// finished.
    #[error("inter-measurement period of {period_ms} ms is shorter than the {budget_ms} ms timing budget")]
    InterMeasurementTooShort {
        /// Requested period.
        period_ms: u32,
        /// Requested budget.
        budget_ms: u16,
    },
}

/// Everything needed to open the sensor and poll it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// i2c-dev node, e.g. `/dev/i2c-1`.
    pub bus_path: PathBuf,
    /// 7-bit sensor address.
    pub address: u16,
    /// Loop timing.
    pub poll: PollSettings,
    /// Sensor setup.
    pub ranging: RangingConfig,
}

impl TryFrom<&Args> for Config {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let bus = parse_bus(&args.bus)?;
        let address = parse_addr(&args.addr)?;

        let interval = Duration::try_from_secs_f64(args.interval)
            .map_err(|_| ConfigError::InvalidInterval(args.interval))?
            .max(MIN_INTERVAL);

        if args.duration.is_nan() {
            return Err(ConfigError::InvalidDuration(args.duration));
        }
        // too long to represent is as good as forever
        let duration = if args.duration > 0.0 {
            Duration::try_from_secs_f64(args.duration).ok()
        } else {
            None
        };

        let ranging = RangingConfig {
            mode: args.mode,
            timing_budget_ms: args.timing_budget,
            inter_measurement_ms: args.inter_measurement,
        };
        validate_ranging(&ranging)?;

        Ok(Self {
            bus_path: PathBuf::from(format!("/dev/i2c-{bus}")),
            address,
            poll: PollSettings { interval, duration },
            ranging,
        })
    }
}

fn validate_ranging(ranging: &RangingConfig) -> Result<(), ConfigError> {
    if !ranging.mode.supports_timing_budget(ranging.timing_budget_ms) {
        return Err(ConfigError::UnsupportedTimingBudget {
            mode: ranging.mode,
            budget_ms: ranging.timing_budget_ms,
        });
    }

    if ranging.inter_measurement_ms < u32::from(ranging.timing_budget_ms) {
        return Err(ConfigError::InterMeasurementTooShort {
            period_ms: ranging.inter_measurement_ms,
            budget_ms: ranging.timing_budget_ms,
        });
    }

    Ok(())
}

/// Whether `value` reads as "on": `1`, `true`, `yes` or `on`, in any case.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether a [`DISABLE_ENV`] value asks for the reader to stay off. An unset
/// variable does not.
pub fn disabled_by(value: Option<&str>) -> bool {
    value.is_some_and(is_truthy)
}

/// [`disabled_by`] applied to the process environment.
pub fn disabled_by_env() -> bool {
    disabled_by(std::env::var(DISABLE_ENV).ok().as_deref())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(extra: &[&str]) -> Result<Config, ConfigError> {
        let mut argv = vec!["tof"];
        argv.extend_from_slice(extra);
        Config::try_from(&Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_match_the_stock_setup() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.bus_path, PathBuf::from("/dev/i2c-1"));
        assert_eq!(config.address, 0x29);
        assert_eq!(config.poll.interval, Duration::from_millis(500));
        assert_eq!(config.poll.duration, None);
        assert_eq!(config.ranging, RangingConfig::default());
    }

    #[test]
    fn bus_path_form() {
        let args = Args::try_parse_from(["tof", "--bus", "/dev/i2c-4", "--addr", "41"]).unwrap();
        let config = Config::try_from(&args).unwrap();
        assert_eq!(config.bus_path, PathBuf::from("/dev/i2c-4"));
        assert_eq!(config.address, 41);
    }

    #[test]
    fn interval_is_floored() {
        let config = parse(&["--interval", "0"]).unwrap();
        assert_eq!(config.poll.interval, MIN_INTERVAL);
        let config = parse(&["--interval", "0.2"]).unwrap();
        assert_eq!(config.poll.interval, Duration::from_millis(200));
    }

    #[test]
    fn negative_interval_is_rejected() {
        assert_eq!(
            parse(&["--interval=-1"]),
            Err(ConfigError::InvalidInterval(-1.0))
        );
        assert!(matches!(
            parse(&["--interval", "inf"]),
            Err(ConfigError::InvalidInterval(_))
        ));
        assert!(matches!(
            parse(&["--interval", "NaN"]),
            Err(ConfigError::InvalidInterval(_))
        ));
    }

    #[test]
    fn huge_interval_is_rejected_not_a_panic() {
        assert_eq!(
            parse(&["--interval", "1e20"]),
            Err(ConfigError::InvalidInterval(1e20))
        );
    }

    #[test]
    fn unrepresentable_duration_is_infinite() {
        assert_eq!(parse(&["--duration", "1e20"]).unwrap().poll.duration, None);
        assert_eq!(parse(&["--duration", "inf"]).unwrap().poll.duration, None);
        assert_eq!(parse(&["--duration=-inf"]).unwrap().poll.duration, None);
    }

    #[test]
    fn non_positive_duration_is_infinite() {
        assert_eq!(parse(&["--duration", "0"]).unwrap().poll.duration, None);
        assert_eq!(parse(&["--duration=-3"]).unwrap().poll.duration, None);
        assert_eq!(
            parse(&["--duration", "2.5"]).unwrap().poll.duration,
            Some(Duration::from_millis(2500))
        );
        assert!(matches!(
            parse(&["--duration", "NaN"]),
            Err(ConfigError::InvalidDuration(_))
        ));
    }

    #[test]
    fn ranging_is_checked() {
        assert_eq!(
            parse(&["--mode", "long", "--timing-budget", "15"]),
            Err(ConfigError::UnsupportedTimingBudget {
                mode: DistanceMode::Long,
                budget_ms: 15
            })
        );
        assert_eq!(
            parse(&["--timing-budget", "100", "--inter-measurement", "50"]),
            Err(ConfigError::InterMeasurementTooShort {
                period_ms: 50,
                budget_ms: 100
            })
        );
        assert!(parse(&["--timing-budget", "100", "--inter-measurement", "100"]).is_ok());
    }

    #[test]
    fn bad_address_surfaces() {
        assert_eq!(
            parse(&["--addr", "0x100"]),
            Err(ConfigError::AddressOutOfRange(0x100))
        );
    }

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "TRUE", "Yes", "on"] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["", "0", "false", "off", "no", "2"] {
            assert!(!is_truthy(v), "{v}");
        }
    }

    #[test]
    fn disable_switch() {
        assert!(!disabled_by(None));
        assert!(!disabled_by(Some("")));
        assert!(!disabled_by(Some("0")));
        assert!(disabled_by(Some("1")));
        assert!(disabled_by(Some("True")));
    }
}
