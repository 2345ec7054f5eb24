//! Async driver for the [VL53L1X ToF distance sensor](https://www.st.com/en/imaging-and-photonics-solutions/vl53l1x.html),
//! plus the pieces of the `tof` polling tool.
//!
//! ```no_run
//! # tokio_test::block_on(async {
//! use vl53l1x_reader::{RangingConfig, Vl53l1x};
//! use vl53l1x_reader::i2cdev::linux::LinuxI2CDevice;
//!
//! let dev = LinuxI2CDevice::new("/dev/i2c-1", vl53l1x_reader::PERIPHERAL_ADDR)?;
//! let mut vl53 = Vl53l1x::new(dev);
//!
//! vl53.init().await?;
//! vl53.configure(&RangingConfig::default())?;
//! vl53.start_ranging()?;
//!
//! loop {
//!     let measurement = vl53.measure().await?;
//!     if measurement.is_valid() {
//!         println!("{} mm", measurement.distance);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

#![warn(missing_docs)]

pub use i2cdev;

#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod config;
pub mod i2c;
pub mod poll;

use core::time::Duration;

use i2c::{Bus, Device};

#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

const DEFAULT_CONFIG_MSG: &[u8] = &[
    0x00, // first byte of register to write to
    0x2d, // second byte of register to write to
    // value    addr : description
    0x00, // 0x2d : set bit 2 and 5 to 1 for fast plus mode (1MHz I2C), else don't touch
    0x00, // 0x2e : bit 0 if I2C pulled up at 1.8V, else set bit 0 to 1 (pull up at AVDD)
    0x00, // 0x2f : bit 0 if GPIO pulled up at 1.8V, else set bit 0 to 1 (pull up at AVDD)
    0x01, // 0x30 : set bit 4 to 0 for active high interrupt and 1 for active low (bits 3:0 must be 0x1)
    0x02, // 0x31 : bit 1 = interrupt depending on the polarity
    0x00, // 0x32 : not user-modifiable
    0x02, // 0x33 : not user-modifiable
    0x08, // 0x34 : not user-modifiable
    0x00, // 0x35 : not user-modifiable
    0x08, // 0x36 : not user-modifiable
    0x10, // 0x37 : not user-modifiable
    0x01, // 0x38 : not user-modifiable
    0x01, // 0x39 : not user-modifiable
    0x00, // 0x3a : not user-modifiable
    0x00, // 0x3b : not user-modifiable
    0x00, // 0x3c : not user-modifiable
    0x00, // 0x3d : not user-modifiable
    0xFF, // 0x3e : not user-modifiable
    0x00, // 0x3f : not user-modifiable
    0x0F, // 0x40 : not user-modifiable
    0x00, // 0x41 : not user-modifiable
    0x00, // 0x42 : not user-modifiable
    0x00, // 0x43 : not user-modifiable
    0x00, // 0x44 : not user-modifiable
    0x00, // 0x45 : not user-modifiable
    0x20, // 0x46 : interrupt configuration 0->level low detection, 1-> level high, 2-> Out of window, 3->In window, 0x20-> New sample ready , TBC
    0x0B, // 0x47 : not user-modifiable
    0x00, // 0x48 : not user-modifiable
    0x00, // 0x49 : not user-modifiable
    0x02, // 0x4a : not user-modifiable
    0x0A, // 0x4b : not user-modifiable
    0x21, // 0x4c : not user-modifiable
    0x00, // 0x4d : not user-modifiable
    0x00, // 0x4e : not user-modifiable
    0x05, // 0x4f : not user-modifiable
    0x00, // 0x50 : not user-modifiable
    0x00, // 0x51 : not user-modifiable
    0x00, // 0x52 : not user-modifiable
    0x00, // 0x53 : not user-modifiable
    0xC8, // 0x54 : not user-modifiable
    0x00, // 0x55 : not user-modifiable
    0x00, // 0x56 : not user-modifiable
    0x38, // 0x57 : not user-modifiable
    0xFF, // 0x58 : not user-modifiable
    0x01, // 0x59 : not user-modifiable
    0x00, // 0x5a : not user-modifiable
    0x08, // 0x5b : not user-modifiable
    0x00, // 0x5c : not user-modifiable
    0x00, // 0x5d : not user-modifiable
    0x01, // 0x5e : not user-modifiable
    0xCC, // 0x5f : not user-modifiable
    0x0F, // 0x60 : not user-modifiable
    0x01, // 0x61 : not user-modifiable
    0xF1, // 0x62 : not user-modifiable
    0x0D, // 0x63 : not user-modifiable
    0x01, // 0x64 : Sigma threshold MSB (mm in 14.2 format for MSB+LSB), default value 90 mm
    0x68, // 0x65 : Sigma threshold LSB
    0x00, // 0x66 : Min count Rate MSB (MCPS in 9.7 format for MSB+LSB)
    0x80, // 0x67 : Min count Rate LSB
    0x08, // 0x68 : not user-modifiable
    0xB8, // 0x69 : not user-modifiable
    0x00, // 0x6a : not user-modifiable
    0x00, // 0x6b : not user-modifiable
    0x00, // 0x6c : Intermeasurement period MSB, 32 bits register
    0x00, // 0x6d : Intermeasurement period
    0x0F, // 0x6e : Intermeasurement period
    0x89, // 0x6f : Intermeasurement period LSB
    0x00, // 0x70 : not user-modifiable
    0x00, // 0x71 : not user-modifiable
    0x00, // 0x72 : distance threshold high MSB (in mm, MSB+LSB)
    0x00, // 0x73 : distance threshold high LSB
    0x00, // 0x74 : distance threshold low MSB ( in mm, MSB+LSB)
    0x00, // 0x75 : distance threshold low LSB
    0x00, // 0x76 : not user-modifiable
    0x01, // 0x77 : not user-modifiable
    0x0F, // 0x78 : not user-modifiable
    0x0D, // 0x79 : not user-modifiable
    0x0E, // 0x7a : not user-modifiable
    0x0E, // 0x7b : not user-modifiable
    0x00, // 0x7c : not user-modifiable
    0x00, // 0x7d : not user-modifiable
    0x02, // 0x7e : not user-modifiable
    0xC7, // 0x7f : ROI center
    0xFF, // 0x80 : XY ROI (X=Width, Y=Height)
    0x9B, // 0x81 : not user-modifiable
    0x00, // 0x82 : not user-modifiable
    0x00, // 0x83 : not user-modifiable
    0x00, // 0x84 : not user-modifiable
    0x01, // 0x85 : not user-modifiable
    0x00, // 0x86 : clear interrupt, 0x01=clear
    0x00, // 0x87 : ranging, 0x00=stop, 0x40=start
];

#[derive(Debug, Clone, Copy)]
#[allow(non_camel_case_types)]
pub(crate) enum Register {
    VHV_CONFIG_TIMEOUT_MACROP_LOOP_BOUND = 0x0008,
    VHV_CONFIG_INIT = 0x000b,
    GPIO_HV_MUX_CTRL = 0x0030,
    GPIO_TIO_HV_STATUS = 0x0031,
    PHASECAL_CONFIG_TIMEOUT_MACROP = 0x004b,
    RANGE_CONFIG_TIMEOUT_MACROP_A = 0x005e,
    RANGE_CONFIG_VCSEL_PERIOD_A = 0x0060,
    RANGE_CONFIG_TIMEOUT_MACROP_B = 0x0061,
    RANGE_CONFIG_VCSEL_PERIOD_B = 0x0063,
    RANGE_CONFIG_VALID_PHASE_HIGH = 0x0069,
    INTERMEASUREMENT_PERIOD = 0x006c,
    SD_CONFIG_WOI_SD0 = 0x0078,
    SD_CONFIG_INITIAL_PHASE_SD0 = 0x007a,
    SYSTEM_INTERRUPT_CLEAR = 0x0086,
    SYSTEM_MODE_START = 0x0087,
    RESULT_RANGE_STATUS = 0x0089,
    RESULT_DISTANCE = 0x0096,
    RESULT_OSC_CALIBRATE_VAL = 0x00de,
    FIRMWARE_SYSTEM_STATUS = 0x00e5,
    IDENTIFICATION_MODEL_ID = 0x010f,
}

impl Register {
    pub(crate) const fn addr(&self) -> u16 {
        *self as u16
    }

    pub(crate) const fn as_bytes(&self) -> [u8; 2] {
        self.addr().to_be_bytes()
    }
}

/// Default I<sup>2</sup>C address of the VL53L1X.
pub const PERIPHERAL_ADDR: u16 = 0x29;

/// Model id reported by every VL53L1X.
pub const SENSOR_ID: u16 = 0xeacc;

/// Poll interval for [`Vl53l1x::wait_for_measurement`] and the boot wait.
pub const DATA_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How many times the sensor is polled before giving up, roughly one second.
pub const POLL_ATTEMPTS: u16 = 1000;

/// Length of the result block starting at `RESULT__RANGE_STATUS`.
const RESULT_LEN: usize = 17;

/// Range status codes as remapped by the vendor driver, indexed by the raw
/// five-bit device status.
const RANGE_STATUS: [u8; 24] = [
    255, 255, 255, 5, 2, 4, 1, 7, 3, 0, 255, 255, 9, 13, 255, 255, 255, 255, 10, 6, 255, 255, 11,
    12,
];

/// Driver errors.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The bus transfer failed.
    #[error("i2c transfer failed")]
    I2c(#[source] E),
    /// The sensor did not reach the awaited state in time.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    /// Something other than a VL53L1X answered.
    #[error("unexpected sensor id {0:#06x}")]
    InvalidSensorId(u16),
    /// The timing budget is not available in the given distance mode.
    #[error("timing budget of {budget_ms} ms is not supported in {mode:?} mode")]
    UnsupportedTimingBudget {
        /// Distance mode in effect.
        mode: DistanceMode,
        /// Requested budget.
        budget_ms: u16,
    },
    /// The phase calibration register holds neither known distance mode.
    #[error("unknown distance mode register value {0:#04x}")]
    UnknownDistanceMode(u8),
    /// The timeout register holds no known timing budget.
    #[error("unknown timing budget register value {0:#06x}")]
    UnknownTimingBudget(u16),
    /// The oscillator calibration value reads zero.
    #[error("oscillator calibration value is zero")]
    OscillatorUncalibrated,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

/// Distance mode. Short mode is more immune to ambient light, long mode
/// reaches up to 4 m in the dark.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DistanceMode {
    /// Up to 1.3 m.
    #[default]
    Short,
    /// Up to 4 m.
    Long,
}

impl DistanceMode {
    /// `RANGE_CONFIG__TIMEOUT_MACROP_A` and `_B` for a timing budget.
    const fn timeout_macrop(self, budget_ms: u16) -> Option<(u16, u16)> {
        match (self, budget_ms) {
            (Self::Short, 15) => Some((0x001d, 0x0027)),
            (Self::Short, 20) => Some((0x0051, 0x006e)),
            (Self::Short, 33) => Some((0x00d6, 0x006e)),
            (Self::Short, 50) => Some((0x01ae, 0x01e8)),
            (Self::Short, 100) => Some((0x02e1, 0x0388)),
            (Self::Short, 200) => Some((0x03e1, 0x0496)),
            (Self::Short, 500) => Some((0x0591, 0x05c1)),
            (Self::Long, 20) => Some((0x001e, 0x0022)),
            (Self::Long, 33) => Some((0x0060, 0x006e)),
            (Self::Long, 50) => Some((0x00ad, 0x00c6)),
            (Self::Long, 100) => Some((0x01cc, 0x01ea)),
            (Self::Long, 200) => Some((0x02d9, 0x02f8)),
            (Self::Long, 500) => Some((0x048f, 0x04a4)),
            _ => None,
        }
    }

    /// Whether the sensor accepts `budget_ms` in this mode.
    pub const fn supports_timing_budget(self, budget_ms: u16) -> bool {
        self.timeout_macrop(budget_ms).is_some()
    }
}

/// Ranging parameters applied by [`Vl53l1x::configure`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RangingConfig {
    /// Distance mode.
    pub mode: DistanceMode,
    /// Time the sensor spends on one measurement (milliseconds).
    pub timing_budget_ms: u16,
    /// Period between the start of two measurements (milliseconds). Must not
    /// be less than the timing budget.
    pub inter_measurement_ms: u32,
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            mode: DistanceMode::Short,
            timing_budget_ms: 33,
            inter_measurement_ms: 50,
        }
    }
}

/// Level of the `GPIO1` interrupt output when a measurement is ready.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Polarity {
    /// Pin goes high on a new sample.
    ActiveHigh,
    /// Pin goes low on a new sample.
    ActiveLow,
}

/// A measurement status.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Status {
    /// Returned distance is valid.
    Valid = 0,
    /// Sigma is above the defined threshold.
    SigmaFail = 1,
    /// Signal is below the defined threshold.
    SignalFail = 2,
    /// Target is below the minimum range, distance is clipped.
    MinRangeClipped = 3,
    /// Phase out of valid limit.
    OutOfBounds = 4,
    /// Hardware failure.
    HardwareFail = 5,
    /// Phase valid but no wrap around check performed.
    NoWrapCheck = 6,
    /// Wrapped target, phase does not match.
    WrappedTarget = 7,
    /// Crosstalk signal fail.
    XTalkFail = 9,
    /// First interrupt after ranging was started.
    Synchronisation = 10,
    /// Several targets merged into one pulse.
    MergedPulse = 11,
    /// A target is present but the signal is too weak.
    LackOfSignal = 12,
    /// Minimum range check failed.
    MinRangeFail = 13,
    /// Other error (e.g. boot error).
    Other = 255,
}

/// Severity of a measurement status.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub enum Severity {
    /// The measurement is completely valid.
    None,
    /// The computed measurement might be somewhat correct.
    Warning,
    /// Something went very wrong.
    Error,
}

impl Status {
    const fn from_rtn(rtn: u8) -> Self {
        let code = if (rtn as usize) < RANGE_STATUS.len() {
            RANGE_STATUS[rtn as usize]
        } else {
            rtn
        };

        match code {
            0 => Self::Valid,
            1 => Self::SigmaFail,
            2 => Self::SignalFail,
            3 => Self::MinRangeClipped,
            4 => Self::OutOfBounds,
            5 => Self::HardwareFail,
            6 => Self::NoWrapCheck,
            7 => Self::WrappedTarget,
            9 => Self::XTalkFail,
            10 => Self::Synchronisation,
            11 => Self::MergedPulse,
            12 => Self::LackOfSignal,
            13 => Self::MinRangeFail,
            _ => Self::Other,
        }
    }

    /// Severity of this status as per the user manual.
    pub const fn severity(&self) -> Severity {
        match self {
            Status::Valid => Severity::None,
            Status::MinRangeClipped | Status::NoWrapCheck | Status::MergedPulse => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

/// A VL53L1X measurement.
#[derive(Debug, Clone, Copy)]
pub struct Measurement {
    /// Validity of the measurement.
    pub status: Status,
    /// Measured distance to the target (millimeters).
    pub distance: u16,
    /// Ambient rate measurement performed on the
    /// return array, with no active photon emission, to
    /// measure the ambient signal rate due to noise.
    ///
    /// The returned value is measured in thousand counts
    /// per second (kcps) (10<sup>3</sup> * s<sup>-1</sup>).
    pub ambient_rate: u16,
    /// Signal rate per enabled SPAD (kcps).
    pub signal_per_spad: u16,
    /// Number of SPADs enabled for this measurement. Targets that
    /// are far away or have low reflectance will activate
    /// more SPADs.
    pub spads_enabled: u8,
}

impl Measurement {
    /// Whether this measurement is valid or not, given its status.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.status == Status::Valid
    }

    fn from_result_block(buf: &[u8; RESULT_LEN]) -> Self {
        Self {
            status: Status::from_rtn(buf[0] & 0x1f),
            spads_enabled: buf[3],
            ambient_rate: u16::from_be_bytes([buf[7], buf[8]]).wrapping_mul(8),
            distance: u16::from_be_bytes([buf[13], buf[14]]),
            signal_per_spad: u16::from_be_bytes([buf[15], buf[16]]).wrapping_mul(8),
        }
    }
}

/// A VL53L1X ToF range sensor.
pub struct Vl53l1x<B: Bus> {
    i2c: Device<B>,
}

impl<B: Bus> Vl53l1x<B> {
    /// Construct a new sensor, without sending
    /// any commands. To begin measuring, you
    /// need to call [`Self::init`] as well as
    /// [`Self::start_ranging`].
    pub fn new(bus: B) -> Self {
        Self {
            i2c: Device { i2c: bus },
        }
    }

    /// Give the bus back.
    pub fn release(self) -> B {
        self.i2c.i2c
    }

    /// Read the model id, [`SENSOR_ID`] for a VL53L1X.
    pub fn sensor_id(&mut self) -> Result<u16, Error<B::Error>> {
        Ok(self.i2c.read_word(Register::IDENTIFICATION_MODEL_ID)?)
    }

    /// Whether the firmware has finished booting.
    pub fn booted(&mut self) -> Result<bool, Error<B::Error>> {
        Ok(self.i2c.read_byte(Register::FIRMWARE_SYSTEM_STATUS)? & 0x01 == 0x01)
    }

    /// Initialize the sensor: wait for boot, load the default configuration
    /// and run the VHV calibration. The sensor is left in long distance mode
    /// with a 100 ms timing budget and ranging stopped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSensorId`] if the model id isn't [`SENSOR_ID`]. This
    /// mostly catches strange I<sup>2</sup>C bugs where all returned bytes
    /// are zeroed.
    #[cfg_attr(feature = "tracing", instrument(err, skip(self)))]
    pub async fn init(&mut self) -> Result<(), Error<B::Error>> {
        let id = self.sensor_id()?;
        if id != SENSOR_ID {
            return Err(Error::InvalidSensorId(id));
        }

        #[cfg(feature = "tracing")]
        debug!("waiting for boot");

        self.wait_until("boot", Self::booted).await?;

        #[cfg(feature = "tracing")]
        debug!("booted");

        self.i2c.write(DEFAULT_CONFIG_MSG)?;

        // start VHV
        self.start_ranging()?;
        self.wait_for_measurement().await?;
        self.clear_interrupt()?;
        self.stop_ranging()?;
        self.i2c
            .write_byte(Register::VHV_CONFIG_TIMEOUT_MACROP_LOOP_BOUND, 0x09)?; // two bounds VHV
        self.i2c.write_byte(Register::VHV_CONFIG_INIT, 0)?; // start VHV from the previous temperature

        Ok(())
    }

    /// Apply mode, timing budget and inter-measurement period, in that order.
    ///
    /// The budget is checked against the requested mode only, so any valid
    /// pair can follow any other.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedTimingBudget`] if the budget does not exist in the
    /// requested mode. Nothing is written in that case.
    #[cfg_attr(feature = "tracing", instrument(err, skip(self)))]
    pub fn configure(&mut self, config: &RangingConfig) -> Result<(), Error<B::Error>> {
        if !config.mode.supports_timing_budget(config.timing_budget_ms) {
            return Err(Error::UnsupportedTimingBudget {
                mode: config.mode,
                budget_ms: config.timing_budget_ms,
            });
        }

        self.write_distance_mode(config.mode)?;
        self.set_timing_budget_ms(config.timing_budget_ms)?;
        self.set_inter_measurement_ms(config.inter_measurement_ms)
    }

    /// Current distance mode.
    pub fn distance_mode(&mut self) -> Result<DistanceMode, Error<B::Error>> {
        match self.i2c.read_byte(Register::PHASECAL_CONFIG_TIMEOUT_MACROP)? {
            0x14 => Ok(DistanceMode::Short),
            0x0a => Ok(DistanceMode::Long),
            other => Err(Error::UnknownDistanceMode(other)),
        }
    }

    /// Switch distance mode, keeping the current timing budget.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedTimingBudget`] if the current budget does not
    /// exist in `mode` (15 ms when switching to long). The mode registers
    /// have been written by then, so set a valid budget afterwards.
    #[cfg_attr(feature = "tracing", instrument(err, skip(self)))]
    pub fn set_distance_mode(&mut self, mode: DistanceMode) -> Result<(), Error<B::Error>> {
        let budget = self.timing_budget_ms()?;
        self.write_distance_mode(mode)?;
        self.set_timing_budget_ms(budget)
    }

    fn write_distance_mode(&mut self, mode: DistanceMode) -> Result<(), Error<B::Error>> {
        let (phasecal, vcsel_a, vcsel_b, valid_phase, woi, initial_phase) = match mode {
            DistanceMode::Short => (0x14, 0x07, 0x05, 0x38, 0x0705, 0x0606),
            DistanceMode::Long => (0x0a, 0x0f, 0x0d, 0xb8, 0x0f0d, 0x0e0e),
        };

        self.i2c
            .write_byte(Register::PHASECAL_CONFIG_TIMEOUT_MACROP, phasecal)?;
        self.i2c
            .write_byte(Register::RANGE_CONFIG_VCSEL_PERIOD_A, vcsel_a)?;
        self.i2c
            .write_byte(Register::RANGE_CONFIG_VCSEL_PERIOD_B, vcsel_b)?;
        self.i2c
            .write_byte(Register::RANGE_CONFIG_VALID_PHASE_HIGH, valid_phase)?;
        self.i2c.write_word(Register::SD_CONFIG_WOI_SD0, woi)?;
        self.i2c
            .write_word(Register::SD_CONFIG_INITIAL_PHASE_SD0, initial_phase)?;

        Ok(())
    }

    /// Current timing budget (milliseconds).
    pub fn timing_budget_ms(&mut self) -> Result<u16, Error<B::Error>> {
        match self.i2c.read_word(Register::RANGE_CONFIG_TIMEOUT_MACROP_A)? {
            0x001d => Ok(15),
            0x0051 | 0x001e => Ok(20),
            0x00d6 | 0x0060 => Ok(33),
            0x01ae | 0x00ad => Ok(50),
            0x02e1 | 0x01cc => Ok(100),
            0x03e1 | 0x02d9 => Ok(200),
            0x0591 | 0x048f => Ok(500),
            other => Err(Error::UnknownTimingBudget(other)),
        }
    }

    /// Set the timing budget. Short mode accepts 15, 20, 33, 50, 100, 200 and
    /// 500 ms, long mode the same without 15 ms.
    #[cfg_attr(feature = "tracing", instrument(err, skip(self)))]
    pub fn set_timing_budget_ms(&mut self, budget_ms: u16) -> Result<(), Error<B::Error>> {
        let mode = self.distance_mode()?;
        let (a, b) = mode
            .timeout_macrop(budget_ms)
            .ok_or(Error::UnsupportedTimingBudget { mode, budget_ms })?;

        self.i2c
            .write_word(Register::RANGE_CONFIG_TIMEOUT_MACROP_A, a)?;
        self.i2c
            .write_word(Register::RANGE_CONFIG_TIMEOUT_MACROP_B, b)?;

        Ok(())
    }

    fn clock_pll(&mut self) -> Result<u64, Error<B::Error>> {
        let clock = self.i2c.read_word(Register::RESULT_OSC_CALIBRATE_VAL)? & 0x3ff;
        if clock == 0 {
            return Err(Error::OscillatorUncalibrated);
        }
        Ok(u64::from(clock))
    }

    /// Current inter-measurement period (milliseconds).
    pub fn inter_measurement_ms(&mut self) -> Result<u32, Error<B::Error>> {
        let period = u64::from(self.i2c.read_dword(Register::INTERMEASUREMENT_PERIOD)?);
        let clock = self.clock_pll()?;
        Ok((period * 1000 / (clock * 1065)) as u32)
    }

    /// Set the inter-measurement period. It must not be less than the
    /// timing budget.
    #[cfg_attr(feature = "tracing", instrument(err, skip(self)))]
    pub fn set_inter_measurement_ms(&mut self, period_ms: u32) -> Result<(), Error<B::Error>> {
        let clock = self.clock_pll()?;
        let period = clock * u64::from(period_ms) * 1075 / 1000;
        self.i2c.write_dword(
            Register::INTERMEASUREMENT_PERIOD,
            u32::try_from(period).unwrap_or(u32::MAX),
        )?;
        Ok(())
    }

    /// Current interrupt polarity.
    pub fn interrupt_polarity(&mut self) -> Result<Polarity, Error<B::Error>> {
        let ctrl = self.i2c.read_byte(Register::GPIO_HV_MUX_CTRL)?;
        Ok(if ctrl >> 4 & 1 == 0 {
            Polarity::ActiveHigh
        } else {
            Polarity::ActiveLow
        })
    }

    /// Set the interrupt polarity.
    pub fn set_interrupt_polarity(&mut self, polarity: Polarity) -> Result<(), Error<B::Error>> {
        let ctrl = self.i2c.read_byte(Register::GPIO_HV_MUX_CTRL)? & 0xef;
        let bit = match polarity {
            Polarity::ActiveHigh => 0,
            Polarity::ActiveLow => 1 << 4,
        };
        self.i2c.write_byte(Register::GPIO_HV_MUX_CTRL, ctrl | bit)?;
        Ok(())
    }

    /// Check if the sensor has a measurement ready. Unless you really like
    /// low-level, use the more ergonomic [`Self::measure`] instead.
    #[inline]
    pub fn has_measurement(&mut self) -> Result<bool, Error<B::Error>> {
        let ctrl = self.i2c.read_byte(Register::GPIO_HV_MUX_CTRL)?;
        let status = self.i2c.read_byte(Register::GPIO_TIO_HV_STATUS)?;
        Ok(status & 1 != ctrl >> 4 & 1)
    }

    async fn wait_until(
        &mut self,
        what: &'static str,
        mut ready: impl FnMut(&mut Self) -> Result<bool, Error<B::Error>>,
    ) -> Result<(), Error<B::Error>> {
        for _ in 0..POLL_ATTEMPTS {
            if ready(self)? {
                return Ok(());
            }
            tokio::time::sleep(DATA_POLL_INTERVAL).await;
        }

        Err(Error::Timeout(what))
    }

    /// Poll the sensor until a measurement is ready.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if nothing arrives within around 1 second.
    pub async fn wait_for_measurement(&mut self) -> Result<(), Error<B::Error>> {
        self.wait_until("measurement", Self::has_measurement).await
    }

    /// Wait for a measurement to be available on the sensor and then read
    /// the measurement. This function polls the sensor for a measurement
    /// until one is available, reads the measurement and finally clears
    /// the interrupt in order to request another measurement.
    pub async fn measure(&mut self) -> Result<Measurement, Error<B::Error>> {
        self.wait_for_measurement().await?;

        let measurement = self.read_measurement()?;
        self.clear_interrupt()?;

        Ok(measurement)
    }

    /// Like [`Self::measure`], but only read the distance (millimeters).
    /// The value is returned whatever its status.
    pub async fn distance(&mut self) -> Result<u16, Error<B::Error>> {
        self.wait_for_measurement().await?;

        let distance = self.i2c.read_word(Register::RESULT_DISTANCE)?;
        self.clear_interrupt()?;

        Ok(distance)
    }

    /// Read the current measurement from the sensor. Wait for
    /// [`Self::has_measurement`] to return true before running this so that
    /// the measurement doesn't get overwritten halfway through you reading it.
    /// Instruct the sensor to resume measuring with  [`Self::clear_interrupt`]
    /// afterwards.
    #[inline]
    pub fn read_measurement(&mut self) -> Result<Measurement, Error<B::Error>> {
        let mut buf = [0; RESULT_LEN];
        self.i2c.read_bytes(Register::RESULT_RANGE_STATUS, &mut buf)?;
        Ok(Measurement::from_result_block(&buf))
    }

    /// Clear the interrupt which will eventually trigger a new measurement.
    #[inline]
    pub fn clear_interrupt(&mut self) -> Result<(), Error<B::Error>> {
        Ok(self.i2c.write_byte(Register::SYSTEM_INTERRUPT_CLEAR, 0x01)?)
    }

    /// Begin ranging.
    #[inline]
    pub fn start_ranging(&mut self) -> Result<(), Error<B::Error>> {
        Ok(self.i2c.write_byte(Register::SYSTEM_MODE_START, 0x40)?)
    }

    /// Stop ranging.
    #[inline]
    pub fn stop_ranging(&mut self) -> Result<(), Error<B::Error>> {
        Ok(self.i2c.write_byte(Register::SYSTEM_MODE_START, 0x00)?)
    }
}
