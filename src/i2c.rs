//! [I²C](https://en.wikipedia.org/wiki/I%C2%B2C) abstractions.
//!
//! The VL53L1X uses 16-bit register indices sent big-endian ahead of any
//! payload, and auto-increments the index on multi-byte transfers.

use i2cdev::{
    core::I2CDevice,
    linux::{LinuxI2CDevice, LinuxI2CError},
};

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::Register;

/// A bus the sensor can be reached through.
pub trait Bus {
    /// Transfer error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write `data` in a single transaction. The first two bytes select the
    /// register.
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Write `data` (the register index), then read `buf.len()` bytes.
    fn write_read(&mut self, data: &[u8], buf: &mut [u8]) -> Result<(), Self::Error>;
}

impl Bus for LinuxI2CDevice {
    type Error = LinuxI2CError;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        I2CDevice::write(self, data)
    }

    fn write_read(&mut self, data: &[u8], buf: &mut [u8]) -> Result<(), Self::Error> {
        I2CDevice::write(self, data)?;
        I2CDevice::read(self, buf)
    }
}

pub(crate) struct Device<B: Bus> {
    pub i2c: B,
}

impl<B: Bus> Device<B> {
    pub fn read_bytes(&mut self, reg: Register, dest: &mut [u8]) -> Result<(), B::Error> {
        #[cfg(feature = "tracing")]
        trace!("read {} from {:#06x}", dest.len(), reg.addr());
        self.i2c.write_read(&reg.as_bytes(), dest)
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), B::Error> {
        #[cfg(feature = "tracing")]
        trace!("write {:x?}", data);
        self.i2c.write(data)
    }
}

macro_rules! read_impl {
    ($name:ident, $out:ty) => {
        impl<B: Bus> Device<B> {
            /// Read a
            #[doc = concat!("[`", stringify!($out), "`]")]
            /// from some [`Register`].
            pub fn $name(&mut self, reg: Register) -> Result<$out, B::Error> {
                let mut buf = [0; core::mem::size_of::<$out>()];
                self.read_bytes(reg, &mut buf)?;
                Ok(<$out>::from_be_bytes(buf))
            }
        }
    };
}

read_impl!(read_byte, u8);
read_impl!(read_word, u16);
read_impl!(read_dword, u32);

macro_rules! write_impl {
    ($name:ident, $in:ty) => {
        impl<B: Bus> Device<B> {
            /// Write a
            #[doc = concat!("[`", stringify!($in), "`]")]
            /// into some [`Register`].
            pub fn $name(&mut self, reg: Register, data: $in) -> Result<(), B::Error> {
                let mut msg = [0; 2 + core::mem::size_of::<$in>()]; // 2 bytes for register selection, rest for data
                msg[..2].copy_from_slice(&reg.as_bytes());
                msg[2..].copy_from_slice(&data.to_be_bytes());
                self.write(&msg)
            }
        }
    };
}

write_impl!(write_byte, u8);
write_impl!(write_word, u16);
write_impl!(write_dword, u32);
