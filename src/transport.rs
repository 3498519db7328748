//! Byte transport abstraction and the register access layer built on it.
//!
//! The driver itself never owns bus or pin initialization; it is handed a
//! [`Transport`] (usually the bundled I2C adapter) and drives the sensor's
//! 16-bit register space through it in bounded chunks.

use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
    i2c::{I2c, SevenBitAddress},
};

use crate::consts::*;
use crate::error::ProtocolError;
use crate::{Error, Vl53l5cx};

/// Raw byte exchange with the device at its fixed bus address.
pub trait Transport {
    type Error;

    fn write(&mut self, wbuf: &[u8]) -> Result<(), Self::Error>;
    fn write_read(&mut self, wbuf: &[u8], rbuf: &mut [u8]) -> Result<(), Self::Error>;
}

/// [`Transport`] over an `embedded-hal` I2C bus.
pub struct I2cTransport<P> {
    i2c: P,
    address: SevenBitAddress,
}

impl<P: I2c> I2cTransport<P> {
    pub fn new(i2c: P) -> Self {
        I2cTransport {
            i2c,
            address: VL53L5CX_DEFAULT_I2C_ADDRESS,
        }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }
}

impl<P: I2c> Transport for I2cTransport<P> {
    type Error = P::Error;

    #[inline]
    fn write(&mut self, wbuf: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(self.address, wbuf)
    }

    #[inline]
    fn write_read(&mut self, wbuf: &[u8], rbuf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, wbuf, rbuf)
    }
}

impl<P, LPN, T> Vl53l5cx<I2cTransport<P>, LPN, T>
where
    P: I2c,
    LPN: OutputPin,
    T: DelayNs,
{
    /// Creates a driver on an I2C bus at the factory-default address.
    pub fn new_i2c(i2c: P, lpn_pin: LPN, tim: T) -> Self {
        Self::new(I2cTransport::new(i2c), lpn_pin, tim)
    }

    /// Moves the device to a new I2C address and follows it. Useful when
    /// several sensors share one bus: hold all but one in reset via LPn,
    /// readdress the free one, repeat.
    pub fn set_i2c_address(&mut self, address: SevenBitAddress) -> Result<(), Error<P::Error>> {
        self.write_to_register(0x7fff, 0x00)?;
        self.write_to_register(0x4, address)?;
        self.bus.address = address;
        self.write_to_register(0x7fff, 0x02)?;
        Ok(())
    }
}

impl<B, LPN, T> Vl53l5cx<B, LPN, T>
where
    B: Transport,
    LPN: OutputPin,
    T: DelayNs,
{
    /// Reads `size` bytes starting at `reg` into the working buffer.
    pub(crate) fn read_from_register(&mut self, reg: u16, size: usize) -> Result<(), Error<B::Error>> {
        self.scratch_resize(size)?;
        for i in (0..size).step_by(I2C_CHUNK_SIZE) {
            let read_size = if size - i > I2C_CHUNK_SIZE { I2C_CHUNK_SIZE } else { size - i };
            let cmd = (reg + i as u16).to_be_bytes();
            self.bus
                .write_read(&cmd, &mut self.scratch[i..i + read_size])
                .map_err(Error::Transport)?;
        }
        Ok(())
    }

    pub(crate) fn write_to_register(&mut self, reg: u16, val: u8) -> Result<(), Error<B::Error>> {
        let addr = reg.to_be_bytes();
        self.bus
            .write(&[addr[0], addr[1], val])
            .map_err(Error::Transport)
    }

    pub(crate) fn write_multi_to_register(&mut self, reg: u16, wbuf: &[u8]) -> Result<(), Error<B::Error>> {
        let size = wbuf.len();
        let mut tmp = [0u8; I2C_CHUNK_SIZE];
        for i in (0..size).step_by(I2C_CHUNK_SIZE - 2) {
            let write_size = if size - i > I2C_CHUNK_SIZE - 2 { I2C_CHUNK_SIZE - 2 } else { size - i };
            tmp[..2].copy_from_slice(&(reg + i as u16).to_be_bytes());
            tmp[2..2 + write_size].copy_from_slice(&wbuf[i..i + write_size]);
            self.bus.write(&tmp[..2 + write_size]).map_err(Error::Transport)?;
        }
        Ok(())
    }

    /// Writes the first `size` bytes of the working buffer to `reg`.
    pub(crate) fn write_scratch_to_register(&mut self, reg: u16, size: usize) -> Result<(), Error<B::Error>> {
        let mut tmp = [0u8; I2C_CHUNK_SIZE];
        for i in (0..size).step_by(I2C_CHUNK_SIZE - 2) {
            let write_size = if size - i > I2C_CHUNK_SIZE - 2 { I2C_CHUNK_SIZE - 2 } else { size - i };
            tmp[..2].copy_from_slice(&(reg + i as u16).to_be_bytes());
            tmp[2..2 + write_size].copy_from_slice(&self.scratch[i..i + write_size]);
            self.bus.write(&tmp[..2 + write_size]).map_err(Error::Transport)?;
        }
        Ok(())
    }

    /// Drives LPn high and lets the device power up.
    pub fn on(&mut self) -> Result<(), Error<B::Error>> {
        self.lpn_pin.set_high().unwrap();
        self.delay(10);
        Ok(())
    }

    /// Drives LPn low, holding the device in low-power reset.
    pub fn off(&mut self) -> Result<(), Error<B::Error>> {
        self.lpn_pin.set_low().unwrap();
        self.delay(10);
        Ok(())
    }

    /// Checks that the device answers on the bus and identifies as a
    /// VL53L5CX.
    pub fn is_alive(&mut self) -> Result<(), Error<B::Error>> {
        self.write_to_register(0x7fff, 0x00)?;
        self.read_from_register(0, 2)?;
        self.write_to_register(0x7fff, 0x02)?;
        let device_id = self.scratch[0];
        let revision_id = self.scratch[1];
        if device_id != 0xF0 || revision_id != 0x02 {
            return Err(Error::Protocol(ProtocolError::DeviceIdMismatch {
                device_id,
                revision_id,
            }));
        }
        Ok(())
    }
}
