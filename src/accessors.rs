//! Public configuration accessors, all expressed through the three DCI
//! primitives and the well-known parameter indices.
//!
//! The device owns the persistent copy of every parameter; getters read it
//! back rather than caching. Setters are only legal while ranging is
//! stopped.

use embedded_hal::{delay::DelayNs, digital::OutputPin};

use crate::codec::{from_u8_to_u32, from_u32_to_u8};
use crate::consts::*;
use crate::error::ProtocolError;
use crate::transport::Transport;
use crate::{Error, RangingMode, Resolution, TargetOrder, Vl53l5cx};

impl<B, LPN, T> Vl53l5cx<B, LPN, T>
where
    B: Transport,
    LPN: OutputPin,
    T: DelayNs,
{
    /// Reads the current zone grid resolution from the device.
    pub fn get_resolution(&mut self) -> Result<Resolution, Error<B::Error>> {
        self.require_initialized()?;
        self.dci_read_to_scratch(VL53L5CX_DCI_ZONE_CONFIG, 8)?;
        match self.scratch[0x00] as u16 * self.scratch[0x01] as u16 {
            16 => Ok(Resolution::Grid4x4),
            64 => Ok(Resolution::Grid8x8),
            _ => Err(Error::Protocol(ProtocolError::UnexpectedResponse)),
        }
    }

    /// Switches the zone grid resolution and re-runs the calibration
    /// resampling for the new grid. Only while ranging is stopped.
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<(), Error<B::Error>> {
        self.require_stopped()?;

        match resolution {
            Resolution::Grid4x4 => {
                self.dci_read_to_scratch(VL53L5CX_DCI_DSS_CONFIG, 16)?;
                self.scratch[0x04] = 64;
                self.scratch[0x06] = 64;
                self.scratch[0x09] = 4;
                self.dci_write_from_scratch(VL53L5CX_DCI_DSS_CONFIG, 16)?;

                self.dci_read_to_scratch(VL53L5CX_DCI_ZONE_CONFIG, 8)?;
                self.scratch[0x00] = 4;
                self.scratch[0x01] = 4;
                self.scratch[0x04] = 8;
                self.scratch[0x05] = 8;
                self.dci_write_from_scratch(VL53L5CX_DCI_ZONE_CONFIG, 8)?;
            }
            Resolution::Grid8x8 => {
                self.dci_read_to_scratch(VL53L5CX_DCI_DSS_CONFIG, 16)?;
                self.scratch[0x04] = 16;
                self.scratch[0x06] = 16;
                self.scratch[0x09] = 1;
                self.dci_write_from_scratch(VL53L5CX_DCI_DSS_CONFIG, 16)?;

                self.dci_read_to_scratch(VL53L5CX_DCI_ZONE_CONFIG, 8)?;
                self.scratch[0x00] = 8;
                self.scratch[0x01] = 8;
                self.scratch[0x04] = 4;
                self.scratch[0x05] = 4;
                self.dci_write_from_scratch(VL53L5CX_DCI_ZONE_CONFIG, 8)?;
            }
        }

        self.send_offset_data(resolution)?;
        self.send_xtalk_data(resolution)
    }

    /// Reads the current ranging frequency in Hz.
    pub fn get_ranging_frequency_hz(&mut self) -> Result<u8, Error<B::Error>> {
        self.require_initialized()?;
        self.dci_read_to_scratch(VL53L5CX_DCI_FREQ_HZ, 4)?;
        Ok(self.scratch[0x01])
    }

    /// Sets a new ranging frequency in Hz. Allowed ranges are 1 to 60 Hz
    /// in 4x4 and 1 to 15 Hz in 8x8, so select the resolution first.
    pub fn set_ranging_frequency_hz(&mut self, frequency_hz: u8) -> Result<(), Error<B::Error>> {
        self.require_stopped()?;
        if !(1..=60).contains(&frequency_hz) {
            return Err(Error::InvalidArgument);
        }
        if self.get_resolution()? == Resolution::Grid8x8 && frequency_hz > 15 {
            return Err(Error::InvalidArgument);
        }
        self.dci_replace_data(VL53L5CX_DCI_FREQ_HZ, 4, &[frequency_hz], 0x01)
    }

    /// Reads the current integration time in ms.
    pub fn get_integration_time_ms(&mut self) -> Result<u32, Error<B::Error>> {
        self.require_initialized()?;
        self.dci_read_to_scratch(VL53L5CX_DCI_INT_TIME, 20)?;
        let mut time_us = [0u32; 1];
        from_u8_to_u32(&self.scratch[..4], &mut time_us);
        Ok(time_us[0] / 1000)
    }

    /// Sets a new integration time, 2 to 1000 ms. Must stay below the
    /// frame period for the selected frequency; has no effect in
    /// continuous mode.
    pub fn set_integration_time_ms(&mut self, integration_time_ms: u32) -> Result<(), Error<B::Error>> {
        self.require_stopped()?;
        if !(2..=1000).contains(&integration_time_ms) {
            return Err(Error::InvalidArgument);
        }
        let mut buf = [0u8; 4];
        from_u32_to_u8(&[integration_time_ms * 1000], &mut buf);
        self.dci_replace_data(VL53L5CX_DCI_INT_TIME, 20, &buf, 0x00)
    }

    /// Reads the current ranging mode.
    pub fn get_ranging_mode(&mut self) -> Result<RangingMode, Error<B::Error>> {
        self.require_initialized()?;
        self.dci_read_to_scratch(VL53L5CX_DCI_RANGING_MODE, 8)?;
        if self.scratch[0x01] == 1 {
            Ok(RangingMode::Continuous)
        } else {
            Ok(RangingMode::Autonomous)
        }
    }

    /// Selects continuous or autonomous ranging. Only while stopped.
    pub fn set_ranging_mode(&mut self, ranging_mode: RangingMode) -> Result<(), Error<B::Error>> {
        self.require_stopped()?;
        self.dci_read_to_scratch(VL53L5CX_DCI_RANGING_MODE, 8)?;

        let single_range: u32 = match ranging_mode {
            RangingMode::Continuous => {
                self.scratch[0x01] = 1;
                self.scratch[0x03] = 3;
                0
            }
            RangingMode::Autonomous => {
                self.scratch[0x01] = 3;
                self.scratch[0x03] = 2;
                1
            }
        };
        self.dci_write_from_scratch(VL53L5CX_DCI_RANGING_MODE, 8)?;

        let mut buf = [0u8; 4];
        from_u32_to_u8(&[single_range], &mut buf);
        self.dci_write_data(VL53L5CX_DCI_SINGLE_RANGE, &buf)
    }

    /// Reads the sharpener strength in percent.
    pub fn get_sharpener_percent(&mut self) -> Result<u8, Error<B::Error>> {
        self.require_initialized()?;
        self.dci_read_to_scratch(VL53L5CX_DCI_SHARPENER, 16)?;
        Ok((self.scratch[0x0D] as u32 * 100 / 255) as u8)
    }

    /// Sets the sharpener strength, 0 (disabled) to 99 percent. Blurs more
    /// or fewer neighbouring zones into each other.
    pub fn set_sharpener_percent(&mut self, sharpener_percent: u8) -> Result<(), Error<B::Error>> {
        self.require_stopped()?;
        if sharpener_percent >= 100 {
            return Err(Error::InvalidArgument);
        }
        let raw = (sharpener_percent as u32 * 255 / 100) as u8;
        self.dci_replace_data(VL53L5CX_DCI_SHARPENER, 16, &[raw], 0x0D)
    }

    /// Reads the target reporting order.
    pub fn get_target_order(&mut self) -> Result<TargetOrder, Error<B::Error>> {
        self.require_initialized()?;
        self.dci_read_to_scratch(VL53L5CX_DCI_TARGET_ORDER, 4)?;
        match self.scratch[0x00] {
            1 => Ok(TargetOrder::Closest),
            2 => Ok(TargetOrder::Strongest),
            _ => Err(Error::Protocol(ProtocolError::UnexpectedResponse)),
        }
    }

    /// Selects the target reporting order. The factory default is
    /// strongest-first.
    pub fn set_target_order(&mut self, target_order: TargetOrder) -> Result<(), Error<B::Error>> {
        self.require_stopped()?;
        let raw = match target_order {
            TargetOrder::Closest => 1u8,
            TargetOrder::Strongest => 2u8,
        };
        self.dci_replace_data(VL53L5CX_DCI_TARGET_ORDER, 4, &[raw], 0x00)
    }
}
