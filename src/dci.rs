//! Device Configuration Interface: the generic indexed read/write/replace
//! protocol spoken with the sensor firmware.
//!
//! A request is the payload wrapped in a 4 byte header (index plus
//! nibble-encoded length) and an 8 byte footer, byte-swapped to the MCU
//! word order and written so that it ends at the last byte of the exchange
//! window. Completion is signalled through the window's status register,
//! which is polled with a bounded budget.

use embedded_hal::{delay::DelayNs, digital::OutputPin};

use crate::codec::swap_buffer;
use crate::consts::*;
use crate::error::ProtocolError;
use crate::transport::Transport;
use crate::{Error, Vl53l5cx};

impl<B, LPN, T> Vl53l5cx<B, LPN, T>
where
    B: Transport,
    LPN: OutputPin,
    T: DelayNs,
{
    /// Polls `reg` until `buf[pos] & mask == expected`, with the standard
    /// command budget. A status byte of 0x7F or above means the MCU itself
    /// reported a fault and the poll is abandoned immediately.
    pub(crate) fn poll_for_answer(
        &mut self,
        size: usize,
        pos: usize,
        reg: u16,
        mask: u8,
        expected: u8,
    ) -> Result<(), Error<B::Error>> {
        for _ in 0..STATUS_POLL_RETRIES {
            self.read_from_register(reg, size)?;
            self.delay(STATUS_POLL_INTERVAL_MS);

            if size >= 4 && self.scratch[2] >= 0x7F {
                return Err(Error::Protocol(ProtocolError::McuError(self.scratch[2])));
            }
            if self.scratch[pos] & mask == expected {
                return Ok(());
            }
        }
        error!("status poll on reg {} expired", reg);
        Err(Error::Timeout)
    }

    /// Reads `out.len()` bytes of DCI data at `index`.
    ///
    /// The firmware only deals in whole 32-bit words, so the length must be
    /// a multiple of 4.
    pub fn dci_read_data(&mut self, index: u16, out: &mut [u8]) -> Result<(), Error<B::Error>> {
        self.require_initialized()?;
        if out.is_empty() || out.len() % 4 != 0 {
            return Err(Error::InvalidArgument);
        }
        self.dci_read_to_scratch(index, out.len())?;
        out.copy_from_slice(&self.scratch[..out.len()]);
        Ok(())
    }

    /// Writes `data` as the DCI value at `index`.
    pub fn dci_write_data(&mut self, index: u16, data: &[u8]) -> Result<(), Error<B::Error>> {
        self.require_initialized()?;
        if data.is_empty() || data.len() % 4 != 0 {
            return Err(Error::InvalidArgument);
        }
        self.stage_scratch(data)?;
        self.dci_write_from_scratch(index, data.len())
    }

    /// Read-modify-write: fetches `data_size` bytes at `index`, overlays
    /// `patch` at `patch_offset` and writes the value back.
    pub fn dci_replace_data(
        &mut self,
        index: u16,
        data_size: usize,
        patch: &[u8],
        patch_offset: usize,
    ) -> Result<(), Error<B::Error>> {
        self.require_initialized()?;
        if data_size == 0 || data_size % 4 != 0 || patch_offset + patch.len() > data_size {
            return Err(Error::InvalidArgument);
        }
        self.dci_read_to_scratch(index, data_size)?;
        self.scratch[patch_offset..patch_offset + patch.len()].copy_from_slice(patch);
        self.dci_write_from_scratch(index, data_size)
    }

    /// Requests `size` bytes at `index` and leaves the reply payload in
    /// `scratch[..size]`.
    pub(crate) fn dci_read_to_scratch(&mut self, index: u16, size: usize) -> Result<(), Error<B::Error>> {
        debug_assert!(size % 4 == 0);
        let read_size = size + 12;
        if read_size > SCRATCH_CAPACITY {
            return Err(Error::Capacity {
                needed: read_size,
                capacity: SCRATCH_CAPACITY,
            });
        }
        trace!("dci read index {} size {}", index, size);

        let mut cmd = [
            0x00, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x0f, //
            0x00, 0x02, 0x00, 0x08,
        ];
        cmd[0] = (index >> 8) as u8;
        cmd[1] = (index & 0xff) as u8;
        cmd[2] = ((size & 0xff0) >> 4) as u8;
        cmd[3] = ((size & 0xf) << 4) as u8;

        // Request the value, wait for completion, then pull the reply
        // (4 byte header + payload + 8 byte footer) from the window start.
        self.write_multi_to_register(VL53L5CX_UI_CMD_END - 11, &cmd)?;
        self.poll_for_answer(4, 1, VL53L5CX_UI_CMD_STATUS, 0xFF, 0x03)?;

        self.read_from_register(VL53L5CX_UI_CMD_START, read_size)?;
        swap_buffer(&mut self.scratch[..read_size]);
        self.scratch.copy_within(4..4 + size, 0);
        self.scratch.truncate(size);
        Ok(())
    }

    /// Frames and transmits `scratch[..len]` as the DCI value at `index`.
    /// The working buffer content is consumed.
    pub(crate) fn dci_write_from_scratch(&mut self, index: u16, len: usize) -> Result<(), Error<B::Error>> {
        debug_assert!(len % 4 == 0);
        debug_assert!(self.scratch.len() >= len);
        let total = len + 12;
        if total > SCRATCH_CAPACITY {
            return Err(Error::Capacity {
                needed: total,
                capacity: SCRATCH_CAPACITY,
            });
        }
        trace!("dci write index {} len {}", index, len);

        let header = [
            (index >> 8) as u8,
            (index & 0xff) as u8,
            ((len & 0xff0) >> 4) as u8,
            ((len & 0xf) << 4) as u8,
        ];
        let footer = [
            0x00,
            0x00,
            0x00,
            0x0f,
            0x05,
            0x01,
            ((len + 8) >> 8) as u8,
            ((len + 8) & 0xFF) as u8,
        ];
        // The request is positioned so that its last byte lands on the last
        // byte of the exchange window.
        let address = VL53L5CX_UI_CMD_END - (total as u16) + 1;

        swap_buffer(&mut self.scratch[..len]);
        self.scratch.resize_default(total).map_err(|_| Error::Capacity {
            needed: total,
            capacity: SCRATCH_CAPACITY,
        })?;
        self.scratch.copy_within(..len, 4);
        self.scratch[..4].copy_from_slice(&header);
        self.scratch[len + 4..total].copy_from_slice(&footer);

        self.write_scratch_to_register(address, total)?;
        self.poll_for_answer(4, 1, VL53L5CX_UI_CMD_STATUS, 0xFF, 0x03)
    }
}
