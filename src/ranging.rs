//! Ranging session control: Stopped <-> Streaming.

use embedded_hal::{delay::DelayNs, digital::OutputPin};

use crate::codec::{from_u8_to_u16, from_u8_to_u32, from_u32_to_u8, swap_buffer};
use crate::consts::*;
use crate::error::ProtocolError;
use crate::frame::decode_frame;
use crate::plan::OutputPlan;
use crate::transport::Transport;
use crate::{Error, RangingResults, State, Vl53l5cx};

impl<B, LPN, T> Vl53l5cx<B, LPN, T>
where
    B: Transport,
    LPN: OutputPin,
    T: DelayNs,
{
    /// Opens a ranging session. While the device streams, settings cannot
    /// be changed; calling this twice without an intervening
    /// [`stop_ranging`](Self::stop_ranging) is an error.
    ///
    /// The frame length the device reports back is verified bit-exactly
    /// against the computed output plan before any frame is accepted.
    pub fn start_ranging(&mut self) -> Result<(), Error<B::Error>> {
        self.require_stopped()?;

        let resolution = self.get_resolution()?;
        let plan = OutputPlan::compute(self.channels, resolution);
        debug!("starting ranging, {} byte frames expected", plan.total_bytes);

        /* Send the sized block list */
        let mut list = [0u8; 48];
        from_u32_to_u8(&plan.blocks, &mut list);
        self.dci_write_data(VL53L5CX_DCI_OUTPUT_LIST, &list)?;

        /* Frame length, stream count and enable words are contiguous */
        let mut config = [0u8; 24];
        from_u32_to_u8(&[plan.total_bytes as u32, plan.block_count], &mut config[..8]);
        from_u32_to_u8(&self.channels.enable_words(), &mut config[8..]);
        self.dci_write_data(VL53L5CX_DCI_OUTPUT_CONFIG, &config)?;

        /* Start xshut bypass (interrupt mode) */
        self.write_to_register(0x7fff, 0x00)?;
        self.write_to_register(0x09, 0x05)?;
        self.write_to_register(0x7fff, 0x02)?;

        /* Start ranging session */
        let cmd: [u8; 4] = [0x00, 0x03, 0x00, 0x00];
        self.write_multi_to_register(VL53L5CX_UI_CMD_END - (4 - 1), &cmd)?;
        self.poll_for_answer(4, 1, VL53L5CX_UI_CMD_STATUS, 0xFF, 0x03)?;

        /* Compare the configured frame length against the device's view */
        self.dci_read_to_scratch(VL53L5CX_DCI_RANGE_DATA, 12)?;
        let mut reported = [0u16; 1];
        from_u8_to_u16(&self.scratch[0x8..0x8 + 2], &mut reported);
        if reported[0] as usize != plan.total_bytes {
            error!(
                "device will stream {} byte frames, plan computed {}",
                reported[0],
                plan.total_bytes
            );
            return Err(Error::Protocol(ProtocolError::FrameSizeMismatch {
                expected: plan.total_bytes,
                reported: reported[0] as usize,
            }));
        }

        self.data_read_size = plan.total_bytes;
        self.stream_count = 255;
        self.state = State::Streaming;
        Ok(())
    }

    /// Closes the ranging session. Unless the device already stopped on
    /// its own, the internal MCU is halted explicitly and the halt is
    /// polled with its own budget before the interrupt bypass is released.
    pub fn stop_ranging(&mut self) -> Result<(), Error<B::Error>> {
        self.require_initialized()?;
        if self.state != State::Streaming {
            return Ok(());
        }

        self.read_from_register(0x2ffc, 4)?;
        let mut auto_stop = [0u32; 1];
        from_u8_to_u32(&self.scratch[..4], &mut auto_stop);

        let mut fault: Option<Error<B::Error>> = None;
        if auto_stop[0] != 0x4FF {
            self.write_to_register(0x7fff, 0x00)?;

            /* Provoke MCU stop */
            self.write_to_register(0x15, 0x16)?;
            self.write_to_register(0x14, 0x01)?;

            let mut halted = false;
            for _ in 0..STOP_POLL_RETRIES {
                self.read_from_register(0x6, 1)?;
                if self.scratch[0] & 0x80 != 0 {
                    halted = true;
                    break;
                }
                self.delay(STOP_POLL_INTERVAL_MS);
            }
            if halted {
                // The MCU reports how it stopped; anything but the two
                // regular halt codes is a fault worth surfacing, though
                // cleanup still runs.
                self.read_from_register(0x7, 1)?;
                let halt_status = self.scratch[0];
                if halt_status != 0x84 && halt_status != 0x85 {
                    fault = Some(Error::Protocol(ProtocolError::McuError(halt_status)));
                }
            } else {
                error!("MCU did not halt within the stop budget");
                fault = Some(Error::Timeout);
            }
        }

        /* Undo MCU stop */
        self.write_to_register(0x7fff, 0x00)?;
        self.write_to_register(0x14, 0x00)?;
        self.write_to_register(0x15, 0x00)?;

        /* Stop xshut bypass */
        self.write_to_register(0x09, 0x04)?;
        self.write_to_register(0x7fff, 0x02)?;

        self.state = State::Stopped;
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Polls the device for a fresh frame. Prefer gating reads on the
    /// interrupt line and use this as the fallback; either way
    /// [`get_ranging_data`](Self::get_ranging_data) still validates frame
    /// integrity.
    pub fn check_data_ready(&mut self) -> Result<bool, Error<B::Error>> {
        self.require_streaming()?;
        self.read_from_register(0, 4)?;

        if self.scratch[0] != self.stream_count
            && self.scratch[0] != 0xFF
            && self.scratch[1] == 0x05
            && self.scratch[2] & 0x05 == 0x05
            && self.scratch[3] & 0x10 == 0x10
        {
            self.stream_count = self.scratch[0];
            Ok(true)
        } else {
            if self.scratch[3] & 0x80 != 0 {
                return Err(Error::Protocol(ProtocolError::McuFault));
            }
            Ok(false)
        }
    }

    /// Reads and decodes one frame.
    ///
    /// On [`ProtocolError::CorruptedFrame`] the result is discarded and the
    /// read may simply be retried; the device keeps streaming.
    pub fn get_ranging_data(&mut self) -> Result<RangingResults, Error<B::Error>> {
        self.require_streaming()?;

        let size = self.data_read_size;
        self.read_from_register(0, size)?;
        self.stream_count = self.scratch[0];
        swap_buffer(&mut self.scratch[..size]);

        let results = decode_frame(&self.scratch[..size])?;
        Ok(results)
    }
}
