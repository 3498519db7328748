//! One-time device bootstrap: reset, firmware upload, boot verification,
//! factory calibration fetch and default configuration.

use embedded_hal::{delay::DelayNs, digital::OutputPin};

use crate::buffers::{VL53L5CX_DEFAULT_CONFIGURATION, VL53L5CX_DEFAULT_XTALK, VL53L5CX_FIRMWARE, VL53L5CX_GET_NVM_CMD};
use crate::codec::{from_u8_to_u32, from_u32_to_u8, swap_buffer};
use crate::consts::*;
use crate::error::ProtocolError;
use crate::transport::Transport;
use crate::{Error, Resolution, State, Vl53l5cx};

impl<B, LPN, T> Vl53l5cx<B, LPN, T>
where
    B: Transport,
    LPN: OutputPin,
    T: DelayNs,
{
    /// Brings the sensor from power-on to a configured, stopped state:
    /// power-cycle via LPn, identity check, firmware upload and boot,
    /// factory calibration fetch, then the default configuration push.
    ///
    /// Takes a few hundred milliseconds and runs exactly once per power
    /// cycle. Every other operation of this driver fails with
    /// [`Error::NotInitialized`] until this has succeeded.
    pub fn init(&mut self) -> Result<(), Error<B::Error>> {
        self.off()?;
        self.on()?;
        self.is_alive()?;
        self.load_firmware()?;
        self.default_configure()?;
        info!("sensor initialized");
        Ok(())
    }

    /// Waits for the MCU to report boot completion. Either of two status
    /// registers signals the terminal state.
    fn poll_for_mcu_boot(&mut self) -> Result<(), Error<B::Error>> {
        for _ in 0..BOOT_POLL_RETRIES {
            self.read_from_register(0x06, 2)?;
            if self.scratch[0] & 0x80 != 0 && self.scratch[1] & 0x01 != 0 {
                return Ok(());
            }
            self.delay(BOOT_POLL_INTERVAL_MS);
            if self.scratch[0] & 0x01 != 0 {
                return Ok(());
            }
        }
        error!("MCU did not boot within the polling budget");
        Err(Error::Timeout)
    }

    /// Resets the device, uploads the firmware image and verifies that the
    /// MCU boots on it, then pulls the factory calibration record from NVM.
    fn load_firmware(&mut self) -> Result<(), Error<B::Error>> {
        debug!("resetting device");
        self.write_to_register(0x7fff, 0x00)?;
        self.write_to_register(0x0009, 0x04)?;
        self.write_to_register(0x000F, 0x40)?;
        self.write_to_register(0x000A, 0x03)?;
        self.read_from_register(0x7FFF, 1)?;
        self.write_to_register(0x000C, 0x01)?;

        self.write_to_register(0x0101, 0x00)?;
        self.write_to_register(0x0102, 0x00)?;
        self.write_to_register(0x010A, 0x01)?;
        self.write_to_register(0x4002, 0x01)?;
        self.write_to_register(0x4002, 0x00)?;
        self.write_to_register(0x010A, 0x03)?;
        self.write_to_register(0x0103, 0x01)?;
        self.write_to_register(0x000C, 0x00)?;
        self.write_to_register(0x000F, 0x43)?;
        self.delay(1);

        self.write_to_register(0x000F, 0x40)?;
        self.write_to_register(0x000A, 0x01)?;
        self.delay(100);

        // Several ms pass before the pre-firmware MCU answers at all.
        self.write_to_register(0x7fff, 0x00)?;
        self.poll_for_answer(1, 0, 0x06, 0xff, 1)?;

        self.write_to_register(0x000E, 0x01)?;
        self.write_to_register(0x7fff, 0x02)?;

        /* Enable FW access */
        self.write_to_register(0x7fff, 0x01)?;
        self.write_to_register(0x06, 0x01)?;
        self.poll_for_answer(1, 0, 0x21, 0xFF, 0x4)?;

        self.write_to_register(0x7fff, 0x00)?;

        /* Enable host access to GO1 */
        self.read_from_register(0x7fff, 1)?;
        self.write_to_register(0x0C, 0x01)?;

        /* Power ON status */
        self.write_to_register(0x7fff, 0x00)?;
        self.write_to_register(0x101, 0x00)?;
        self.write_to_register(0x102, 0x00)?;
        self.write_to_register(0x010A, 0x01)?;
        self.write_to_register(0x4002, 0x01)?;
        self.write_to_register(0x4002, 0x00)?;
        self.write_to_register(0x010A, 0x03)?;
        self.write_to_register(0x103, 0x01)?;
        self.write_to_register(0x400F, 0x00)?;
        self.write_to_register(0x21A, 0x43)?;
        self.write_to_register(0x21A, 0x03)?;
        self.write_to_register(0x21A, 0x01)?;
        self.write_to_register(0x21A, 0x00)?;
        self.write_to_register(0x219, 0x00)?;
        self.write_to_register(0x21B, 0x00)?;

        /* Wake up MCU */
        self.write_to_register(0x7fff, 0x00)?;
        self.read_from_register(0x7fff, 1)?;
        self.write_to_register(0x7fff, 0x01)?;

        // The contiguous image is pushed through the fixed 32 KiB write
        // window, moving the window bank between chunks.
        for (i, chunk) in VL53L5CX_FIRMWARE.chunks(FW_WINDOW_SIZE).enumerate() {
            debug!("uploading firmware chunk {} ({} bytes)", i, chunk.len());
            self.write_to_register(0x7fff, 0x09 + i as u8)?;
            self.write_multi_to_register(0, chunk)?;
        }
        self.write_to_register(0x7fff, 0x01)?;

        /* Check if FW correctly downloaded */
        self.write_to_register(0x7fff, 0x01)?;
        self.write_to_register(0x06, 0x03)?;
        self.delay(5);
        self.write_to_register(0x7fff, 0x00)?;
        self.read_from_register(0x7fff, 1)?;
        self.write_to_register(0x0C, 0x01)?;

        /* Reset MCU and wait boot */
        self.write_to_register(0x7FFF, 0x00)?;
        self.write_to_register(0x114, 0x00)?;
        self.write_to_register(0x115, 0x00)?;
        self.write_to_register(0x116, 0x42)?;
        self.write_to_register(0x117, 0x00)?;
        self.write_to_register(0x0B, 0x00)?;
        self.read_from_register(0x7fff, 1)?;
        self.write_to_register(0x0C, 0x00)?;
        self.write_to_register(0x0B, 0x01)?;

        self.poll_for_mcu_boot()?;

        self.write_to_register(0x7fff, 0x02)?;

        /* Firmware checksum */
        self.read_from_register((0x812FFC & 0xFFFF) as u16, 4)?;
        swap_buffer(&mut self.scratch[..4]);
        let mut crc = [0u32; 1];
        from_u8_to_u32(&self.scratch[..4], &mut crc);
        if crc[0] != FW_CHECKSUM {
            error!("firmware checksum mismatch: {}", crc[0]);
            return Err(Error::Protocol(ProtocolError::FirmwareChecksum {
                expected: FW_CHECKSUM,
                found: crc[0],
            }));
        }

        /* Get offset NVM data and store them into the offset buffer */
        debug!("fetching factory calibration from NVM");
        self.write_multi_to_register(0x2fd8, &VL53L5CX_GET_NVM_CMD)?;
        self.poll_for_answer(4, 0, VL53L5CX_UI_CMD_STATUS, 0xff, 2)?;
        self.read_from_register(VL53L5CX_UI_CMD_START, NVM_DATA_SIZE)?;
        self.offset_data
            .copy_from_slice(&self.scratch[..VL53L5CX_OFFSET_BUFFER_SIZE]);

        // The MCU is up and verified; DCI traffic is legal from here on.
        self.state = State::Stopped;
        Ok(())
    }

    /// Restores the power-on measurement configuration: factory offset and
    /// default crosstalk blobs (resampled for the boot-time 4x4 grid), the
    /// default parameter set, the result pipe and the autonomous single
    /// range mode.
    pub fn default_configure(&mut self) -> Result<(), Error<B::Error>> {
        self.require_initialized()?;

        // The device always comes out of boot in 4x4.
        self.send_offset_data(Resolution::Grid4x4)?;

        self.xtalk_data.copy_from_slice(&VL53L5CX_DEFAULT_XTALK);
        self.send_xtalk_data(Resolution::Grid4x4)?;

        self.write_multi_to_register(0x2c34, &VL53L5CX_DEFAULT_CONFIGURATION)?;
        self.poll_for_answer(4, 1, VL53L5CX_UI_CMD_STATUS, 0xff, 0x03)?;

        let pipe_ctrl = [NB_TARGET_PER_ZONE as u8, 0x00, 0x01, 0x00];
        self.dci_write_data(VL53L5CX_DCI_PIPE_CONTROL, &pipe_ctrl)?;

        let mut single_range = [0u8; 4];
        from_u32_to_u8(&[0x01], &mut single_range);
        self.dci_write_data(VL53L5CX_DCI_SINGLE_RANGE, &single_range)?;

        Ok(())
    }
}
