//! Resampling and upload of the per-zone calibration blobs.
//!
//! The factory offset record and the crosstalk compensation blob embed 8x8
//! grids. When the sensor runs at 4x4 the firmware expects matching 4x4
//! data, so each output cell is computed as the integer mean of its four
//! constituent 8x8 cells and the unused tail of the grid is zeroed. The
//! transform runs on a working copy at every resolution change; the stored
//! blobs are never modified.

use embedded_hal::{delay::DelayNs, digital::OutputPin};

use crate::codec::{from_i16_to_u8, from_u8_to_i16, from_u8_to_u32, from_u32_to_u8, swap_buffer};
use crate::consts::*;
use crate::transport::Transport;
use crate::{Error, Resolution, Vl53l5cx};

/// Collapses an 8x8 unsigned grid into its 4x4 block mean, in place. The
/// first 16 cells receive the means; the rest are zeroed.
pub fn resample_signal_grid(grid: &mut [u32; 64]) {
    for j in 0..4 {
        for i in 0..4 {
            let s = (2 * i) + (16 * j);
            let sum = grid[s] as u64
                + grid[s + 1] as u64
                + grid[s + 8] as u64
                + grid[s + 9] as u64;
            grid[i + (4 * j)] = (sum / 4) as u32;
        }
    }
    grid[16..].fill(0);
}

/// Signed variant of [`resample_signal_grid`] for the ranging offset grid.
pub fn resample_range_grid(grid: &mut [i16; 64]) {
    for j in 0..4 {
        for i in 0..4 {
            let s = (2 * i) + (16 * j);
            let sum = grid[s] as i32
                + grid[s + 1] as i32
                + grid[s + 8] as i32
                + grid[s + 9] as i32;
            grid[i + (4 * j)] = (sum / 4) as i16;
        }
    }
    grid[16..].fill(0);
}

impl<B, LPN, T> Vl53l5cx<B, LPN, T>
where
    B: Transport,
    LPN: OutputPin,
    T: DelayNs,
{
    /// Pushes the factory offset record, resampled to `resolution`.
    pub(crate) fn send_offset_data(&mut self, resolution: Resolution) -> Result<(), Error<B::Error>> {
        // Vendor-provided DSS literals for the 4x4 layout; kept verbatim,
        // not derived from the resolution.
        let dss_4x4: [u8; 8] = [0x0F, 0x04, 0x04, 0x00, 0x08, 0x10, 0x10, 0x07];
        let footer: [u8; 8] = [0x00, 0x00, 0x00, 0x0F, 0x03, 0x01, 0x01, 0xE4];

        let data = self.offset_data;
        self.stage_scratch(&data)?;

        /* Data extrapolation is required for 4x4 offset */
        if resolution == Resolution::Grid4x4 {
            let mut signal_grid = [0u32; 64];
            let mut range_grid = [0i16; 64];

            self.scratch[0x10..0x10 + dss_4x4.len()].copy_from_slice(&dss_4x4);
            swap_buffer(&mut self.scratch[..VL53L5CX_OFFSET_BUFFER_SIZE]);
            from_u8_to_u32(&self.scratch[0x3C..0x3C + 256], &mut signal_grid);
            from_u8_to_i16(&self.scratch[0x140..0x140 + 128], &mut range_grid);

            resample_signal_grid(&mut signal_grid);
            resample_range_grid(&mut range_grid);

            from_u32_to_u8(&signal_grid, &mut self.scratch[0x3C..0x3C + 256]);
            from_i16_to_u8(&range_grid, &mut self.scratch[0x140..0x140 + 128]);
            swap_buffer(&mut self.scratch[..VL53L5CX_OFFSET_BUFFER_SIZE]);
        }

        self.scratch.copy_within(8..VL53L5CX_OFFSET_BUFFER_SIZE, 0);
        self.scratch[0x1E0..0x1E0 + footer.len()].copy_from_slice(&footer);
        self.write_scratch_to_register(0x2E18, VL53L5CX_OFFSET_BUFFER_SIZE)?;
        self.poll_for_answer(4, 1, VL53L5CX_UI_CMD_STATUS, 0xFF, 0x03)
    }

    /// Pushes the crosstalk blob, resampled to `resolution`.
    pub(crate) fn send_xtalk_data(&mut self, resolution: Resolution) -> Result<(), Error<B::Error>> {
        let res4x4: [u8; 8] = [0x0F, 0x04, 0x04, 0x17, 0x08, 0x10, 0x10, 0x07];
        let dss_4x4: [u8; 8] = [0x00, 0x78, 0x00, 0x08, 0x00, 0x00, 0x00, 0x08];
        let profile_4x4: [u8; 4] = [0xA0, 0xFC, 0x01, 0x00];

        let data = self.xtalk_data;
        self.stage_scratch(&data)?;

        /* Data extrapolation is required for 4x4 Xtalk */
        if resolution == Resolution::Grid4x4 {
            let mut signal_grid = [0u32; 64];

            self.scratch[0x8..0x8 + res4x4.len()].copy_from_slice(&res4x4);
            self.scratch[0x020..0x020 + dss_4x4.len()].copy_from_slice(&dss_4x4);

            swap_buffer(&mut self.scratch[..VL53L5CX_XTALK_BUFFER_SIZE]);
            from_u8_to_u32(&self.scratch[0x34..0x34 + 256], &mut signal_grid);
            resample_signal_grid(&mut signal_grid);
            from_u32_to_u8(&signal_grid, &mut self.scratch[0x34..0x34 + 256]);
            swap_buffer(&mut self.scratch[..VL53L5CX_XTALK_BUFFER_SIZE]);

            self.scratch[0x134..0x134 + profile_4x4.len()].copy_from_slice(&profile_4x4);
            self.scratch[0x078..0x078 + 4].copy_from_slice(&[0; 4]);
        }

        self.write_scratch_to_register(0x2CF8, VL53L5CX_XTALK_BUFFER_SIZE)?;
        self.poll_for_answer(4, 1, VL53L5CX_UI_CMD_STATUS, 0xFF, 0x03)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_grid_matches_golden_reference() {
        let mut grid = [0u32; 64];
        for (k, cell) in grid.iter_mut().enumerate() {
            *cell = k as u32;
        }
        resample_signal_grid(&mut grid);

        // mean of {s, s+1, s+8, s+9} for s = 2i + 16j
        let golden: [u32; 16] = [
            4, 6, 8, 10, //
            20, 22, 24, 26, //
            36, 38, 40, 42, //
            52, 54, 56, 58,
        ];
        assert_eq!(&grid[..16], &golden);
        assert!(grid[16..].iter().all(|&c| c == 0));
    }

    #[test]
    fn range_grid_averages_signed_cells() {
        let mut grid = [-8i16; 64];
        grid[0] = -1;
        grid[1] = -2;
        grid[8] = -3;
        grid[9] = -4;
        resample_range_grid(&mut grid);

        assert_eq!(grid[0], -2); // (-1 - 2 - 3 - 4) / 4
        assert!(grid[1..16].iter().all(|&c| c == -8));
        assert!(grid[16..].iter().all(|&c| c == 0));
    }

    #[test]
    fn resampling_is_idempotent_on_uniform_grids() {
        let mut grid = [1000u32; 64];
        resample_signal_grid(&mut grid);
        assert!(grid[..16].iter().all(|&c| c == 1000));
    }
}
