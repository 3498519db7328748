//! Register map, DCI indices and wire-format constants of the VL53L5CX.
//!
//! The DCI register map is the vendor's; indices are stable across firmware
//! revisions of the bundled image but are otherwise undocumented.

use embedded_hal::i2c::SevenBitAddress;

/// Factory-default 7-bit I2C address.
pub const VL53L5CX_DEFAULT_I2C_ADDRESS: SevenBitAddress = 0x52 >> 1;

/// Largest single transfer issued on the bus; register access is chunked to
/// this size.
pub(crate) const I2C_CHUNK_SIZE: usize = 32;

/// One reported target per zone. The bundled firmware image is built for
/// single-target operation; the block list below encodes the same choice.
pub(crate) const NB_TARGET_PER_ZONE: u32 = 1;

pub const VL53L5CX_DCI_ZONE_CONFIG: u16 = 0x5450;
pub const VL53L5CX_DCI_FREQ_HZ: u16 = 0x5458;
pub const VL53L5CX_DCI_INT_TIME: u16 = 0x545C;
pub const VL53L5CX_DCI_FW_NB_TARGET: u16 = 0x5478;
pub const VL53L5CX_DCI_RANGING_MODE: u16 = 0xAD30;
pub const VL53L5CX_DCI_DSS_CONFIG: u16 = 0xAD38;
pub const VL53L5CX_DCI_TARGET_ORDER: u16 = 0xAE64;
pub const VL53L5CX_DCI_SHARPENER: u16 = 0xAED8;
pub const VL53L5CX_DCI_SINGLE_RANGE: u16 = 0xD964;
pub const VL53L5CX_DCI_OUTPUT_CONFIG: u16 = 0xD968;
pub const VL53L5CX_DCI_OUTPUT_ENABLES: u16 = 0xD970;
pub const VL53L5CX_DCI_OUTPUT_LIST: u16 = 0xD980;
pub const VL53L5CX_DCI_PIPE_CONTROL: u16 = 0xDB80;
/// Streaming session descriptor; holds the frame length the device will
/// actually produce.
pub const VL53L5CX_DCI_RANGE_DATA: u16 = 0x5440;

/// Command status register of the DCI exchange window.
pub const VL53L5CX_UI_CMD_STATUS: u16 = 0x2C00;
/// First byte of the DCI exchange window; replies are read from here.
pub const VL53L5CX_UI_CMD_START: u16 = 0x2C04;
/// Last byte of the DCI exchange window; requests are written so that they
/// end here.
pub const VL53L5CX_UI_CMD_END: u16 = 0x2FFF;

// Block headers of the twelve possible output streams, single target per
// zone. Packed as {idx:16, size:12, type:4}; the size field is patched to
// the zone count by the output plan builder before upload.
pub(crate) const START_BH: u32 = 0x0000_000D;
pub(crate) const METADATA_BH: u32 = 0x54B4_00C0;
pub(crate) const COMMONDATA_BH: u32 = 0x54C0_0040;
pub(crate) const AMBIENT_RATE_BH: u32 = 0x54D0_0104;
pub(crate) const SPAD_COUNT_BH: u32 = 0x55D0_0404;
pub(crate) const NB_TARGET_DETECTED_BH: u32 = 0xDB84_0401;
pub(crate) const SIGNAL_RATE_BH: u32 = 0xDBC4_0404;
pub(crate) const RANGE_SIGMA_MM_BH: u32 = 0xDEC4_0402;
pub(crate) const DISTANCE_BH: u32 = 0xDF44_0402;
pub(crate) const REFLECTANCE_BH: u32 = 0xE044_0401;
pub(crate) const TARGET_STATUS_BH: u32 = 0xE084_0401;
pub(crate) const MOTION_DETECT_BH: u32 = 0xD858_08C0;

pub(crate) const METADATA_IDX: u16 = 0x54B4;
pub(crate) const AMBIENT_RATE_IDX: u16 = 0x54D0;
pub(crate) const SPAD_COUNT_IDX: u16 = 0x55D0;
pub(crate) const NB_TARGET_DETECTED_IDX: u16 = 0xDB84;
pub(crate) const SIGNAL_RATE_IDX: u16 = 0xDBC4;
pub(crate) const RANGE_SIGMA_MM_IDX: u16 = 0xDEC4;
pub(crate) const DISTANCE_IDX: u16 = 0xDF44;
pub(crate) const REFLECTANCE_EST_PC_IDX: u16 = 0xE044;
pub(crate) const TARGET_STATUS_IDX: u16 = 0xE084;
pub(crate) const MOTION_DETEC_IDX: u16 = 0xD858;

// Blocks whose index falls in this window are sized per zone, not per
// target.
pub(crate) const PER_ZONE_IDX_FIRST: u32 = 0x54D0;
pub(crate) const PER_ZONE_IDX_END: u32 = 0x54D0 + 960;

/// Size of the factory calibration record fetched from NVM.
pub(crate) const NVM_DATA_SIZE: usize = 492;
/// Size of the per-zone ranging offset blob.
pub const VL53L5CX_OFFSET_BUFFER_SIZE: usize = 488;
/// Size of the crosstalk compensation blob.
pub const VL53L5CX_XTALK_BUFFER_SIZE: usize = 776;

// Streamed frame layout: a 16 byte header region (stream sequence byte,
// status bytes, 16-bit stream id at offset 8), the block section, and an
// 8 byte trailer whose first half repeats the stream id.
pub(crate) const FRAME_FIRST_BLOCK_OFFSET: usize = 16;
pub(crate) const FRAME_HEADER_ID_OFFSET: usize = 8;
pub(crate) const FRAME_OVERHEAD_BYTES: usize = 24;

// Worst-case frame: every channel enabled at 8x8, one target per zone.
// Header + payload bytes per block.
const START_BLOCK: usize = 4;
const METADATA_BLOCK: usize = 4 + 12;
const COMMONDATA_BLOCK: usize = 4 + 4;
const AMBIENT_BLOCK: usize = 4 + 256;
const SPAD_BLOCK: usize = 4 + 256;
const NB_TARGET_BLOCK: usize = 4 + 64;
const SIGNAL_BLOCK: usize = 4 + 256;
const SIGMA_BLOCK: usize = 4 + 128;
const DISTANCE_BLOCK: usize = 4 + 128;
const REFLECTANCE_BLOCK: usize = 4 + 64;
const STATUS_BLOCK: usize = 4 + 64;
const MOTION_BLOCK: usize = 4 + 140;

pub(crate) const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD_BYTES
    + START_BLOCK
    + METADATA_BLOCK
    + COMMONDATA_BLOCK
    + AMBIENT_BLOCK
    + SPAD_BLOCK
    + NB_TARGET_BLOCK
    + SIGNAL_BLOCK
    + SIGMA_BLOCK
    + DISTANCE_BLOCK
    + REFLECTANCE_BLOCK
    + STATUS_BLOCK
    + MOTION_BLOCK;

/// The working buffer has to hold a full frame, but also the DCI framing
/// around the largest configuration blob.
pub(crate) const SCRATCH_CAPACITY: usize = if MAX_FRAME_SIZE < 1024 {
    1024
} else {
    MAX_FRAME_SIZE
};

/// Expected checksum word after a successful firmware upload.
pub(crate) const FW_CHECKSUM: u32 = 0x0C0B_6C9E;
/// The firmware image is pushed through a fixed 32 KiB write window.
pub(crate) const FW_WINDOW_SIZE: usize = 0x8000;

// Polling budgets. The MCU takes up to 2 s to come alive after reset and
// up to 5 s to wind down a streaming session; the two are tuned
// independently.
/// DCI command completion: 200 tries x 10 ms = 2 s.
pub(crate) const STATUS_POLL_RETRIES: u32 = 200;
pub(crate) const STATUS_POLL_INTERVAL_MS: u32 = 10;
/// MCU alive/boot: 500 tries x 4 ms = 2 s.
pub(crate) const BOOT_POLL_RETRIES: u32 = 500;
pub(crate) const BOOT_POLL_INTERVAL_MS: u32 = 4;
/// MCU halt during stop_ranging: 500 tries x 10 ms = 5 s.
pub(crate) const STOP_POLL_RETRIES: u32 = 500;
pub(crate) const STOP_POLL_INTERVAL_MS: u32 = 10;
