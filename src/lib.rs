//! Platform-agnostic driver for the VL53L5CX multi-zone time-of-flight
//! ranging sensor.
//!
//! The VL53L5CX resolves either 4x4 (16) or 8x8 (64) zones per frame. Its
//! internal MCU runs a firmware image that the host must upload once after
//! power-on; afterwards every internal parameter is reached through the
//! sensor's indexed configuration interface (DCI) and measurements are
//! streamed as self-describing block frames.
//!
//! ```rust,ignore
//! use vl53l5cx::Vl53l5cx;
//!
//! let mut sensor = Vl53l5cx::new_i2c(i2c, lpn, delay);
//! sensor.init()?;
//! sensor.start_ranging()?;
//! loop {
//!     if sensor.check_data_ready()? {
//!         let results = sensor.get_ranging_data()?;
//!         let _mm = results.distance_mm[0];
//!     }
//! }
//! ```
//!
//! The driver is fully synchronous and blocking. Every polling loop is
//! bounded and returns [`Error::Timeout`] when its budget is exhausted. A
//! device instance owns its bus handle and working buffer exclusively; use
//! one instance per physical sensor.

#![cfg_attr(not(test), no_std)]

// must be first so the logging macros are visible to the other modules
mod fmt;

pub mod accessors;
pub mod buffers;
pub mod calibration;
mod codec;
pub mod consts;
mod dci;
mod error;
mod firmware;
mod frame;
mod plan;
mod ranging;
mod results;
pub mod transport;

pub use error::{Error, ProtocolError};
pub use frame::BlockHeader;
pub use plan::OutputChannels;
pub use results::{MotionIndicator, RangingResults};
pub use transport::{I2cTransport, Transport};

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use heapless::Vec;

use consts::SCRATCH_CAPACITY;

/// Zone grid resolution. Determines the length of every per-zone result
/// array and the sizing of the streamed output blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 4x4 grid, 16 zones, ranging frequency up to 60 Hz.
    Grid4x4,
    /// 8x8 grid, 64 zones, ranging frequency up to 15 Hz.
    Grid8x8,
}

impl Resolution {
    /// Number of zones in the grid (16 or 64).
    pub const fn zone_count(self) -> usize {
        match self {
            Resolution::Grid4x4 => 16,
            Resolution::Grid8x8 => 64,
        }
    }
}

/// Measurement scheduling policy of the sensor firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangingMode {
    /// Back-to-back measurements; the VCSEL is active for the whole frame
    /// period. Lowest latency, highest power.
    Continuous,
    /// Measurements are spaced by the ranging frequency and the device
    /// sleeps in between. Default mode.
    Autonomous,
}

/// Target reporting order when more than one target shows up in a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetOrder {
    Closest,
    Strongest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Firmware not loaded; any DCI traffic would hit a dead MCU.
    Uninitialized,
    Stopped,
    Streaming,
}

/// Driver for one VL53L5CX device.
///
/// Generic over the byte [`Transport`], the LPn (low-power enable) output
/// pin and a blocking delay provider. All methods are synchronous; no two
/// operations may be in flight against the same instance.
pub struct Vl53l5cx<B, LPN, T> {
    pub(crate) scratch: Vec<u8, SCRATCH_CAPACITY>,
    pub(crate) offset_data: [u8; consts::VL53L5CX_OFFSET_BUFFER_SIZE],
    pub(crate) xtalk_data: [u8; consts::VL53L5CX_XTALK_BUFFER_SIZE],
    pub(crate) stream_count: u8,
    pub(crate) data_read_size: usize,
    pub(crate) channels: OutputChannels,
    pub(crate) state: State,

    pub(crate) lpn_pin: LPN,
    pub(crate) bus: B,
    pub(crate) tim: T,
}

impl<B, LPN, T> Vl53l5cx<B, LPN, T>
where
    B: Transport,
    LPN: OutputPin,
    T: DelayNs,
{
    /// Creates a driver on an already-initialized transport. The sensor is
    /// not touched until [`init`](Self::init) is called.
    pub fn new(bus: B, lpn_pin: LPN, tim: T) -> Self {
        Vl53l5cx {
            scratch: Vec::new(),
            offset_data: [0; consts::VL53L5CX_OFFSET_BUFFER_SIZE],
            xtalk_data: [0; consts::VL53L5CX_XTALK_BUFFER_SIZE],
            stream_count: 0,
            data_read_size: 0,
            channels: OutputChannels::all(),
            state: State::Uninitialized,
            lpn_pin,
            bus,
            tim,
        }
    }

    /// Output channels that will be requested from the device by the next
    /// [`start_ranging`](Self::start_ranging).
    pub fn output_channels(&self) -> OutputChannels {
        self.channels
    }

    /// Selects the measurement channels streamed by the device. The
    /// mandatory bookkeeping blocks are always kept enabled. Only allowed
    /// while ranging is stopped.
    pub fn set_output_channels(&mut self, channels: OutputChannels) -> Result<(), Error<B::Error>> {
        self.require_stopped()?;
        self.channels = channels;
        Ok(())
    }

    /// `true` while a ranging session is open.
    pub fn is_ranging(&self) -> bool {
        self.state == State::Streaming
    }

    pub(crate) fn require_initialized(&self) -> Result<(), Error<B::Error>> {
        if self.state == State::Uninitialized {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    pub(crate) fn require_stopped(&self) -> Result<(), Error<B::Error>> {
        self.require_initialized()?;
        if self.state == State::Streaming {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    pub(crate) fn require_streaming(&self) -> Result<(), Error<B::Error>> {
        self.require_initialized()?;
        if self.state != State::Streaming {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    /// Clears and grows the working buffer to `len` zeroed bytes.
    pub(crate) fn scratch_resize(&mut self, len: usize) -> Result<(), Error<B::Error>> {
        self.scratch.clear();
        self.scratch.resize_default(len).map_err(|_| Error::Capacity {
            needed: len,
            capacity: SCRATCH_CAPACITY,
        })
    }

    /// Replaces the working buffer content with `payload`.
    pub(crate) fn stage_scratch(&mut self, payload: &[u8]) -> Result<(), Error<B::Error>> {
        self.scratch.clear();
        self.scratch
            .extend_from_slice(payload)
            .map_err(|_| Error::Capacity {
                needed: payload.len(),
                capacity: SCRATCH_CAPACITY,
            })
    }

    pub(crate) fn delay(&mut self, ms: u32) {
        self.tim.delay_ms(ms);
    }
}
