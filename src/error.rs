use thiserror::Error;

/// Driver error, generic over the transport's own error type.
///
/// Multi-step sequences fail fast: the first failing sub-step aborts the
/// whole operation and its diagnostic is preserved. The device register
/// space is not transactional, so a failed sequence leaves no defined
/// device state behind; recover with [`stop_ranging`] and a fresh
/// configuration rather than retrying blindly.
///
/// [`stop_ranging`]: crate::Vl53l5cx::stop_ranging
#[derive(Debug, PartialEq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<B> {
    /// The underlying bus failed. Fatal to the in-flight call.
    #[error("transport error")]
    Transport(B),
    /// A bounded polling loop exhausted its budget without the device
    /// reaching the expected state.
    #[error("polling budget exceeded")]
    Timeout,
    /// The device answered, but not with what the protocol requires.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    /// A payload does not fit the driver's working buffer.
    #[error("payload of {needed} bytes exceeds the {capacity} byte working buffer")]
    Capacity { needed: usize, capacity: usize },
    /// An argument was rejected before any bus traffic took place.
    #[error("invalid argument")]
    InvalidArgument,
    /// The firmware loader has not completed on this device instance.
    #[error("device not initialized")]
    NotInitialized,
}

/// Details for [`Error::Protocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// The stream id in the frame header does not match the one in the
    /// footer: the frame was torn or corrupted in flight. The decoded
    /// result is discarded; the caller may retry the read.
    #[error("frame header id {header_id} does not match footer id {footer_id}")]
    CorruptedFrame { header_id: u16, footer_id: u16 },
    /// The frame length the device reports differs from the one computed
    /// from the output plan.
    #[error("device reports {reported} byte frames, output plan computed {expected}")]
    FrameSizeMismatch { expected: usize, reported: usize },
    /// The checksum word read back after firmware upload is wrong.
    #[error("firmware checksum {found} (expected {expected})")]
    FirmwareChecksum { expected: u32, found: u32 },
    /// The identity registers do not match the VL53L5CX.
    #[error("unexpected device id {device_id}/{revision_id}")]
    DeviceIdMismatch { device_id: u8, revision_id: u8 },
    /// The internal MCU flagged an error status during a command poll.
    #[error("MCU error status {0}")]
    McuError(u8),
    /// The GO2 fault bit was raised while streaming.
    #[error("GO2 fault while streaming")]
    McuFault,
    /// A well-formed reply carried a value outside the documented domain.
    #[error("unexpected response value")]
    UnexpectedResponse,
}
