//! Decoded per-frame measurement data.

use heapless::Vec;

use crate::codec::from_u8_to_u32;

/// Ranging results of one frame.
///
/// Every per-zone array holds one entry per zone of the resolution the
/// frame was produced at (16 or 64) for the channels that were enabled;
/// disabled channels decode to empty arrays. A target status of 5 or 9
/// means the range is valid; 255 marks a zone with no detected target.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangingResults {
    /// Sensor-internal silicon temperature in degrees Celsius.
    pub silicon_temp_degc: i8,
    /// Ambient noise in kcps/SPAD.
    pub ambient_per_spad: Vec<u32, 64>,
    /// Number of SPADs enabled per zone.
    pub nb_spads_enabled: Vec<u32, 64>,
    /// Number of targets detected per zone.
    pub nb_target_detected: Vec<u8, 64>,
    /// Signal returned to the sensor in kcps/SPAD.
    pub signal_per_spad: Vec<u32, 64>,
    /// Sigma of the measured distance in mm.
    pub range_sigma_mm: Vec<u16, 64>,
    /// Measured distance in mm.
    pub distance_mm: Vec<i16, 64>,
    /// Estimated target reflectance in percent.
    pub reflectance: Vec<u8, 64>,
    /// Measurement validity status per zone.
    pub target_status: Vec<u8, 64>,
    /// Motion detector output.
    pub motion_indicator: MotionIndicator,
}

impl RangingResults {
    pub fn new() -> Self {
        RangingResults {
            silicon_temp_degc: 0,
            ambient_per_spad: Vec::new(),
            nb_spads_enabled: Vec::new(),
            nb_target_detected: Vec::new(),
            signal_per_spad: Vec::new(),
            range_sigma_mm: Vec::new(),
            distance_mm: Vec::new(),
            reflectance: Vec::new(),
            target_status: Vec::new(),
            motion_indicator: MotionIndicator::new(),
        }
    }
}

impl Default for RangingResults {
    fn default() -> Self {
        Self::new()
    }
}

/// Motion detector block, reported per aggregate rather than per zone.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionIndicator {
    pub global_indicator_1: u32,
    pub global_indicator_2: u32,
    pub status: u8,
    pub nb_of_detected_aggregates: u8,
    pub nb_of_aggregates: u8,
    pub motion: [u32; 32],
}

impl MotionIndicator {
    pub fn new() -> Self {
        MotionIndicator {
            global_indicator_1: 0,
            global_indicator_2: 0,
            status: 0,
            nb_of_detected_aggregates: 0,
            nb_of_aggregates: 0,
            motion: [0; 32],
        }
    }

    /// Parses the 140 byte motion block payload; shorter payloads leave the
    /// defaults in place.
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        let mut indicator = Self::new();
        if payload.len() < 140 {
            return indicator;
        }
        let mut globals = [0u32; 2];
        from_u8_to_u32(&payload[..8], &mut globals);
        indicator.global_indicator_1 = globals[0];
        indicator.global_indicator_2 = globals[1];
        indicator.status = payload[8];
        indicator.nb_of_detected_aggregates = payload[9];
        indicator.nb_of_aggregates = payload[10];
        from_u8_to_u32(&payload[12..140], &mut indicator.motion);
        indicator
    }
}

impl Default for MotionIndicator {
    fn default() -> Self {
        Self::new()
    }
}
