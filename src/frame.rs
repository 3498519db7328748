//! Streamed measurement frame: block descriptors, a bounds-checked block
//! cursor and the decoder that turns a frame into [`RangingResults`].
//!
//! A frame is self-describing: after a 16 byte header region, blocks follow
//! back to back, each prefixed by a 32-bit [`BlockHeader`]. The 16-bit
//! stream id at byte 8 of the header region is repeated in the trailing
//! footer word; a mismatch between the two marks a torn frame.

use bitfield::bitfield;

use crate::codec::{from_u8_to_i16, from_u8_to_u16, from_u8_to_u32};
use crate::consts::*;
use crate::error::ProtocolError;
use crate::results::{MotionIndicator, RangingResults};

bitfield! {
    /// 32-bit block descriptor: `{idx:16, size:12, type:4}`.
    ///
    /// For types 1 through 12 the payload spans `type * size` bytes and
    /// `size` counts elements; for any other type `size` is the payload
    /// byte count itself.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct BlockHeader(u32);
    pub raw, _: 31, 0;
    pub idx, set_idx: 31, 16;
    pub size, set_size: 15, 4;
    pub block_type, set_block_type: 3, 0;
}

impl BlockHeader {
    /// Payload length in bytes, per the type/size rule above.
    pub fn payload_len(&self) -> usize {
        let block_type = self.block_type();
        if (1..=12).contains(&block_type) {
            (block_type * self.size()) as usize
        } else {
            self.size() as usize
        }
    }
}

pub(crate) struct Block<'a> {
    pub header: BlockHeader,
    pub payload: &'a [u8],
}

/// Cursor over the block section of an already byte-swapped frame.
///
/// Stops at the end of the buffer; a descriptor whose payload would run
/// past the end terminates iteration instead of reading out of bounds.
pub(crate) struct Blocks<'a> {
    frame: &'a [u8],
    pos: usize,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(frame: &'a [u8]) -> Self {
        Blocks {
            frame,
            pos: FRAME_FIRST_BLOCK_OFFSET,
        }
    }

    pub(crate) fn next_block(&mut self) -> Option<Block<'a>> {
        let header_end = self.pos.checked_add(4)?;
        if header_end > self.frame.len() {
            return None;
        }
        let word = &self.frame[self.pos..header_end];
        let header = BlockHeader(u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
        let payload_end = header_end.checked_add(header.payload_len())?;
        if payload_end > self.frame.len() {
            return None;
        }
        self.pos = payload_end;
        Some(Block {
            header,
            payload: &self.frame[header_end..payload_end],
        })
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block()
    }
}

/// Decodes one byte-swapped frame. The integrity check runs first so a torn
/// frame is rejected before any data is interpreted.
pub(crate) fn decode_frame(frame: &[u8]) -> Result<RangingResults, ProtocolError> {
    let len = frame.len();
    debug_assert!(len >= FRAME_OVERHEAD_BYTES);

    let header_id = u16::from_be_bytes([frame[FRAME_HEADER_ID_OFFSET], frame[FRAME_HEADER_ID_OFFSET + 1]]);
    let footer_id = u16::from_be_bytes([frame[len - 4], frame[len - 3]]);
    if header_id != footer_id {
        return Err(ProtocolError::CorruptedFrame { header_id, footer_id });
    }

    let mut results = RangingResults::new();
    let mut blocks = Blocks::new(frame);
    while let Some(block) = blocks.next_block() {
        let payload = block.payload;
        match block.header.idx() as u16 {
            METADATA_IDX => {
                if payload.len() > 8 {
                    results.silicon_temp_degc = payload[8] as i8;
                }
            }
            AMBIENT_RATE_IDX => fill_u32(&mut results.ambient_per_spad, payload),
            SPAD_COUNT_IDX => fill_u32(&mut results.nb_spads_enabled, payload),
            NB_TARGET_DETECTED_IDX => fill_u8(&mut results.nb_target_detected, payload),
            SIGNAL_RATE_IDX => fill_u32(&mut results.signal_per_spad, payload),
            RANGE_SIGMA_MM_IDX => fill_u16(&mut results.range_sigma_mm, payload),
            DISTANCE_IDX => fill_i16(&mut results.distance_mm, payload),
            REFLECTANCE_EST_PC_IDX => fill_u8(&mut results.reflectance, payload),
            TARGET_STATUS_IDX => fill_u8(&mut results.target_status, payload),
            MOTION_DETEC_IDX => results.motion_indicator = MotionIndicator::from_payload(payload),
            _ => {}
        }
    }

    post_process(&mut results);
    Ok(results)
}

/// Converts the raw device units into the documented output units and
/// forces the sentinel status on empty zones.
fn post_process(results: &mut RangingResults) {
    for ambient in results.ambient_per_spad.iter_mut() {
        *ambient /= 2048;
    }
    for signal in results.signal_per_spad.iter_mut() {
        *signal /= 2048;
    }
    for sigma in results.range_sigma_mm.iter_mut() {
        *sigma /= 128;
    }
    for reflectance in results.reflectance.iter_mut() {
        *reflectance /= 2;
    }
    for distance in results.distance_mm.iter_mut() {
        *distance /= 4;
        if *distance < 0 {
            *distance = 0;
        }
    }
    for motion in results.motion_indicator.motion.iter_mut() {
        *motion /= 65535;
    }
    // A zone with no detected target keeps whatever the firmware left in
    // the status byte; overwrite it with the 255 sentinel.
    for (zone, &targets) in results.nb_target_detected.iter().enumerate() {
        if targets == 0 {
            if let Some(status) = results.target_status.get_mut(zone) {
                *status = 255;
            }
        }
    }
}

fn fill_u8(dst: &mut heapless::Vec<u8, 64>, src: &[u8]) {
    dst.clear();
    let n = src.len().min(64);
    let _ = dst.extend_from_slice(&src[..n]);
}

fn fill_u16(dst: &mut heapless::Vec<u16, 64>, src: &[u8]) {
    let n = (src.len() / 2).min(64);
    dst.clear();
    if dst.resize_default(n).is_ok() {
        from_u8_to_u16(&src[..n * 2], dst);
    }
}

fn fill_i16(dst: &mut heapless::Vec<i16, 64>, src: &[u8]) {
    let n = (src.len() / 2).min(64);
    dst.clear();
    if dst.resize_default(n).is_ok() {
        from_u8_to_i16(&src[..n * 2], dst);
    }
}

fn fill_u32(dst: &mut heapless::Vec<u32, 64>, src: &[u8]) {
    let n = (src.len() / 4).min(64);
    dst.clear();
    if dst.resize_default(n).is_ok() {
        from_u8_to_u32(&src[..n * 4], dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(template: u32, size: u32) -> u32 {
        let mut bh = BlockHeader(template);
        bh.set_size(size);
        bh.raw()
    }

    /// Host-order frame with the given blocks, stream id in header and
    /// footer.
    fn build_frame(id: u16, blocks: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let mut frame = vec![0u8; FRAME_FIRST_BLOCK_OFFSET];
        frame[FRAME_HEADER_ID_OFFSET..FRAME_HEADER_ID_OFFSET + 2].copy_from_slice(&id.to_be_bytes());
        for (header, payload) in blocks {
            assert_eq!(BlockHeader(*header).payload_len(), payload.len());
            frame.extend_from_slice(&header.to_le_bytes());
            frame.extend_from_slice(payload);
        }
        frame.extend_from_slice(&[0u8; 8]);
        let len = frame.len();
        frame[len - 4..len - 2].copy_from_slice(&id.to_be_bytes());
        frame
    }

    fn recorded_8x8_frame(first_zone_targets: u8) -> Vec<u8> {
        let mut distance = Vec::new();
        for zone in 0..64i16 {
            // raw quarter-millimeters: zone 0 measures 400 (=> 100 mm)
            distance.extend_from_slice(&(400 + zone * 4).to_le_bytes());
        }
        let mut targets = vec![1u8; 64];
        targets[0] = first_zone_targets;
        let status = vec![5u8; 64];
        let mut metadata = vec![0u8; 12];
        metadata[8] = 28;

        build_frame(
            0x1234,
            &[
                (sized(METADATA_BH, 12), metadata),
                (sized(NB_TARGET_DETECTED_BH, 64), targets),
                (sized(DISTANCE_BH, 64), distance),
                (sized(TARGET_STATUS_BH, 64), status),
            ],
        )
    }

    #[test]
    fn block_header_payload_rule() {
        // type 2, size 64 => 128 byte payload
        assert_eq!(BlockHeader(sized(DISTANCE_BH, 64)).payload_len(), 128);
        // type 0xD is outside [1, 12]: size is the byte count
        assert_eq!(BlockHeader(START_BH).payload_len(), 0);
        assert_eq!(BlockHeader(MOTION_DETECT_BH).payload_len(), 140);
    }

    #[test]
    fn decodes_recorded_frame() {
        let frame = recorded_8x8_frame(1);
        let results = decode_frame(&frame).unwrap();

        assert_eq!(results.distance_mm.len(), 64);
        assert_eq!(results.distance_mm[0], 100);
        assert_eq!(results.distance_mm[1], 101);
        assert_eq!(results.target_status[0], 5);
        assert_eq!(results.nb_target_detected[0], 1);
        assert_eq!(results.silicon_temp_degc, 28);
    }

    #[test]
    fn empty_zone_forces_status_sentinel() {
        let frame = recorded_8x8_frame(0);
        let results = decode_frame(&frame).unwrap();
        assert_eq!(results.target_status[0], 255);
        assert_eq!(results.target_status[1], 5);
    }

    #[test]
    fn negative_distances_clamp_to_zero() {
        let mut distance = vec![0u8; 128];
        distance[..2].copy_from_slice(&(-60i16).to_le_bytes());
        distance[2..4].copy_from_slice(&(3i16).to_le_bytes());
        let frame = build_frame(0x00AA, &[(sized(DISTANCE_BH, 64), distance)]);
        let results = decode_frame(&frame).unwrap();
        assert_eq!(results.distance_mm[0], 0);
        assert_eq!(results.distance_mm[1], 0); // 3 / 4
    }

    #[test]
    fn footer_mutation_is_always_detected() {
        let frame = recorded_8x8_frame(1);
        for footer_byte in [frame.len() - 4, frame.len() - 3] {
            for bit in 0..8 {
                let mut torn = frame.clone();
                torn[footer_byte] ^= 1 << bit;
                match decode_frame(&torn) {
                    Err(ProtocolError::CorruptedFrame { header_id, .. }) => {
                        assert_eq!(header_id, 0x1234)
                    }
                    other => panic!("expected corrupted frame, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn truncated_block_ends_iteration() {
        let frame = recorded_8x8_frame(1);
        // Chop the frame inside the distance payload, then restore a valid
        // footer so only the cursor bounds are exercised.
        let mut short = frame[..frame.len() - 200].to_vec();
        let len = short.len();
        short[len - 4..len - 2].copy_from_slice(&0x1234u16.to_be_bytes());
        let results = decode_frame(&short).unwrap();
        assert!(results.distance_mm.is_empty());
        assert_eq!(results.nb_target_detected.len(), 64);
    }

    #[test]
    fn scaling_applies_to_rate_channels() {
        let mut ambient = Vec::new();
        let mut signal = Vec::new();
        for _ in 0..64 {
            ambient.extend_from_slice(&(3u32 * 2048).to_le_bytes());
            signal.extend_from_slice(&(7u32 * 2048).to_le_bytes());
        }
        let frame = build_frame(
            0x0001,
            &[
                (sized(AMBIENT_RATE_BH, 64), ambient),
                (sized(SIGNAL_RATE_BH, 64), signal),
            ],
        );
        let results = decode_frame(&frame).unwrap();
        assert!(results.ambient_per_spad.iter().all(|&a| a == 3));
        assert!(results.signal_per_spad.iter().all(|&s| s == 7));
    }
}
