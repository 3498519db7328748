//! Byte-order helpers for the DCI wire format.
//!
//! The sensor's MCU stores 32-bit words in the opposite byte order from the
//! host view of the I2C stream, so every DCI payload is swapped once before
//! transmission and every reply once after reception.

/// Reverses the byte order inside every aligned 4-byte word of `buffer`.
///
/// The wire format only ever moves whole words; callers must hand in a
/// length that is a multiple of 4.
pub(crate) fn swap_buffer(buffer: &mut [u8]) {
    debug_assert!(buffer.len() % 4 == 0);
    for chunk in buffer.chunks_exact_mut(4) {
        let tmp = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&tmp.to_le_bytes());
    }
}

pub(crate) fn from_u8_to_u16(src: &[u8], dst: &mut [u16]) {
    for (i, chunk) in src.chunks_exact(2).enumerate() {
        dst[i] = u16::from_le_bytes([chunk[0], chunk[1]]);
    }
}

pub(crate) fn from_u8_to_i16(src: &[u8], dst: &mut [i16]) {
    for (i, chunk) in src.chunks_exact(2).enumerate() {
        dst[i] = i16::from_le_bytes([chunk[0], chunk[1]]);
    }
}

pub(crate) fn from_u8_to_u32(src: &[u8], dst: &mut [u32]) {
    for (i, chunk) in src.chunks_exact(4).enumerate() {
        dst[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

pub(crate) fn from_i16_to_u8(src: &[i16], dst: &mut [u8]) {
    for (i, &num) in src.iter().enumerate() {
        dst[i * 2..(i + 1) * 2].copy_from_slice(&num.to_le_bytes());
    }
}

pub(crate) fn from_u32_to_u8(src: &[u32], dst: &mut [u8]) {
    for (i, &num) in src.iter().enumerate() {
        dst[i * 4..(i + 1) * 4].copy_from_slice(&num.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_reverses_each_word() {
        let mut buf = [0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB, 0xCC, 0xDD];
        swap_buffer(&mut buf);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01, 0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn swap_round_trips() {
        for len in (4..=1000usize).step_by(4) {
            let original: Vec<u8> = (0..len).map(|i| (i * 7 + 13) as u8).collect();
            let mut buf = original.clone();
            swap_buffer(&mut buf);
            swap_buffer(&mut buf);
            assert_eq!(buf, original, "length {len}");
        }
    }

    #[test]
    fn word_conversions_round_trip() {
        let words = [0u32, 1, 0xDEAD_BEEF, u32::MAX];
        let mut bytes = [0u8; 16];
        from_u32_to_u8(&words, &mut bytes);
        let mut back = [0u32; 4];
        from_u8_to_u32(&bytes, &mut back);
        assert_eq!(back, words);

        let halves = [-4i16, 0, 400, i16::MIN];
        let mut bytes = [0u8; 8];
        from_i16_to_u8(&halves, &mut bytes);
        let mut back = [0i16; 4];
        from_u8_to_i16(&bytes, &mut back);
        assert_eq!(back, halves);
    }
}
