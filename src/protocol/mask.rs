//! Payload masking (RFC 6455 Section 5.3).

/// XOR the payload with the repeating 4-byte mask key, in place.
///
/// Masking is its own inverse, so this both masks and unmasks. Word-at-a-time
/// over aligned chunks, byte-at-a-time for the tail.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    let mask_word = u32::from_ne_bytes(mask);

    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(word ^ mask_word).to_ne_bytes());
    }
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= mask[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_known_vector() {
        // "Hello" under mask [0x37, 0xfa, 0x21, 0x3d] per RFC 6455 Section 5.7.
        let mut data = b"Hello".to_vec();
        apply_mask(&mut data, [0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(data, [0x7f, 0x9f, 0x4d, 0x51, 0x58]);
    }

    #[test]
    fn test_mask_is_involution() {
        let original: Vec<u8> = (0..=255).collect();
        let mut data = original.clone();
        apply_mask(&mut data, [0xde, 0xad, 0xbe, 0xef]);
        assert_ne!(data, original);
        apply_mask(&mut data, [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(data, original);
    }

    #[test]
    fn test_mask_empty_and_short() {
        let mut empty: Vec<u8> = vec![];
        apply_mask(&mut empty, [1, 2, 3, 4]);
        assert!(empty.is_empty());

        // Lengths that exercise the tail path.
        for len in 1..8 {
            let original = vec![0xaa; len];
            let mut data = original.clone();
            apply_mask(&mut data, [0x01, 0x02, 0x03, 0x04]);
            apply_mask(&mut data, [0x01, 0x02, 0x03, 0x04]);
            assert_eq!(data, original);
        }
    }

    #[test]
    fn test_zero_mask_is_identity() {
        let mut data = b"unchanged".to_vec();
        apply_mask(&mut data, [0, 0, 0, 0]);
        assert_eq!(data, b"unchanged");
    }
}
