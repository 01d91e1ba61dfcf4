//! # Frame Whitening
//!
//! The remote XORs every on-air frame with a fixed 18-byte mask taken from
//! the head of the PN9 sequence (x^9 + x^5 + 1, seed 0x1FF, LSB first).
//! XOR with a constant mask is its own inverse, so [`whiten`] both scrambles
//! and descrambles.

use super::protocol::FRAME_LEN;

/// PN9 seed
const PN9_SEED: u16 = 0x01FF;

/// Whitening mask applied positionally from frame offset 0
pub const WHITENING_PATTERN: [u8; FRAME_LEN] = generate_pn9_pattern();

/// Generate the mask at compile time
const fn generate_pn9_pattern() -> [u8; FRAME_LEN] {
    let mut pattern = [0u8; FRAME_LEN];
    let mut lfsr = PN9_SEED;
    let mut i = 0;

    while i < FRAME_LEN {
        pattern[i] = (lfsr & 0xFF) as u8;

        let mut j = 0;
        while j < 8 {
            let feedback = (lfsr ^ (lfsr >> 5)) & 1;
            lfsr = (lfsr >> 1) | (feedback << 8);
            j += 1;
        }

        i += 1;
    }

    pattern
}

/// Whiten (or de-whiten) a buffer in place
///
/// Only the first 18 bytes are touched; shorter buffers are processed up to
/// their length.
///
/// # Examples
///
/// ```
/// use lightbar_bridge::xiaomi::whitening::whiten;
///
/// let mut buf = [0x53, 0x39, 0x14];
/// whiten(&mut buf);
/// whiten(&mut buf);
/// assert_eq!(buf, [0x53, 0x39, 0x14]);
/// ```
pub fn whiten(buf: &mut [u8]) {
    for (byte, mask) in buf.iter_mut().zip(WHITENING_PATTERN.iter()) {
        *byte ^= mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_starts_with_seed() {
        assert_eq!(WHITENING_PATTERN[0], 0xFF);
    }

    #[test]
    fn test_pattern_is_not_degenerate() {
        // A zero mask would leave frames in the clear
        assert!(WHITENING_PATTERN.iter().any(|&b| b != 0x00));
        assert!(WHITENING_PATTERN.iter().any(|&b| b != 0xFF));
    }

    #[test]
    fn test_whiten_is_involution_for_all_lengths() {
        let original: Vec<u8> = (0..FRAME_LEN as u8).map(|i| i.wrapping_mul(37) ^ 0xA5).collect();

        for len in 0..=FRAME_LEN {
            let mut buf = original[..len].to_vec();
            whiten(&mut buf);
            whiten(&mut buf);
            assert_eq!(buf, &original[..len], "involution failed for length {}", len);
        }
    }

    #[test]
    fn test_whiten_changes_data() {
        let mut buf = [0u8; FRAME_LEN];
        whiten(&mut buf);
        assert_eq!(buf, WHITENING_PATTERN);
    }

    #[test]
    fn test_whiten_only_touches_first_18_bytes() {
        let mut buf = [0x11u8; 24];
        whiten(&mut buf);
        assert_eq!(&buf[FRAME_LEN..], &[0x11u8; 6]);
    }
}
