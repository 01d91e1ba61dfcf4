//! # CRC-16 Implementation
//!
//! CRC-16 checksum over the first 15 plaintext bytes of a lightbar frame.
//!
//! **Polynomial**: 0x1021 (x^16 + x^12 + x^5 + 1)
//! **Initial Value**: 0xFFFE
//! **Reflection**: none, bytes fed MSB first
//! **Final XOR**: none

/// CRC-16 polynomial
const CRC16_POLY: u16 = 0x1021;

/// Initial register value used by the lightbar
pub const CRC16_INIT: u16 = 0xFFFE;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the lightbar CRC-16 using lookup table (fast)
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for (frame bytes 0-14)
///
/// # Returns
///
/// * `u16` - Calculated CRC16 checksum
///
/// # Examples
///
/// ```
/// use lightbar_bridge::xiaomi::crc::crc16;
///
/// let data = [0x53, 0x39, 0x14, 0xDD];
/// assert_eq!(crc16(&data), crc16(&data));
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    crc16_with_init(CRC16_INIT, data)
}

/// Calculate CRC-16 (poly 0x1021, MSB first) from an arbitrary initial value
pub fn crc16_with_init(init: u16, data: &[u8]) -> u16 {
    let mut crc = init;

    for &byte in data {
        let index = ((crc >> 8) as u8 ^ byte) as usize;
        crc = (crc << 8) ^ CRC16_TABLE[index];
    }

    crc
}

/// Calculate CRC-16 using direct algorithm (slow, for verification)
///
/// Used primarily for testing the lookup table implementation.
#[allow(dead_code)]
fn crc16_slow(init: u16, data: &[u8]) -> u16 {
    let mut crc = init;

    for &byte in data {
        crc ^= (byte as u16) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xiaomi::protocol::PREAMBLE;

    fn sample_header() -> Vec<u8> {
        let mut data = PREAMBLE.to_vec();
        data.extend_from_slice(&[0x70, 0x16, 0x34, 0xFF, 0x05, 0x01, 0x3C]);
        data
    }

    #[test]
    fn test_crc16_empty_is_init() {
        assert_eq!(crc16(&[]), CRC16_INIT);
    }

    #[test]
    fn test_crc16_ccitt_false_check_value() {
        // Standard check value for CRC-16/CCITT-FALSE (init 0xFFFF)
        assert_eq!(crc16_with_init(0xFFFF, b"123456789"), 0x29B1);
        // CRC-16/XMODEM (init 0x0000) shares the polynomial
        assert_eq!(crc16_with_init(0x0000, b"123456789"), 0x31C3);
    }

    #[test]
    fn test_crc16_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF, 0xFE, 0xFD],
            sample_header(),
            vec![0x00; 15],
            vec![0xFF; 15],
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc16(data),
                crc16_slow(CRC16_INIT, data),
                "CRC mismatch for data: {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc16_deterministic() {
        let data = sample_header();
        assert_eq!(crc16(&data), crc16(&data.clone()));
    }

    #[test]
    fn test_crc16_detects_every_single_bit_flip() {
        let data = sample_header();
        let reference = crc16(&data);

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data.clone();
                flipped[byte] ^= 1 << bit;
                assert_ne!(
                    crc16(&flipped),
                    reference,
                    "bit {} of byte {} flipped without changing the CRC",
                    bit,
                    byte
                );
            }
        }
    }
}
