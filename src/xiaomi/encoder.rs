//! # Lightbar Frame Encoder
//!
//! Builds whitened 18-byte frames ready for the transmit FIFO.

use bytes::{BufMut, BytesMut};

use super::crc::crc16;
use super::protocol::*;
use super::whitening::whiten;
use crate::error::{LightbarError, Result};

/// Encode one remote action into an on-air frame
///
/// # Arguments
///
/// * `remote_id` - 24-bit remote identity
/// * `sequence` - Rolling counter
/// * `command` - Command code byte
/// * `parameter` - Parameter byte
///
/// # Returns
///
/// * `Result<[u8; 18]>` - Whitened frame
///
/// # Errors
///
/// Returns `InvalidArgument` if `remote_id` does not fit in 24 bits
///
/// # Examples
///
/// ```
/// use lightbar_bridge::xiaomi::encoder::encode_frame;
/// use lightbar_bridge::xiaomi::protocol::{CMD_TOGGLE_POWER, TOGGLE_PARAMETER};
///
/// let frame = encode_frame(0x701634, 0, CMD_TOGGLE_POWER, TOGGLE_PARAMETER)?;
/// assert_eq!(frame.len(), 18);
/// # Ok::<(), lightbar_bridge::error::LightbarError>(())
/// ```
pub fn encode_frame(remote_id: u32, sequence: u8, command: u8, parameter: u8) -> Result<[u8; FRAME_LEN]> {
    let mut frame = encode_plaintext(remote_id, sequence, command, parameter)?;
    whiten(&mut frame);
    Ok(frame)
}

/// Build the plaintext (un-whitened) frame
pub fn encode_plaintext(remote_id: u32, sequence: u8, command: u8, parameter: u8) -> Result<[u8; FRAME_LEN]> {
    if remote_id > MAX_REMOTE_ID {
        return Err(LightbarError::InvalidArgument(
            format!("Remote ID 0x{:X} exceeds 24 bits", remote_id)
        ));
    }

    let mut buf = BytesMut::with_capacity(FRAME_LEN);
    buf.put_slice(&PREAMBLE);
    buf.put_uint(remote_id as u64, 3);
    buf.put_u8(SEPARATOR);
    buf.put_u8(sequence);
    buf.put_u8(command);
    buf.put_u8(parameter);

    let crc = crc16(&buf[..CRC_COVERAGE_LEN]);
    buf.put_u16(crc);
    buf.put_u8(0x00);

    let mut frame = [0u8; FRAME_LEN];
    frame.copy_from_slice(&buf);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_layout() {
        let frame = encode_plaintext(0x701634, 0x05, 0x01, 0x3C).unwrap();

        assert_eq!(&frame[..8], &PREAMBLE);
        assert_eq!(&frame[REMOTE_ID_OFFSET..SEPARATOR_OFFSET], &[0x70, 0x16, 0x34]);
        assert_eq!(frame[SEPARATOR_OFFSET], SEPARATOR);
        assert_eq!(frame[SEQUENCE_OFFSET], 0x05);
        assert_eq!(frame[COMMAND_OFFSET], 0x01);
        assert_eq!(frame[PARAMETER_OFFSET], 0x3C);
        assert_eq!(frame[PADDING_OFFSET], 0x00);
    }

    #[test]
    fn test_plaintext_crc_is_big_endian() {
        let frame = encode_plaintext(0x123456, 1, 2, 3).unwrap();
        let crc = crc16(&frame[..CRC_COVERAGE_LEN]);

        assert_eq!(frame[CRC_OFFSET], (crc >> 8) as u8);
        assert_eq!(frame[CRC_OFFSET + 1], crc as u8);
    }

    #[test]
    fn test_encode_frame_is_whitened_plaintext() {
        let plain = encode_plaintext(0x701634, 9, 0x04, 0x03).unwrap();
        let mut on_air = encode_frame(0x701634, 9, 0x04, 0x03).unwrap();

        assert_ne!(on_air, plain);
        whiten(&mut on_air);
        assert_eq!(on_air, plain);
    }

    #[test]
    fn test_encode_rejects_wide_remote_id() {
        let result = encode_frame(0x0100_0000, 0, 0, 0);
        match result {
            Err(LightbarError::InvalidArgument(msg)) => assert!(msg.contains("24 bits")),
            other => panic!("Expected InvalidArgument, got: {:?}", other),
        }
    }

    #[test]
    fn test_encode_accepts_max_remote_id() {
        let frame = encode_plaintext(MAX_REMOTE_ID, 0, 0, 0).unwrap();
        assert_eq!(&frame[REMOTE_ID_OFFSET..SEPARATOR_OFFSET], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_different_sequence_different_crc() {
        let frame1 = encode_plaintext(0x701634, 1, 0x01, 0x3C).unwrap();
        let frame2 = encode_plaintext(0x701634, 2, 0x01, 0x3C).unwrap();

        assert_ne!(&frame1[CRC_OFFSET..CRC_OFFSET + 2], &frame2[CRC_OFFSET..CRC_OFFSET + 2]);
    }
}
