//! # Lightbar Frame Decoder
//!
//! The receiver is tuned promiscuously, so a captured payload holds the
//! remote's frame at an unknown byte offset and an unknown bit phase. The
//! decoder brute-forces every (offset, shift) pair and keeps the first
//! candidate that validates.

use super::crc::crc16;
use super::protocol::*;
use super::whitening::whiten;

/// Search a raw receive buffer for a valid frame
///
/// Candidates are tried from the lowest byte offset, and within one offset
/// from bit shift 0 to 7. A candidate starting at bit `offset * 8 + shift`
/// is assembled from the raw stream (bits past the end read as zero),
/// de-whitened, then checked for preamble, separator and CRC.
///
/// # Arguments
///
/// * `raw` - Bytes as read from the receive FIFO
///
/// # Returns
///
/// * `Option<DecodedCommand>` - First valid frame, or `None`
///
/// # Examples
///
/// ```
/// use lightbar_bridge::xiaomi::decoder::decode_frame;
/// use lightbar_bridge::xiaomi::encoder::encode_frame;
///
/// let frame = encode_frame(0x701634, 3, 0x01, 0x3C)?;
/// let decoded = decode_frame(&frame).expect("valid frame");
/// assert_eq!(decoded.remote_id, 0x701634);
/// assert_eq!(decoded.command_word, 0x0301);
/// # Ok::<(), lightbar_bridge::error::LightbarError>(())
/// ```
pub fn decode_frame(raw: &[u8]) -> Option<DecodedCommand> {
    if raw.len() < VALIDATION_LEN {
        return None;
    }

    for offset in 0..=raw.len() - VALIDATION_LEN {
        for shift in 0..8 {
            let candidate = extract_candidate(raw, offset, shift);
            if let Some(decoded) = validate_candidate(&candidate) {
                return Some(decoded);
            }
        }
    }

    None
}

/// Reassemble 17 bytes starting `shift` bits into `raw[offset]`
fn extract_candidate(raw: &[u8], offset: usize, shift: u32) -> [u8; VALIDATION_LEN] {
    let mut candidate = [0u8; VALIDATION_LEN];

    for (i, byte) in candidate.iter_mut().enumerate() {
        let current = raw[offset + i];
        *byte = if shift == 0 {
            current
        } else {
            let next = raw.get(offset + i + 1).copied().unwrap_or(0);
            (current << shift) | (next >> (8 - shift))
        };
    }

    whiten(&mut candidate);
    candidate
}

/// Check a de-whitened candidate and extract its fields
fn validate_candidate(frame: &[u8; VALIDATION_LEN]) -> Option<DecodedCommand> {
    if frame[..PREAMBLE.len()] != PREAMBLE {
        return None;
    }

    if frame[SEPARATOR_OFFSET] != SEPARATOR {
        return None;
    }

    let received_crc = u16::from_be_bytes([frame[CRC_OFFSET], frame[CRC_OFFSET + 1]]);
    if crc16(&frame[..CRC_COVERAGE_LEN]) != received_crc {
        return None;
    }

    let remote_id = u32::from_be_bytes([
        0,
        frame[REMOTE_ID_OFFSET],
        frame[REMOTE_ID_OFFSET + 1],
        frame[REMOTE_ID_OFFSET + 2],
    ]);

    Some(DecodedCommand {
        remote_id,
        sequence: frame[SEQUENCE_OFFSET],
        command_word: u16::from_be_bytes([frame[SEQUENCE_OFFSET], frame[COMMAND_OFFSET]]),
        parameter: frame[PARAMETER_OFFSET],
    })
}
