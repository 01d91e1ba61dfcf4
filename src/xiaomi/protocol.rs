//! # Lightbar Protocol Constants and Types
//!
//! Core protocol definitions for the lightbar remote link.
//!
//! Plaintext frame layout (before whitening):
//!
//! ```text
//! 0       8         11   12   13   14    15    17
//! +-------+---------+----+----+----+-----+-----+---+
//! |preamb.|remote ID| FF |seq |cmd |param| CRC |00 |
//! +-------+---------+----+----+----+-----+-----+---+
//! ```

/// Frame sync marker, the first 8 plaintext bytes of every frame
pub const PREAMBLE: [u8; 8] = [0x53, 0x39, 0x14, 0xDD, 0x1C, 0x49, 0x34, 0x12];

/// Separator byte following the remote identity
pub const SEPARATOR: u8 = 0xFF;

/// Total frame size on air
pub const FRAME_LEN: usize = 18;

/// Bytes needed to validate a frame (the trailing padding is not checked)
pub const VALIDATION_LEN: usize = 17;

/// Bytes covered by the CRC
pub const CRC_COVERAGE_LEN: usize = 15;

/// Field offsets
pub const REMOTE_ID_OFFSET: usize = 8;
pub const SEPARATOR_OFFSET: usize = 11;
pub const SEQUENCE_OFFSET: usize = 12;
pub const COMMAND_OFFSET: usize = 13;
pub const PARAMETER_OFFSET: usize = 14;
pub const CRC_OFFSET: usize = 15;
pub const PADDING_OFFSET: usize = 17;

/// Largest representable remote identity (24 bits)
pub const MAX_REMOTE_ID: u32 = 0x00FF_FFFF;

/// Channels the lightbar hops across, in order
pub const HOP_CHANNELS: [u8; 4] = [6, 43, 68, 98];

/// Command code for "toggle power"
pub const CMD_TOGGLE_POWER: u8 = 0x01;

/// Parameter byte sent with [`CMD_TOGGLE_POWER`].
///
/// Inferred from captured traffic rather than derived from protocol
/// documentation; treat as unverified.
pub const TOGGLE_PARAMETER: u8 = 0x3C;

/// A frame that passed preamble, separator and CRC validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedCommand {
    /// 24-bit remote identity
    pub remote_id: u32,

    /// Rolling counter (byte 12)
    pub sequence: u8,

    /// Bytes 12-13 read as one big-endian word: sequence byte high,
    /// command byte low. Classification keys on this word as a whole.
    pub command_word: u16,

    /// Byte 14
    pub parameter: u8,
}

impl DecodedCommand {
    /// Command code byte (byte 13, low byte of the command word)
    pub fn command(&self) -> u8 {
        self.command_word as u8
    }
}

/// Format a remote identity the way the API reports it (`0x701634`)
pub fn format_remote_id(remote_id: u32) -> String {
    format!("0x{:06X}", remote_id & MAX_REMOTE_ID)
}
