//! # Xiaomi Lightbar Protocol Module
//!
//! Implementation of the over-the-air protocol spoken by the Xiaomi monitor
//! lightbar remote.
//!
//! This module handles:
//! - 18-byte frame encoding (preamble, remote ID, sequence, command, CRC)
//! - PN9 whitening of the on-air bytes
//! - CRC-16 (init 0xFFFE, poly 0x1021) calculation
//! - Bit-level frame synchronization over raw receive buffers
//! - Command classification

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
pub mod whitening;
pub mod command;
