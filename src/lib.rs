//! # Lightbar Bridge Library
//!
//! Sniff and reproduce the 2.4 GHz frames of a Xiaomi monitor lightbar remote
//! with an nRF24L01+ transceiver on SPI.
//!
//! Layers, leaves first:
//! - [`radio`]: nRF24L01+ register, command and FIFO access over an
//!   [`radio::SpiTransport`]
//! - [`xiaomi`]: frame codec (whitening, CRC-16, bit-level resync, command
//!   classification)
//! - [`link`]: channel scanner, broadcast transmitter and connectivity probe
//!   sharing one [`link::RadioSession`]
//! - [`api`]: JSON request/response bodies

pub mod api;
pub mod config;
pub mod error;
pub mod link;
pub mod radio;
pub mod xiaomi;
