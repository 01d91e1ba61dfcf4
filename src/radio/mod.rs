//! # Transceiver Register Interface
//!
//! Register, command and FIFO access to an nRF24L01+ over an [`SpiTransport`].
//!
//! This module handles:
//! - Idempotent bus bring-up and chip-enable control
//! - Single and multi-byte register reads/writes
//! - Zero-payload commands (flushes, NOP)
//! - RX/TX FIFO payload transfers
//!
//! Exclusive access is enforced by ownership: every method takes `&mut self`
//! and the link layer keeps the [`Nrf24`] behind the session lock.

pub mod registers;
pub mod timing;
pub mod transport;

use crate::error::{LightbarError, Result};
use registers::*;
use tracing::trace;
pub use transport::{RppalTransport, SpiSettings, SpiTransport};

/// nRF24L01+ driver over a transport
pub struct Nrf24<T: SpiTransport> {
    transport: T,
}

impl<T: SpiTransport> std::fmt::Debug for Nrf24<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nrf24").finish_non_exhaustive()
    }
}

impl<T: SpiTransport> Nrf24<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Bring up the bus (once), attach the device (if needed) and drive CE low
    ///
    /// Safe to call any number of times.
    pub async fn initialize_bus(&mut self) -> Result<()> {
        self.transport
            .init()
            .await
            .map_err(|e| LightbarError::Transport(format!("Bus init failed: {}", e)))
    }

    /// Write one register, returning the STATUS byte clocked out alongside
    ///
    /// The address is masked to 5 bits.
    pub async fn write_register(&mut self, reg: u8, value: u8) -> Result<u8> {
        let tx = [W_REGISTER | (reg & REGISTER_MASK), value];
        let mut rx = [0u8; 2];
        self.transfer(&tx, &mut rx).await?;
        Ok(rx[0])
    }

    /// Read one register, returning `(value, status)`
    pub async fn read_register(&mut self, reg: u8) -> Result<(u8, u8)> {
        let tx = [R_REGISTER | (reg & REGISTER_MASK), NOP];
        let mut rx = [0u8; 2];
        self.transfer(&tx, &mut rx).await?;
        Ok((rx[1], rx[0]))
    }

    /// Write a multi-byte register (addresses), at most 5 bytes
    pub async fn write_register_buffer(&mut self, reg: u8, data: &[u8]) -> Result<u8> {
        if data.len() > MAX_REGISTER_BUFFER_LEN {
            return Err(LightbarError::InvalidArgument(format!(
                "Register buffer length {} exceeds {}",
                data.len(),
                MAX_REGISTER_BUFFER_LEN
            )));
        }

        let mut tx = [0u8; 1 + MAX_REGISTER_BUFFER_LEN];
        tx[0] = W_REGISTER | (reg & REGISTER_MASK);
        tx[1..=data.len()].copy_from_slice(data);
        let mut rx = [0u8; 1 + MAX_REGISTER_BUFFER_LEN];

        let len = 1 + data.len();
        self.transfer(&tx[..len], &mut rx[..len]).await?;
        Ok(rx[0])
    }

    /// Issue a command without payload (FLUSH_TX, FLUSH_RX, NOP)
    pub async fn send_command(&mut self, opcode: u8) -> Result<u8> {
        let mut rx = [0u8; 1];
        self.transfer(&[opcode], &mut rx).await?;
        Ok(rx[0])
    }

    /// Current STATUS register (via NOP)
    pub async fn read_status(&mut self) -> Result<u8> {
        self.send_command(NOP).await
    }

    /// Read `buf.len()` bytes (at most 32) from the RX FIFO
    pub async fn read_payload(&mut self, buf: &mut [u8]) -> Result<u8> {
        check_payload_len(buf.len())?;

        let mut tx = [NOP; 1 + MAX_PAYLOAD_LEN];
        tx[0] = R_RX_PAYLOAD;
        let mut rx = [0u8; 1 + MAX_PAYLOAD_LEN];

        let len = 1 + buf.len();
        self.transfer(&tx[..len], &mut rx[..len]).await?;
        buf.copy_from_slice(&rx[1..len]);
        Ok(rx[0])
    }

    /// Write `buf` (at most 32 bytes) into the TX FIFO
    pub async fn write_payload(&mut self, buf: &[u8]) -> Result<u8> {
        check_payload_len(buf.len())?;

        let mut tx = [0u8; 1 + MAX_PAYLOAD_LEN];
        tx[0] = W_TX_PAYLOAD;
        tx[1..=buf.len()].copy_from_slice(buf);
        let mut rx = [0u8; 1 + MAX_PAYLOAD_LEN];

        let len = 1 + buf.len();
        self.transfer(&tx[..len], &mut rx[..len]).await?;
        Ok(rx[0])
    }

    /// Drive the chip-enable line
    pub async fn set_chip_enable(&mut self, high: bool) -> Result<()> {
        self.transport
            .set_chip_enable(high)
            .await
            .map_err(|e| LightbarError::Transport(format!("CE write failed: {}", e)))
    }

    /// Tune to an RF channel (0-125)
    pub async fn set_channel(&mut self, channel: u8) -> Result<()> {
        self.write_register(RF_CH, channel & 0x7F).await?;
        Ok(())
    }

    async fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        self.transport
            .transfer(tx, rx)
            .await
            .map_err(|e| LightbarError::Transport(format!("SPI transaction 0x{:02X} failed: {}", tx[0], e)))?;
        trace!("spi {:02X?} -> {:02X?}", tx, rx);
        Ok(())
    }
}

fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_PAYLOAD_LEN {
        return Err(LightbarError::InvalidArgument(format!(
            "Payload length {} exceeds {}",
            len, MAX_PAYLOAD_LEN
        )));
    }
    Ok(())
}
