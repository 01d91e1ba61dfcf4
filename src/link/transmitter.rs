//! # Broadcast Transmitter
//!
//! Sends a command frame as an unacknowledged broadcast, repeated over every
//! hop channel, since the lightbar may be listening on any one of them.

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{apply_link_defaults, release_chip_enable, LinkTiming, RadioSession};
use crate::error::{LightbarError, Result};
use crate::radio::registers::*;
use crate::radio::{Nrf24, SpiTransport};
use crate::xiaomi::encoder::encode_frame;
use crate::xiaomi::protocol::{
    format_remote_id, CMD_TOGGLE_POWER, FRAME_LEN, HOP_CHANNELS, MAX_REMOTE_ID, TOGGLE_PARAMETER,
};

/// TX address, mirrored into pipe 0
const TX_ADDRESS: [u8; 5] = [0xAA; 5];

/// PWR_UP, PRIM_TX, chip CRC disabled
const TX_CONFIG: u8 = CONFIG_PWR_UP;

/// Times the whole hop sequence is swept
pub const TX_PASSES: usize = 2;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransmitReport {
    pub remote_id: u32,
    /// Sequence number carried by the frame
    pub sequence: u8,
    /// Transmissions attempted (passes x channels)
    pub attempts: u32,
    /// Transmissions that did not report MAX_RT
    pub sent: u32,
}

impl TransmitReport {
    pub fn is_sent(&self) -> bool {
        self.sent > 0
    }
}

impl<T: SpiTransport> RadioSession<T> {
    /// Broadcast the power toggle command for `remote_id`
    pub async fn transmit_power_toggle(&self, remote_id: u32) -> Result<TransmitReport> {
        self.transmit_command(remote_id, CMD_TOGGLE_POWER, TOGGLE_PARAMETER).await
    }

    /// Broadcast an arbitrary command
    ///
    /// `sent == 0` in the report means nothing left the radio; that is an
    /// outcome, not an error. The rolling sequence only advances when at
    /// least one transmission went out.
    pub async fn transmit_command(&self, remote_id: u32, command: u8, parameter: u8) -> Result<TransmitReport> {
        if remote_id > MAX_REMOTE_ID {
            return Err(LightbarError::InvalidArgument(format!(
                "Remote ID 0x{:X} exceeds 24 bits",
                remote_id
            )));
        }

        let mut guard = self.lock().await?;
        let state = &mut *guard;
        let sequence = state.sequence;
        let frame = encode_frame(remote_id, sequence, command, parameter)?;

        info!(
            "Transmitting command 0x{:02X}/0x{:02X} to {} (seq {})",
            command,
            parameter,
            format_remote_id(remote_id),
            sequence
        );

        let (attempts, sent) = match transmit_locked(&mut state.radio, &self.timing, &frame).await {
            Ok(counts) => counts,
            Err(e) => {
                warn!("Transmit aborted: {}", e);
                release_chip_enable(&mut state.radio).await;
                return Err(e);
            }
        };

        if sent > 0 {
            state.sequence = state.sequence.wrapping_add(1);
            info!("Sent {}/{} transmissions", sent, attempts);
        } else {
            warn!("No transmission completed ({} attempts)", attempts);
        }

        Ok(TransmitReport { remote_id, sequence, attempts, sent })
    }
}

async fn configure_transmitter<T: SpiTransport>(radio: &mut Nrf24<T>, timing: &LinkTiming) -> Result<()> {
    radio.initialize_bus().await?;
    apply_link_defaults(radio).await?;
    radio.write_register_buffer(TX_ADDR, &TX_ADDRESS).await?;
    radio.write_register_buffer(RX_ADDR_P0, &TX_ADDRESS).await?;
    radio.write_register(STATUS, STATUS_TX_DS | STATUS_MAX_RT).await?;
    radio.send_command(FLUSH_TX).await?;
    radio.send_command(FLUSH_RX).await?;
    radio.write_register(CONFIG, TX_CONFIG).await?;
    sleep(timing.power_up).await;
    debug!("Transmitter configured");
    Ok(())
}

/// Returns `(attempts, sent)`
async fn transmit_locked<T: SpiTransport>(
    radio: &mut Nrf24<T>,
    timing: &LinkTiming,
    frame: &[u8; FRAME_LEN],
) -> Result<(u32, u32)> {
    configure_transmitter(radio, timing).await?;

    let mut attempts = 0;
    let mut sent = 0;

    for pass in 0..TX_PASSES {
        for &channel in HOP_CHANNELS.iter() {
            radio.set_channel(channel).await?;
            radio.send_command(FLUSH_TX).await?;
            radio.write_payload(frame).await?;

            radio.set_chip_enable(true).await?;
            sleep(timing.ce_pulse).await;
            radio.set_chip_enable(false).await?;

            let mut status = 0;
            let mut ticker = timing.tx_status.start();
            while ticker.tick().await {
                status = radio.read_status().await?;
                if status & (STATUS_TX_DS | STATUS_MAX_RT) != 0 {
                    break;
                }
            }
            radio.write_register(STATUS, STATUS_TX_DS | STATUS_MAX_RT).await?;

            attempts += 1;
            if status & STATUS_MAX_RT == 0 {
                sent += 1;
            } else {
                debug!("Pass {} channel {}: MAX_RT", pass, channel);
            }
        }
    }

    Ok((attempts, sent))
}
