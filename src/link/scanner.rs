//! # Channel Scanner
//!
//! Listens across the hop sequence with the transceiver in a promiscuous
//! receive setup and feeds every captured payload to the frame decoder.
//!
//! Two variants:
//! - [`ScanMode::Identity`]: run for the whole duration, recording the last
//!   remote seen
//! - [`ScanMode::CommandCoverage`]: additionally classify every command and
//!   stop as soon as all six button categories were seen

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{apply_link_defaults, release_chip_enable, LinkTiming, RadioSession};
use crate::error::Result;
use crate::radio::registers::*;
use crate::radio::timing::Deadline;
use crate::radio::{Nrf24, SpiTransport};
use crate::xiaomi::command::{classify_command, ALL_COMMANDS_MASK};
use crate::xiaomi::decoder::decode_frame;
use crate::xiaomi::protocol::{format_remote_id, DecodedCommand, HOP_CHANNELS};

/// Pipe 0 address while sniffing
const SCAN_RX_ADDRESS: [u8; 5] = [0x55; 5];

/// PWR_UP | PRIM_RX, chip CRC disabled (frames carry their own CRC)
const SCAN_CONFIG: u8 = CONFIG_PWR_UP | CONFIG_PRIM_RX;

/// Payloads the receive FIFO can hold; reads per RX_DR are capped at this
const RX_FIFO_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Identity,
    #[serde(rename = "coverage")]
    CommandCoverage,
}

/// Outcome of one scan invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Valid frames decoded during the scan
    pub found_count: u32,
    /// Identity of the most recently decoded frame
    pub remote_id: u32,
    pub id_found: bool,
    /// Button categories seen (coverage mode only)
    pub commands_mask: u8,
    pub last_sequence: Option<u8>,
    /// `None` until a scan has run
    pub started_at: Option<DateTime<Utc>>,
    pub mode: ScanMode,
}

impl ScanResult {
    fn started(mode: ScanMode) -> Self {
        Self {
            started_at: Some(Utc::now()),
            mode,
            ..Self::default()
        }
    }

    /// Fold a decoded frame into the result. Returns `true` once coverage
    /// mode has seen every category.
    fn record(&mut self, decoded: &DecodedCommand) -> bool {
        self.found_count += 1;
        self.remote_id = decoded.remote_id;
        self.id_found = true;
        self.last_sequence = Some(decoded.sequence);

        if self.mode != ScanMode::CommandCoverage {
            return false;
        }

        let kind = classify_command(decoded.command_word);
        if let Some(bit) = kind.mask_bit() {
            if self.commands_mask & bit == 0 {
                debug!("New command category {:?} (word 0x{:04X})", kind, decoded.command_word);
            }
            self.commands_mask |= bit;
        }
        self.commands_mask & ALL_COMMANDS_MASK == ALL_COMMANDS_MASK
    }

    pub fn coverage_complete(&self) -> bool {
        self.commands_mask & ALL_COMMANDS_MASK == ALL_COMMANDS_MASK
    }
}

impl<T: SpiTransport> RadioSession<T> {
    /// Scan the hop channels for up to `duration`
    ///
    /// Not finding a remote is reported through `id_found == false`, not as
    /// an error. The result is published as the last scan result on every
    /// exit after the lock was acquired, including a transport failure.
    pub async fn scan(&self, duration: Duration, mode: ScanMode) -> Result<ScanResult> {
        let mut state = self.lock().await?;
        let mut result = ScanResult::started(mode);
        info!("Scanning for {:?} ({:?} mode)", duration, mode);

        let outcome = scan_locked(&mut state.radio, &self.timing, duration, &mut result).await;
        match &outcome {
            Ok(()) if result.id_found => info!(
                "Scan finished: remote {} ({} frames, mask 0x{:02X})",
                format_remote_id(result.remote_id),
                result.found_count,
                result.commands_mask
            ),
            Ok(()) => info!("Scan finished: no remote found"),
            Err(e) => {
                warn!("Scan aborted: {}", e);
                release_chip_enable(&mut state.radio).await;
            }
        }

        self.last_scan.send_replace(result.clone());
        drop(state);

        outcome.map(|()| result)
    }
}

async fn configure_receiver<T: SpiTransport>(radio: &mut Nrf24<T>, timing: &LinkTiming) -> Result<()> {
    radio.initialize_bus().await?;
    apply_link_defaults(radio).await?;
    radio.write_register_buffer(RX_ADDR_P0, &SCAN_RX_ADDRESS).await?;
    radio.write_register(RX_PW_P0, MAX_PAYLOAD_LEN as u8).await?;
    radio.send_command(FLUSH_RX).await?;
    radio.write_register(STATUS, STATUS_RX_DR | STATUS_TX_DS | STATUS_MAX_RT).await?;
    radio.write_register(CONFIG, SCAN_CONFIG).await?;
    tokio::time::sleep(timing.power_up).await;
    debug!("Receiver configured");
    Ok(())
}

async fn scan_locked<T: SpiTransport>(
    radio: &mut Nrf24<T>,
    timing: &LinkTiming,
    duration: Duration,
    result: &mut ScanResult,
) -> Result<()> {
    configure_receiver(radio, timing).await?;

    let deadline = Deadline::after(duration);
    let mut payload = [0u8; MAX_PAYLOAD_LEN];

    while !deadline.is_expired() {
        for &channel in HOP_CHANNELS.iter() {
            radio.set_channel(channel).await?;
            radio.send_command(FLUSH_RX).await?;
            radio.set_chip_enable(true).await?;

            let mut data_ready = false;
            let mut ticker = timing.listen.start();
            while ticker.tick().await {
                if radio.read_status().await? & STATUS_RX_DR != 0 {
                    data_ready = true;
                    break;
                }
            }

            if !data_ready {
                radio.set_chip_enable(false).await?;
                continue;
            }

            for _ in 0..RX_FIFO_DEPTH {
                radio.read_payload(&mut payload).await?;
                if let Some(decoded) = decode_frame(&payload) {
                    debug!(
                        "Channel {}: remote {} seq {} word 0x{:04X}",
                        channel,
                        format_remote_id(decoded.remote_id),
                        decoded.sequence,
                        decoded.command_word
                    );
                    if result.record(&decoded) {
                        info!("All command categories seen after {:?}", deadline.elapsed());
                        radio.send_command(FLUSH_RX).await?;
                        radio.write_register(STATUS, STATUS_RX_DR).await?;
                        radio.set_chip_enable(false).await?;
                        return Ok(());
                    }
                }

                let (fifo_status, _) = radio.read_register(FIFO_STATUS).await?;
                if fifo_status & FIFO_RX_EMPTY != 0 || deadline.is_expired() {
                    break;
                }
            }

            radio.write_register(STATUS, STATUS_RX_DR).await?;
            radio.set_chip_enable(false).await?;
        }
    }

    Ok(())
}
