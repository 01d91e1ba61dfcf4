//! Connectivity probe: checks that something answering like an nRF24L01+
//! sits on the bus before the scanner or transmitter are trusted.

use serde::Serialize;
use tracing::{info, warn};

use super::RadioSession;
use crate::error::{LightbarError, Result};
use crate::radio::registers::*;
use crate::radio::SpiTransport;

/// PWR_UP | EN_CRC | PRIM_RX, written when the first reads look like a
/// floating bus
const PROBE_CONFIG_VALUE: u8 = CONFIG_EN_CRC | CONFIG_PWR_UP | CONFIG_PRIM_RX;

const WIRING_HINT: &str = "check CE/CSN wiring, 3.3V supply and the SPI bus/chip-select settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    /// STATUS clocked out by a NOP
    pub status_nop: u8,
    /// CONFIG as first read
    pub config: u8,
    /// Whether the CONFIG write/readback check had to run
    pub verified_by_write: bool,
}

fn looks_floating(value: u8) -> bool {
    value == 0x00 || value == 0xFF
}

impl<T: SpiTransport> RadioSession<T> {
    pub async fn check_connection(&self) -> Result<ProbeReport> {
        let mut state = self.lock().await?;
        let radio = &mut state.radio;

        radio.initialize_bus().await?;
        tokio::time::sleep(self.timing.probe_settle).await;

        let status_nop = radio.read_status().await?;
        let (config, status) = radio.read_register(CONFIG).await?;
        info!("Probe: NOP status 0x{:02X}, CONFIG 0x{:02X} (status 0x{:02X})", status_nop, config, status);

        let mut verified_by_write = false;
        if looks_floating(config) || looks_floating(status_nop) {
            warn!("Probe readings look like an idle bus, trying a CONFIG write");
            radio.write_register(CONFIG, PROBE_CONFIG_VALUE).await?;
            let (readback, _) = radio.read_register(CONFIG).await?;
            if readback != PROBE_CONFIG_VALUE {
                return Err(LightbarError::ConnectionCheck(format!(
                    "CONFIG wrote 0x{:02X} but read back 0x{:02X}: {}",
                    PROBE_CONFIG_VALUE, readback, WIRING_HINT
                )));
            }
            info!("CONFIG write/readback OK, transceiver responding");
            verified_by_write = true;
        } else if config == CONFIG_RESET_DEFAULT {
            info!("Transceiver responding with power-on CONFIG");
        }

        Ok(ProbeReport { status_nop, config, verified_by_write })
    }
}
