//! # Radio Link Module
//!
//! Protocol operations built on the register interface: channel-hopping
//! scan, redundant broadcast transmit and the connectivity probe.
//!
//! All of them go through one [`RadioSession`], which owns the transceiver,
//! the rolling sequence counter and the last published scan result. The
//! transceiver sits behind a single lock; scan, transmit and probe each hold
//! it for their whole run, so their register traffic never interleaves.

pub mod probe;
pub mod scanner;
pub mod transmitter;

use std::time::Duration;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{LightbarError, Result};
use crate::radio::registers::*;
use crate::radio::timing::Poller;
use crate::radio::{Nrf24, SpiTransport};

pub use probe::ProbeReport;
pub use scanner::{ScanMode, ScanResult};
pub use transmitter::TransmitReport;

/// Timing knobs for link operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    /// Longest wait for the session lock
    pub lock_timeout: Duration,
    /// How long to listen on a channel before hopping, and how often to sample
    pub listen: Poller,
    /// How long to wait for TX_DS / MAX_RT after a transmission
    pub tx_status: Poller,
    /// Width of the CE pulse that starts a transmission
    pub ce_pulse: Duration,
    /// Settle time after setting PWR_UP
    pub power_up: Duration,
    /// Settle time after bus bring-up in the probe
    pub probe_settle: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            listen: Poller::once_after(Duration::from_millis(20)),
            tx_status: Poller::once_after(Duration::from_millis(2)),
            ce_pulse: Duration::from_micros(100),
            power_up: Duration::from_millis(2),
            probe_settle: Duration::from_millis(5),
        }
    }
}

/// State only touched while holding the session lock
struct LinkState<T: SpiTransport> {
    radio: Nrf24<T>,
    sequence: u8,
}

/// Shared handle to the transceiver, created once at startup
pub struct RadioSession<T: SpiTransport> {
    state: Mutex<LinkState<T>>,
    timing: LinkTiming,
    last_scan: watch::Sender<ScanResult>,
}

impl<T: SpiTransport> std::fmt::Debug for RadioSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioSession")
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl<T: SpiTransport> RadioSession<T> {
    pub fn new(transport: T, timing: LinkTiming) -> Self {
        let (last_scan, _) = watch::channel(ScanResult::default());
        Self {
            state: Mutex::new(LinkState { radio: Nrf24::new(transport), sequence: 0 }),
            timing,
            last_scan,
        }
    }

    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    /// Snapshot of the most recently finished scan
    ///
    /// Published by the scanner just before it releases the lock; never
    /// blocks on an in-progress operation.
    pub fn last_scan_result(&self) -> ScanResult {
        self.last_scan.borrow().clone()
    }

    /// Receiver notified each time a scan publishes its result
    pub fn subscribe_scan_results(&self) -> watch::Receiver<ScanResult> {
        self.last_scan.subscribe()
    }

    async fn lock(&self) -> Result<MutexGuard<'_, LinkState<T>>> {
        tokio::time::timeout(self.timing.lock_timeout, self.state.lock())
            .await
            .map_err(|_| LightbarError::LockTimeout(self.timing.lock_timeout))
    }
}

/// Settings shared by the receive and transmit configurations: no auto-ack,
/// no retransmission, one pipe, 5-byte addresses, 2 Mbps, no dynamic
/// payloads or extra features.
async fn apply_link_defaults<T: SpiTransport>(radio: &mut Nrf24<T>) -> Result<()> {
    radio.set_chip_enable(false).await?;
    radio.write_register(EN_AA, 0x00).await?;
    radio.write_register(SETUP_RETR, 0x00).await?;
    radio.write_register(EN_RXADDR, 0x01).await?;
    radio.write_register(SETUP_AW, ADDRESS_WIDTH_5).await?;
    radio.write_register(RF_SETUP, RF_SETUP_2MBPS_0DBM).await?;
    radio.write_register(DYNPD, 0x00).await?;
    radio.write_register(FEATURE, 0x00).await?;
    Ok(())
}

/// Drop CE after a failed operation; the original error wins over this one
async fn release_chip_enable<T: SpiTransport>(radio: &mut Nrf24<T>) {
    if let Err(e) = radio.set_chip_enable(false).await {
        warn!("Failed to deassert CE after error: {}", e);
    } else {
        debug!("CE deasserted after error");
    }
}
