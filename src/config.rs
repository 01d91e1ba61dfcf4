//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//! Every section, and every field inside it, may be omitted.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{MAX_SCAN_SECS, MIN_SCAN_SECS};
use crate::error::{LightbarError, Result};
use crate::link::{LinkTiming, ScanMode};
use crate::radio::timing::Poller;
use crate::radio::SpiSettings;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub radio: RadioConfig,
    pub timing: TimingConfig,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
}

/// Transceiver wiring
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RadioConfig {
    #[serde(default)]
    pub spi_bus: u8,

    #[serde(default)]
    pub slave_select: u8,

    #[serde(default = "default_clock_hz")]
    pub clock_hz: u32,

    #[serde(default = "default_ce_pin")]
    pub ce_pin: u8,
}

/// Waits and windows used by the link layer
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_listen_window_ms")]
    pub listen_window_ms: u64,

    #[serde(default = "default_tx_poll_ms")]
    pub tx_poll_ms: u64,

    #[serde(default = "default_ce_pulse_us")]
    pub ce_pulse_us: u64,

    #[serde(default = "default_power_up_ms")]
    pub power_up_ms: u64,

    #[serde(default = "default_probe_settle_ms")]
    pub probe_settle_ms: u64,
}

/// Scan defaults
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScanConfig {
    #[serde(default = "default_scan_duration_s")]
    pub default_duration_s: u64,

    #[serde(default)]
    pub mode: ScanMode,
}

/// Log output
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for a daily rolling log file; stderr only when unset
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

// Default value functions
fn default_clock_hz() -> u32 { 1_000_000 }
fn default_ce_pin() -> u8 { 25 }

fn default_lock_timeout_ms() -> u64 { 5000 }
fn default_listen_window_ms() -> u64 { 20 }
fn default_tx_poll_ms() -> u64 { 2 }
fn default_ce_pulse_us() -> u64 { 100 }
fn default_power_up_ms() -> u64 { 2 }
fn default_probe_settle_ms() -> u64 { 5 }

fn default_scan_duration_s() -> u64 { 10 }

fn default_log_level() -> String { "info".to_string() }

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            slave_select: 0,
            clock_hz: default_clock_hz(),
            ce_pin: default_ce_pin(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            listen_window_ms: default_listen_window_ms(),
            tx_poll_ms: default_tx_poll_ms(),
            ce_pulse_us: default_ce_pulse_us(),
            power_up_ms: default_power_up_ms(),
            probe_settle_ms: default_probe_settle_ms(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_duration_s: default_scan_duration_s(),
            mode: ScanMode::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: None,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn invalid(message: impl std::fmt::Display) -> LightbarError {
    LightbarError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lightbar_bridge::config::Config;
    ///
    /// let config = Config::load("lightbar.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.radio.spi_bus > 6 {
            return Err(invalid("spi_bus must be between 0 and 6"));
        }

        if self.radio.slave_select > 2 {
            return Err(invalid("slave_select must be between 0 and 2"));
        }

        if !(1_000..=10_000_000).contains(&self.radio.clock_hz) {
            return Err(invalid("clock_hz must be between 1000 and 10000000"));
        }

        if self.radio.ce_pin > 53 {
            return Err(invalid("ce_pin must be a BCM GPIO number between 0 and 53"));
        }

        for (name, value, max) in [
            ("lock_timeout_ms", self.timing.lock_timeout_ms, 60_000),
            ("listen_window_ms", self.timing.listen_window_ms, 1_000),
            ("tx_poll_ms", self.timing.tx_poll_ms, 1_000),
            ("ce_pulse_us", self.timing.ce_pulse_us, 10_000),
            ("power_up_ms", self.timing.power_up_ms, 1_000),
            ("probe_settle_ms", self.timing.probe_settle_ms, 1_000),
        ] {
            if value == 0 || value > max {
                return Err(invalid(format!("{} must be between 1 and {}", name, max)));
            }
        }

        if !(MIN_SCAN_SECS..=MAX_SCAN_SECS).contains(&self.scan.default_duration_s) {
            return Err(invalid(format!(
                "default_duration_s must be between {} and {}",
                MIN_SCAN_SECS, MAX_SCAN_SECS
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(invalid(format!("log level must be one of: {}", LOG_LEVELS.join(", "))));
        }

        Ok(())
    }

    pub fn spi_settings(&self) -> SpiSettings {
        SpiSettings {
            bus: self.radio.spi_bus,
            slave_select: self.radio.slave_select,
            clock_hz: self.radio.clock_hz,
            ce_pin: self.radio.ce_pin,
        }
    }

    pub fn link_timing(&self) -> LinkTiming {
        let t = &self.timing;
        LinkTiming {
            lock_timeout: Duration::from_millis(t.lock_timeout_ms),
            listen: Poller::once_after(Duration::from_millis(t.listen_window_ms)),
            tx_status: Poller::once_after(Duration::from_millis(t.tx_poll_ms)),
            ce_pulse: Duration::from_micros(t.ce_pulse_us),
            power_up: Duration::from_millis(t.power_up_ms),
            probe_settle: Duration::from_millis(t.probe_settle_ms),
        }
    }
}
