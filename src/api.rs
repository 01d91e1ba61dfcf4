//! # Boundary Types
//!
//! JSON request/response bodies exchanged with whatever front end drives the
//! bridge (the bundled CLI prints them on stdout).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LightbarError, Result};
use crate::link::{ProbeReport, ScanMode, ScanResult, TransmitReport};
use crate::xiaomi::command::{kinds_in_mask, CommandKind};
use crate::xiaomi::protocol::{format_remote_id, MAX_REMOTE_ID};

pub const MIN_SCAN_SECS: u64 = 1;
pub const MAX_SCAN_SECS: u64 = 60;
pub const DEFAULT_SCAN_SECS: u64 = 10;

/// Clamp a requested scan length to the supported window
pub fn clamp_scan_secs(secs: u64) -> u64 {
    secs.clamp(MIN_SCAN_SECS, MAX_SCAN_SECS)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub duration_s: Option<u64>,
    #[serde(default)]
    pub mode: Option<ScanMode>,
}

impl ScanRequest {
    /// Requested duration, or `default_s`, clamped to 1..=60 s
    pub fn effective_duration(&self, default_s: u64) -> Duration {
        Duration::from_secs(clamp_scan_secs(self.duration_s.unwrap_or(default_s)))
    }

    pub fn effective_mode(&self, default_mode: ScanMode) -> ScanMode {
        self.mode.unwrap_or(default_mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResponse {
    pub found: bool,
    pub remote_id: Option<String>,
    /// Only present for coverage scans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<CommandKind>>,
}

impl From<&ScanResult> for ScanResponse {
    fn from(result: &ScanResult) -> Self {
        Self {
            found: result.id_found,
            remote_id: result.id_found.then(|| format_remote_id(result.remote_id)),
            commands: (result.mode == ScanMode::CommandCoverage).then(|| kinds_in_mask(result.commands_mask)),
        }
    }
}

/// Remote identity as sent by a client: a JSON number or a hex string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RemoteIdInput {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransmitRequest {
    pub remote_id: RemoteIdInput,
}

impl TransmitRequest {
    pub fn remote_id(&self) -> Result<u32> {
        match &self.remote_id {
            RemoteIdInput::Number(n) => check_remote_id(*n),
            RemoteIdInput::Text(s) => parse_remote_id(s),
        }
    }
}

/// Parse a hex remote identity, with or without a `0x` prefix
///
/// ```
/// use lightbar_bridge::api::parse_remote_id;
///
/// assert_eq!(parse_remote_id("0x701634").unwrap(), 0x701634);
/// assert_eq!(parse_remote_id("701634").unwrap(), 0x701634);
/// assert!(parse_remote_id("0x1000000").is_err());
/// ```
pub fn parse_remote_id(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let value = u64::from_str_radix(digits, 16)
        .map_err(|e| LightbarError::InvalidArgument(format!("Invalid remote ID '{}': {}", text, e)))?;
    check_remote_id(value)
}

fn check_remote_id(value: u64) -> Result<u32> {
    if value > u64::from(MAX_REMOTE_ID) {
        return Err(LightbarError::InvalidArgument(format!(
            "Remote ID 0x{:X} exceeds 24 bits",
            value
        )));
    }
    Ok(value as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransmitResponse {
    pub success: bool,
    pub sent: u32,
    pub attempts: u32,
}

impl From<&TransmitReport> for TransmitResponse {
    fn from(report: &TransmitReport) -> Self {
        Self {
            success: report.is_sent(),
            sent: report.sent,
            attempts: report.attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResponse {
    pub success: bool,
    pub status: String,
    pub config: String,
    pub verified_by_write: bool,
}

impl From<&ProbeReport> for ProbeResponse {
    fn from(report: &ProbeReport) -> Self {
        Self {
            success: true,
            status: format!("0x{:02X}", report.status_nop),
            config: format!("0x{:02X}", report.config),
            verified_by_write: report.verified_by_write,
        }
    }
}

/// View of the last published scan result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub found_count: u32,
    pub id_found: bool,
    pub remote_id: Option<String>,
    pub commands_mask: u8,
    pub commands: Vec<CommandKind>,
    pub last_sequence: Option<u8>,
    pub mode: ScanMode,
    pub started_at: Option<DateTime<Utc>>,
}

impl From<&ScanResult> for StatusResponse {
    fn from(result: &ScanResult) -> Self {
        Self {
            found_count: result.found_count,
            id_found: result.id_found,
            remote_id: result.id_found.then(|| format_remote_id(result.remote_id)),
            commands_mask: result.commands_mask,
            commands: kinds_in_mask(result.commands_mask),
            last_sequence: result.last_sequence,
            mode: result.mode,
            started_at: result.started_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

impl From<&LightbarError> for ApiError {
    fn from(err: &LightbarError) -> Self {
        Self::new(err.to_string())
    }
}
