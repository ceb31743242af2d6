use crate::error::{Result, TriggerError};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitConfig {
    /// Status the process exits with when the trigger fires.
    #[serde(default = "default_exit_code")]
    pub code: i32,
}

fn default_exit_code() -> i32 {
    1
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            code: default_exit_code(),
        }
    }
}

// ---------------------------------------------------------------------------
// HostConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Read the MAC from this interface instead of probing.
    #[serde(default)]
    pub iface: Option<String>,
    /// Reported when no interface can be read.
    #[serde(default)]
    pub fallback_mac: Option<String>,
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    #[serde(default = "default_route_file")]
    pub route_file: PathBuf,
    /// UTC offset used to render the start time, e.g. `+08:00`.
    #[serde(default = "default_display_offset")]
    pub display_offset: String,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/class/net")
}

fn default_route_file() -> PathBuf {
    PathBuf::from("/proc/net/route")
}

fn default_display_offset() -> String {
    "+08:00".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            iface: None,
            fallback_mac: None,
            sysfs_root: default_sysfs_root(),
            route_file: default_route_file(),
            display_offset: default_display_offset(),
        }
    }
}

impl HostConfig {
    /// Parse `display_offset`: `Z`, `UTC`, `+HH`, `+HHMM` or `+HH:MM`.
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.display_offset).ok_or_else(|| {
            TriggerError::InvalidConfig(format!(
                "display_offset '{}': expected Z or +HH:MM",
                self.display_offset
            ))
        })
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

/// Thresholds of the two-phase wait. All values in seconds unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Above this many seconds out, take one long coarse sleep.
    #[serde(default = "default_coarse_threshold")]
    pub coarse_threshold_secs: i64,
    /// Seconds left before the target when the coarse sleep ends.
    #[serde(default = "default_coarse_lead")]
    pub coarse_lead_secs: i64,
    /// Above this many seconds out, sleep until just before the target.
    #[serde(default = "default_fine_threshold")]
    pub fine_threshold_secs: i64,
    /// Seconds left before the target when fine polling starts.
    #[serde(default = "default_fine_lead")]
    pub fine_lead_secs: i64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Polling gives up once the clock is this far past the target.
    #[serde(default = "default_miss_tolerance")]
    pub miss_tolerance_secs: i64,
}

fn default_coarse_threshold() -> i64 {
    600
}

fn default_coarse_lead() -> i64 {
    300
}

fn default_fine_threshold() -> i64 {
    5
}

fn default_fine_lead() -> i64 {
    2
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_miss_tolerance() -> i64 {
    2
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            coarse_threshold_secs: default_coarse_threshold(),
            coarse_lead_secs: default_coarse_lead(),
            fine_threshold_secs: default_fine_threshold(),
            fine_lead_secs: default_fine_lead(),
            poll_interval_ms: default_poll_interval_ms(),
            miss_tolerance_secs: default_miss_tolerance(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub exit: ExitConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        // An empty file is a valid "all defaults" config.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let s = &self.scheduler;

        if s.poll_interval_ms == 0 {
            warnings.push(error("scheduler.poll_interval_ms must be greater than 0"));
        } else if s.poll_interval_ms >= 1000 {
            warnings.push(warning(format!(
                "scheduler.poll_interval_ms = {} can step over the target second",
                s.poll_interval_ms
            )));
        }

        if s.coarse_lead_secs < 0 || s.coarse_lead_secs >= s.coarse_threshold_secs {
            warnings.push(error(format!(
                "scheduler.coarse_lead_secs ({}) must be in 0..coarse_threshold_secs ({})",
                s.coarse_lead_secs, s.coarse_threshold_secs
            )));
        }

        if s.fine_lead_secs < 0 || s.fine_lead_secs > s.fine_threshold_secs {
            warnings.push(error(format!(
                "scheduler.fine_lead_secs ({}) must be in 0..=fine_threshold_secs ({})",
                s.fine_lead_secs, s.fine_threshold_secs
            )));
        }

        if s.fine_threshold_secs >= s.coarse_threshold_secs {
            warnings.push(error(
                "scheduler.fine_threshold_secs must be below coarse_threshold_secs",
            ));
        }

        if s.miss_tolerance_secs < 0 {
            warnings.push(error("scheduler.miss_tolerance_secs must not be negative"));
        }

        if self.exit.code == 0 {
            warnings.push(warning(
                "exit.code = 0 will not trigger an on-failure restart policy",
            ));
        }

        if let Err(e) = self.host.offset() {
            warnings.push(error(e.to_string()));
        }

        if let Some(mac) = &self.host.fallback_mac {
            if !crate::host::is_mac(mac) {
                warnings.push(warning(format!(
                    "host.fallback_mac '{mac}' does not look like a MAC address"
                )));
            }
        }

        warnings
    }
}

fn warning(message: impl Into<String>) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Warning,
        message: message.into(),
    }
}

fn error(message: impl Into<String>) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Error,
        message: message.into(),
    }
}
