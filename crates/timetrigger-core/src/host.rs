use chrono::{DateTime, FixedOffset, Utc};
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::HostConfig;
use crate::error::{Result, TriggerError};

/// Reported when neither an interface nor a configured fallback is available.
pub const ZERO_MAC: &str = "00:00:00:00:00:00";

/// Interfaces tried first, in this order, when several physical NICs exist.
const PRIORITY: [&str; 3] = ["eth0", "enp0s1", "enp3s0"];

static PHYSICAL_RE: OnceLock<Regex> = OnceLock::new();
static VIRTUAL_RE: OnceLock<Regex> = OnceLock::new();
static MAC_RE: OnceLock<Regex> = OnceLock::new();

fn physical_re() -> &'static Regex {
    PHYSICAL_RE.get_or_init(|| Regex::new(r"^(en|eth|wl)").unwrap())
}

fn virtual_re() -> &'static Regex {
    VIRTUAL_RE.get_or_init(|| Regex::new(r"^(lo|docker|veth|br-|virbr)").unwrap())
}

pub fn is_mac(s: &str) -> bool {
    MAC_RE
        .get_or_init(|| Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").unwrap())
        .is_match(s.trim())
}

// ---------------------------------------------------------------------------
// HostInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "iface", rename_all = "snake_case")]
pub enum MacSource {
    Interface(String),
    Fallback,
}

/// Host identity captured once at process start.
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub started_at: DateTime<Utc>,
    pub display_offset: FixedOffset,
    pub mac: String,
    pub mac_source: MacSource,
}

impl HostInfo {
    /// Keep the given process start time and probe the MAC address.
    pub fn capture(config: &HostConfig, started_at: DateTime<Utc>) -> Result<Self> {
        let display_offset = config.offset()?;
        let (mac, mac_source) = discover_mac(config);
        Ok(Self {
            started_at,
            display_offset,
            mac,
            mac_source,
        })
    }

    /// Start time in the display offset, e.g. `2024/1/5 14:03:07`.
    pub fn started_at_local(&self) -> String {
        self.started_at
            .with_timezone(&self.display_offset)
            .format("%Y/%-m/%-d %H:%M:%S")
            .to_string()
    }

    /// Body of `GET /info`.
    pub fn info_text(&self) -> String {
        format!("Start time: {}\nMAC: {}", self.started_at_local(), self.mac)
    }
}

// ---------------------------------------------------------------------------
// MAC discovery
// ---------------------------------------------------------------------------

/// Resolve the host MAC. Never returns an empty string.
pub fn discover_mac(config: &HostConfig) -> (String, MacSource) {
    let probed = match config.iface.as_deref().map(str::trim) {
        Some(iface) if !iface.is_empty() => {
            read_mac(&config.sysfs_root, iface).map(|mac| (iface.to_string(), mac))
        }
        _ => probe_interface(&config.sysfs_root, &config.route_file),
    };

    match probed {
        Ok((iface, mac)) => {
            debug!(iface = %iface, mac = %mac, "host MAC discovered");
            (mac, MacSource::Interface(iface))
        }
        Err(e) => {
            let mac = config
                .fallback_mac
                .as_deref()
                .map(|m| m.trim().to_uppercase())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| ZERO_MAC.to_string());
            warn!(error = %e, mac = %mac, "MAC discovery failed, using fallback");
            (mac, MacSource::Fallback)
        }
    }
}

/// Read `<sysfs_root>/<iface>/address`, trimmed and upper-cased.
pub fn read_mac(sysfs_root: &Path, iface: &str) -> Result<String> {
    let raw = std::fs::read_to_string(sysfs_root.join(iface).join("address"))?;
    let mac = raw.trim().to_uppercase();
    if mac.is_empty() {
        return Err(TriggerError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("empty address for {iface}"),
        )));
    }
    Ok(mac)
}

fn probe_interface(sysfs_root: &Path, route_file: &Path) -> Result<(String, String)> {
    let candidates = physical_interfaces(sysfs_root)?;

    if let Some(iface) = default_route_iface(route_file) {
        if candidates.contains(&iface) {
            if let Ok(mac) = read_mac(sysfs_root, &iface) {
                return Ok((iface, mac));
            }
        }
    }

    candidates
        .into_iter()
        .find_map(|iface| read_mac(sysfs_root, &iface).ok().map(|mac| (iface, mac)))
        .ok_or(TriggerError::NoInterface)
}

/// Physical NICs under `sysfs_root`, priority interfaces first, rest by name.
fn physical_interfaces(sysfs_root: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(sysfs_root)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !virtual_re().is_match(name) && physical_re().is_match(name))
        .filter(|name| sysfs_root.join(name).join("device").exists())
        .collect();

    names.sort_by_key(|name| {
        let rank = PRIORITY
            .iter()
            .position(|p| p == name)
            .unwrap_or(PRIORITY.len());
        (rank, name.clone())
    });
    Ok(names)
}

/// Interface carrying the default route (destination `00000000`), if any.
fn default_route_iface(route_file: &Path) -> Option<String> {
    let content = std::fs::read_to_string(route_file).ok()?;
    content.lines().skip(1).find_map(|line| {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        (fields.next()? == "00000000").then(|| iface.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn add_iface(root: &Path, name: &str, mac: &str, physical: bool) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("address"), format!("{mac}\n")).unwrap();
        if physical {
            std::fs::create_dir_all(dir.join("device")).unwrap();
        }
    }

    fn host_config(dir: &TempDir) -> HostConfig {
        HostConfig {
            sysfs_root: dir.path().join("net"),
            route_file: dir.path().join("route"),
            ..HostConfig::default()
        }
    }

    fn write_route(dir: &TempDir, default_iface: &str) {
        let content = format!(
            "Iface\tDestination\tGateway\tFlags\n\
             {default_iface}\t00000000\t0101A8C0\t0003\n\
             eth9\t0001A8C0\t00000000\t0001\n"
        );
        std::fs::write(dir.path().join("route"), content).unwrap();
    }

    #[test]
    fn prefers_default_route_interface() {
        let dir = TempDir::new().unwrap();
        let config = host_config(&dir);
        add_iface(&config.sysfs_root, "eth0", "aa:aa:aa:aa:aa:aa", true);
        add_iface(&config.sysfs_root, "enp5s0", "bb:bb:bb:bb:bb:bb", true);
        write_route(&dir, "enp5s0");

        let (mac, source) = discover_mac(&config);
        assert_eq!(mac, "BB:BB:BB:BB:BB:BB");
        assert_eq!(source, MacSource::Interface("enp5s0".into()));
    }

    #[test]
    fn falls_back_to_priority_order() {
        let dir = TempDir::new().unwrap();
        let config = host_config(&dir);
        add_iface(&config.sysfs_root, "enp3s0", "33:33:33:33:33:33", true);
        add_iface(&config.sysfs_root, "eth0", "00:11:22:33:44:55", true);
        add_iface(&config.sysfs_root, "wlan0", "cc:cc:cc:cc:cc:cc", true);

        let (mac, source) = discover_mac(&config);
        assert_eq!(mac, "00:11:22:33:44:55");
        assert_eq!(source, MacSource::Interface("eth0".into()));
    }

    #[test]
    fn skips_virtual_and_deviceless_interfaces() {
        let dir = TempDir::new().unwrap();
        let config = host_config(&dir);
        add_iface(&config.sysfs_root, "lo", "00:00:00:00:00:00", true);
        add_iface(&config.sysfs_root, "docker0", "02:42:ac:11:00:02", true);
        add_iface(&config.sysfs_root, "veth1234", "de:ad:be:ef:00:01", true);
        add_iface(&config.sysfs_root, "eth1", "11:11:11:11:11:11", false);
        add_iface(&config.sysfs_root, "wlp2s0", "ab:cd:ef:01:23:45", true);

        let (mac, _) = discover_mac(&config);
        assert_eq!(mac, "AB:CD:EF:01:23:45");
    }

    #[test]
    fn explicit_iface_override_wins() {
        let dir = TempDir::new().unwrap();
        let mut config = host_config(&dir);
        add_iface(&config.sysfs_root, "eth0", "aa:aa:aa:aa:aa:aa", true);
        add_iface(&config.sysfs_root, "bond0", "0a:0b:0c:0d:0e:0f", false);
        config.iface = Some("bond0".into());

        let (mac, source) = discover_mac(&config);
        assert_eq!(mac, "0A:0B:0C:0D:0E:0F");
        assert_eq!(source, MacSource::Interface("bond0".into()));
    }

    #[test]
    fn uses_configured_fallback_when_nothing_readable() {
        let dir = TempDir::new().unwrap();
        let mut config = host_config(&dir);
        config.fallback_mac = Some("de:ad:be:ef:ca:fe".into());

        let (mac, source) = discover_mac(&config);
        assert_eq!(mac, "DE:AD:BE:EF:CA:FE");
        assert_eq!(source, MacSource::Fallback);
    }

    #[test]
    fn zero_mac_when_no_fallback() {
        let config = HostConfig {
            sysfs_root: PathBuf::from("/definitely/not/here"),
            fallback_mac: Some("   ".into()),
            ..HostConfig::default()
        };
        let (mac, source) = discover_mac(&config);
        assert_eq!(mac, ZERO_MAC);
        assert_eq!(source, MacSource::Fallback);
    }

    #[test]
    fn empty_address_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let config = host_config(&dir);
        add_iface(&config.sysfs_root, "eth0", "", true);
        add_iface(&config.sysfs_root, "eth1", "12:34:56:78:9a:bc", true);

        let (mac, _) = discover_mac(&config);
        assert_eq!(mac, "12:34:56:78:9A:BC");
    }

    #[test]
    fn info_text_renders_start_time_in_offset() {
        let info = HostInfo {
            started_at: Utc.with_ymd_and_hms(2024, 1, 5, 6, 3, 7).unwrap(),
            display_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
            mac: "00:11:22:33:44:55".into(),
            mac_source: MacSource::Fallback,
        };
        assert_eq!(info.started_at_local(), "2024/1/5 14:03:07");
        assert_eq!(
            info.info_text(),
            "Start time: 2024/1/5 14:03:07\nMAC: 00:11:22:33:44:55"
        );
    }

    #[test]
    fn capture_keeps_the_given_start_time() {
        let dir = TempDir::new().unwrap();
        let mut config = host_config(&dir);
        config.fallback_mac = Some("02:00:00:00:00:09".into());
        let started_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let info = HostInfo::capture(&config, started_at).unwrap();
        assert_eq!(info.started_at, started_at);
        assert_eq!(info.started_at_local(), "2024/3/1 08:00:00");
        assert_eq!(info.mac, "02:00:00:00:00:09");
    }

    #[test]
    fn mac_format_check() {
        assert!(is_mac("00:11:22:aa:BB:cc"));
        assert!(!is_mac("00-11-22-33-44-55"));
        assert!(!is_mac("not a mac"));
    }
}
