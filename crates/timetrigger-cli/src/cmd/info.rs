use crate::output::{print_fields, print_json};
use anyhow::Result;
use chrono::{DateTime, Utc};
use timetrigger_core::config::Config;
use timetrigger_core::host::{HostInfo, MacSource};

/// Probe host identity the same way `serve` does and print it.
pub fn run(config: &Config, started_at: DateTime<Utc>, json: bool) -> Result<()> {
    let host = HostInfo::capture(&config.host, started_at)?;

    if json {
        return print_json(&serde_json::json!({
            "started_at": host.started_at,
            "started_at_local": host.started_at_local(),
            "mac": host.mac,
            "mac_source": host.mac_source,
        }));
    }

    let source = match &host.mac_source {
        MacSource::Interface(iface) => format!("interface {iface}"),
        MacSource::Fallback => "fallback".to_string(),
    };
    print_fields(&[
        ("start time", host.started_at_local()),
        ("mac", host.mac.clone()),
        ("source", source),
    ]);
    Ok(())
}
