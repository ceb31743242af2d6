use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use timetrigger_core::config::Config;

/// Overrides applied on top of the config file (or defaults).
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// YAML config file
    #[arg(long, global = true, env = "TIMETRIGGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, global = true, env = "BIND")]
    pub bind: Option<String>,

    /// Port to listen on (0 = OS-assigned)
    #[arg(long, global = true, env = "PORT")]
    pub port: Option<u16>,

    /// Process exit status used when the trigger fires
    #[arg(long, global = true, env = "EXIT_CODE", allow_negative_numbers = true)]
    pub exit_code: Option<i32>,

    /// Network interface to read the host MAC from
    #[arg(long, global = true, env = "HOST_IFACE")]
    pub host_iface: Option<String>,

    /// MAC reported when no interface can be read
    #[arg(long, global = true, env = "HOST_MAC")]
    pub host_mac: Option<String>,

    /// UTC offset for displaying the start time, e.g. +08:00
    #[arg(long, global = true, env = "DISPLAY_OFFSET")]
    pub display_offset: Option<String>,
}

impl Overrides {
    /// Load the config file if given, then apply flag/env overrides.
    pub fn resolve(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(code) = self.exit_code {
            config.exit.code = code;
        }
        if let Some(iface) = non_empty(&self.host_iface) {
            config.host.iface = Some(iface);
        }
        if let Some(mac) = non_empty(&self.host_mac) {
            config.host.fallback_mac = Some(mac);
        }
        if let Some(offset) = non_empty(&self.display_offset) {
            config.host.display_offset = offset;
        }
        Ok(config)
    }
}

// Container envs often carry `HOST_MAC=` with no value.
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
