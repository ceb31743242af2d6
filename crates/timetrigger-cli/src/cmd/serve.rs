use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use timetrigger_core::config::{Config, WarnLevel};
use timetrigger_server::AppState;
use tracing::{info, warn};

pub fn run(config: Config, started_at: DateTime<Utc>) -> Result<()> {
    let mut errors = Vec::new();
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => warn!("config: {}", w.message),
            WarnLevel::Error => errors.push(w.message),
        }
    }
    if !errors.is_empty() {
        return Err(anyhow!("invalid config:\n  {}", errors.join("\n  ")));
    }

    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        let addr = format!("{}:{}", config.server.bind, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let actual_port = listener.local_addr()?.port();

        let state = AppState::from_config(&config, started_at)?;
        info!(
            port = actual_port,
            started_at = %state.host.started_at_local(),
            mac = %state.host.mac,
            "service started"
        );

        tokio::select! {
            res = timetrigger_server::serve_on(state, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                Ok(())
            }
        }
    })
}
