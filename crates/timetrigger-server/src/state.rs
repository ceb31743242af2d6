use chrono::{DateTime, Utc};
use std::sync::Arc;
use timetrigger_core::config::Config;
use timetrigger_core::host::HostInfo;
use timetrigger_core::{Clock, ProcessExit, SystemClock, TokioTimer, TriggerScheduler};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: TriggerScheduler,
    pub clock: Arc<dyn Clock>,
    pub host: Arc<HostInfo>,
}

impl AppState {
    pub fn new(scheduler: TriggerScheduler, clock: Arc<dyn Clock>, host: HostInfo) -> Self {
        Self {
            scheduler,
            clock,
            host: Arc::new(host),
        }
    }

    /// Production wiring: system clock, tokio timers, real process exit.
    /// `started_at` is the process start time; the host MAC is probed here.
    pub fn from_config(
        config: &Config,
        started_at: DateTime<Utc>,
    ) -> timetrigger_core::Result<Self> {
        let host = HostInfo::capture(&config.host, started_at)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let scheduler = TriggerScheduler::new(
            Arc::clone(&clock),
            Arc::new(TokioTimer),
            Arc::new(ProcessExit::new(config.exit.code)),
            config.scheduler.clone(),
        );
        Ok(Self::new(scheduler, clock, host))
    }
}
