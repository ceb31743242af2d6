use tracing::info;

use crate::clock::UtcSeconds;

/// Effect invoked once when a scheduled target second is reached.
pub trait ExitAction: Send + Sync + std::fmt::Debug {
    fn fire(&self, target: UtcSeconds);
}

/// Terminates the process so the container supervisor restarts it.
#[derive(Debug, Clone, Copy)]
pub struct ProcessExit {
    pub code: i32,
}

impl ProcessExit {
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

impl Default for ProcessExit {
    fn default() -> Self {
        Self { code: 1 }
    }
}

impl ExitAction for ProcessExit {
    fn fire(&self, target: UtcSeconds) {
        let at = chrono::DateTime::from_timestamp(target, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| target.to_string());
        info!(target_seconds = target, at = %at, code = self.code, "trigger reached, exiting");
        std::process::exit(self.code);
    }
}
