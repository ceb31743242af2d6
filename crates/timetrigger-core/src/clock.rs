use chrono::Utc;

/// Seconds since the UNIX epoch, UTC.
pub type UtcSeconds = i64;

/// Source of "current UTC time in whole seconds".
///
/// The scheduler never reads the system clock directly so tests can drive it
/// with a manually advanced clock.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_seconds(&self) -> UtcSeconds;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> UtcSeconds {
        Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_matches_chrono() {
        let before = Utc::now().timestamp();
        let now = SystemClock.now_seconds();
        let after = Utc::now().timestamp();
        assert!(before <= now && now <= after);
    }
}
