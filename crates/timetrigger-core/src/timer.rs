use futures::future::BoxFuture;
use std::time::Duration;

/// Async sleep capability used by the scheduler's timer chain.
///
/// One-shot waits are a single `sleep`; the fine poll is a loop over `sleep`;
/// cancellation is handled by aborting the task that awaits it.
pub trait Timer: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Real timer backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_sleeps_for_requested_duration() {
        let start = tokio::time::Instant::now();
        TokioTimer.sleep(Duration::from_secs(42)).await;
        assert!(start.elapsed() >= Duration::from_secs(42));
    }
}
