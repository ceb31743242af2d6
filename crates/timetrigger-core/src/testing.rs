//! Deterministic doubles for the clock, timer and exit action.
//!
//! `SteppingTimer` advances a shared `ManualClock` by exactly the requested
//! duration instead of waiting, so a whole schedule runs in virtual time.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::{Clock, UtcSeconds};
use crate::exit::ExitAction;
use crate::timer::Timer;

/// Settable clock with millisecond resolution; reads truncate to seconds.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(seconds: UtcSeconds) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(seconds * 1000)),
        }
    }

    pub fn set_seconds(&self, seconds: UtcSeconds) {
        self.millis.store(seconds * 1000, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.shift_millis(by.as_millis() as i64);
    }

    /// Move the clock by a signed amount; negative values step it backward.
    pub fn shift_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> UtcSeconds {
        self.now_millis().div_euclid(1000)
    }
}

/// Timer that moves a `ManualClock` forward instead of sleeping.
#[derive(Debug, Clone)]
pub struct SteppingTimer {
    clock: ManualClock,
    overshoot: Duration,
    shifts: Arc<Mutex<VecDeque<i64>>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl SteppingTimer {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            overshoot: Duration::ZERO,
            shifts: Arc::default(),
            sleeps: Arc::default(),
        }
    }

    /// Wake this much late from every sleep of a second or more.
    pub fn with_overshoot(mut self, overshoot: Duration) -> Self {
        self.overshoot = overshoot;
        self
    }

    /// Extra signed clock movement (ms) applied after each sleep, in order.
    /// Sleeps past the end of the list get no extra movement.
    pub fn with_clock_shifts(self, shifts_ms: impl IntoIterator<Item = i64>) -> Self {
        *self.shifts.lock().unwrap_or_else(|e| e.into_inner()) = shifts_ms.into_iter().collect();
        self
    }

    /// Every duration requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Timer for SteppingTimer {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        let extra = if duration >= Duration::from_secs(1) {
            self.overshoot
        } else {
            Duration::ZERO
        };
        let shift = self
            .shifts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(0);
        let clock = self.clock.clone();
        Box::pin(async move {
            clock.advance(duration + extra);
            clock.shift_millis(shift);
            tokio::task::yield_now().await;
        })
    }
}

/// Exit action that records `(target, clock reading)` instead of exiting.
#[derive(Debug, Clone)]
pub struct RecordingExit {
    clock: ManualClock,
    firings: Arc<Mutex<Vec<(UtcSeconds, UtcSeconds)>>>,
}

impl RecordingExit {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            firings: Arc::default(),
        }
    }

    pub fn firings(&self) -> Vec<(UtcSeconds, UtcSeconds)> {
        self.firings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.firings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl ExitAction for RecordingExit {
    fn fire(&self, target: UtcSeconds) {
        let observed = self.clock.now_seconds();
        self.firings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((target, observed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_truncates_to_seconds() {
        let clock = ManualClock::at(100);
        clock.advance(Duration::from_millis(999));
        assert_eq!(clock.now_seconds(), 100);
        clock.advance(Duration::from_millis(1));
        assert_eq!(clock.now_seconds(), 101);
        clock.set_seconds(5);
        assert_eq!(clock.now_millis(), 5000);
    }

    #[tokio::test]
    async fn stepping_timer_advances_clock() {
        let clock = ManualClock::at(0);
        let timer = SteppingTimer::new(clock.clone()).with_overshoot(Duration::from_secs(2));
        timer.sleep(Duration::from_millis(100)).await;
        timer.sleep(Duration::from_secs(10)).await;
        assert_eq!(clock.now_millis(), 12_100);
        assert_eq!(
            timer.sleeps(),
            vec![Duration::from_millis(100), Duration::from_secs(10)]
        );
    }

    #[tokio::test]
    async fn stepping_timer_applies_clock_shifts_in_order() {
        let clock = ManualClock::at(10);
        let timer = SteppingTimer::new(clock.clone()).with_clock_shifts([-5_000, 0]);
        timer.sleep(Duration::from_secs(1)).await;
        assert_eq!(clock.now_seconds(), 6);
        timer.sleep(Duration::from_secs(1)).await;
        timer.sleep(Duration::from_secs(1)).await;
        assert_eq!(clock.now_seconds(), 8);
    }
}
