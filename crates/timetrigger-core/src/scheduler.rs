//! Single-target exit scheduler.
//!
//! A schedule waits in two phases: one long coarse sleep while the target is
//! far away, a sleep that ends a couple of seconds before the target, then a
//! short-interval poll of the clock until it reads exactly the target second.
//! Exactly one timer chain is live at a time; every chain carries the
//! generation it was started with and only acts while that generation is
//! current.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, UtcSeconds};
use crate::config::SchedulerConfig;
use crate::error::TriggerError;
use crate::exit::ExitAction;
use crate::timer::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    CoarseWait,
    FineWait,
    Fired,
    Aborted,
}

impl Phase {
    /// A timer chain is live in this phase.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::CoarseWait | Phase::FineWait)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Fired | Phase::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    Superseded,
    Cancelled,
    MissedWindow,
}

/// How the most recently aborted schedule ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AbortRecord {
    pub target: UtcSeconds,
    pub generation: u64,
    pub reason: AbortReason,
}

/// Snapshot of the scheduler's single schedule.
///
/// A superseded schedule never owns the snapshot again once its replacement is
/// installed, so its `Aborted { Superseded }` outcome is carried in
/// `last_abort` alongside the new schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleStatus {
    pub phase: Phase,
    pub target: Option<UtcSeconds>,
    pub generation: u64,
    pub reason: Option<AbortReason>,
    pub last_abort: Option<AbortRecord>,
}

impl ScheduleStatus {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            target: None,
            generation: 0,
            reason: None,
            last_abort: None,
        }
    }
}

struct Chain {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

struct Shared {
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    exit: Arc<dyn ExitAction>,
    config: SchedulerConfig,
    chain: Mutex<Chain>,
    status: watch::Sender<ScheduleStatus>,
}

/// Cloneable handle to the scheduler. All clones share one schedule.
#[derive(Clone)]
pub struct TriggerScheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for TriggerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerScheduler")
            .field("status", &self.status())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl TriggerScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
        exit: Arc<dyn ExitAction>,
        config: SchedulerConfig,
    ) -> Self {
        let (status, _) = watch::channel(ScheduleStatus::idle());
        Self {
            shared: Arc::new(Shared {
                clock,
                timer,
                exit,
                config,
                chain: Mutex::new(Chain {
                    generation: 0,
                    handle: None,
                }),
                status,
            }),
        }
    }

    /// Start waiting for `target`, replacing any active schedule.
    ///
    /// Returns immediately with the generation of the new chain. Must be called
    /// from within a Tokio runtime.
    pub fn schedule(&self, target: UtcSeconds) -> u64 {
        let shared = &self.shared;
        let mut chain = shared.lock_chain();

        if let Some(handle) = chain.handle.take() {
            handle.abort();
        }
        let previous = shared.status.borrow().clone();
        let mut last_abort = previous.last_abort;
        if let (true, Some(old_target)) = (previous.phase.is_active(), previous.target) {
            info!(
                old_target,
                new_target = target,
                generation = previous.generation,
                "superseding active schedule"
            );
            last_abort = Some(AbortRecord {
                target: old_target,
                generation: previous.generation,
                reason: AbortReason::Superseded,
            });
        }

        chain.generation += 1;
        let generation = chain.generation;

        let remaining = target - shared.clock.now_seconds();
        let phase = if remaining > shared.config.fine_threshold_secs {
            Phase::CoarseWait
        } else {
            Phase::FineWait
        };
        shared.status.send_replace(ScheduleStatus {
            phase,
            target: Some(target),
            generation,
            reason: None,
            last_abort,
        });

        chain.handle = Some(tokio::spawn(run_chain(
            Arc::clone(&self.shared),
            generation,
            target,
        )));

        info!(target_seconds = target, remaining, generation, "trigger scheduled");
        generation
    }

    /// Stop the active schedule. Returns `false` when nothing was pending.
    pub fn cancel(&self) -> bool {
        let shared = &self.shared;
        let mut chain = shared.lock_chain();

        if let Some(handle) = chain.handle.take() {
            handle.abort();
        }
        let current = shared.status.borrow().clone();
        if !current.phase.is_active() {
            return false;
        }

        chain.generation += 1;
        shared.status.send_replace(ScheduleStatus {
            phase: Phase::Aborted,
            target: current.target,
            generation: chain.generation,
            reason: Some(AbortReason::Cancelled),
            last_abort: current.target.map(|target| AbortRecord {
                target,
                generation: current.generation,
                reason: AbortReason::Cancelled,
            }),
        });
        info!(target_seconds = ?current.target, "schedule cancelled");
        true
    }

    pub fn status(&self) -> ScheduleStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScheduleStatus> {
        self.shared.status.subscribe()
    }
}

impl Shared {
    fn lock_chain(&self) -> MutexGuard<'_, Chain> {
        self.chain.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish `phase` if `generation` is still current.
    fn transition(&self, generation: u64, phase: Phase) -> bool {
        let chain = self.lock_chain();
        if chain.generation != generation {
            return false;
        }
        self.status.send_if_modified(|s| {
            if s.phase == phase {
                return false;
            }
            s.phase = phase;
            true
        });
        debug!(generation, ?phase, "schedule phase");
        true
    }

    /// Mark the chain finished. Returns `false` if it was superseded meanwhile.
    fn finish(
        &self,
        generation: u64,
        target: UtcSeconds,
        phase: Phase,
        reason: Option<AbortReason>,
    ) -> bool {
        let mut chain = self.lock_chain();
        if chain.generation != generation {
            return false;
        }
        chain.handle = None;
        self.status.send_modify(|s| {
            s.phase = phase;
            s.reason = reason;
            if let Some(reason) = reason {
                s.last_abort = Some(AbortRecord {
                    target,
                    generation,
                    reason,
                });
            }
        });
        true
    }

    fn fire(&self, generation: u64, target: UtcSeconds) {
        if self.finish(generation, target, Phase::Fired, None) {
            info!(target_seconds = target, generation, "trigger fired");
            self.exit.fire(target);
        }
    }

    fn miss(&self, generation: u64, target: UtcSeconds, observed: UtcSeconds) {
        if self.finish(
            generation,
            target,
            Phase::Aborted,
            Some(AbortReason::MissedWindow),
        ) {
            let err = TriggerError::MissedWindow { target, observed };
            warn!(error = %err, generation, "schedule aborted");
        }
    }
}

async fn run_chain(shared: Arc<Shared>, generation: u64, target: UtcSeconds) {
    let config = shared.config.clone();
    let mut remaining = target - shared.clock.now_seconds();

    if remaining <= 0 {
        shared.fire(generation, target);
        return;
    }

    while remaining > config.coarse_threshold_secs {
        if !shared.transition(generation, Phase::CoarseWait) {
            return;
        }
        let secs = remaining - config.coarse_lead_secs;
        debug!(generation, secs, "coarse sleep");
        shared.timer.sleep(whole_seconds(secs)).await;
        remaining = target - shared.clock.now_seconds();
    }

    if remaining > config.fine_threshold_secs {
        if !shared.transition(generation, Phase::CoarseWait) {
            return;
        }
        let secs = remaining - config.fine_lead_secs;
        debug!(generation, secs, "approach sleep");
        shared.timer.sleep(whole_seconds(secs)).await;
    }

    if !shared.transition(generation, Phase::FineWait) {
        return;
    }
    let interval = config.poll_interval();
    loop {
        let now = shared.clock.now_seconds();
        if now == target {
            shared.fire(generation, target);
            return;
        }
        if now > target + config.miss_tolerance_secs {
            shared.miss(generation, target, now);
            return;
        }
        shared.timer.sleep(interval).await;
    }
}

fn whole_seconds(secs: i64) -> Duration {
    Duration::from_secs(secs.max(0) as u64)
}
