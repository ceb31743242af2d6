pub mod clock;
pub mod config;
pub mod error;
pub mod exit;
pub mod host;
pub mod scheduler;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod timer;

pub use clock::{Clock, SystemClock, UtcSeconds};
pub use error::{Result, TriggerError};
pub use exit::{ExitAction, ProcessExit};
pub use scheduler::{AbortReason, AbortRecord, Phase, ScheduleStatus, TriggerScheduler};
pub use timer::{Timer, TokioTimer};
