use thiserror::Error;

use crate::clock::UtcSeconds;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("timestamp must be a future UTC second (current {current}, got {raw})")]
    InvalidTimestamp {
        current: UtcSeconds,
        /// Parsed target when the input was numeric.
        target: Option<UtcSeconds>,
        raw: String,
    },

    #[error("missed trigger window for {target}: clock reached {observed}")]
    MissedWindow {
        target: UtcSeconds,
        observed: UtcSeconds,
    },

    #[error("no physical network interface found")]
    NoInterface,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, TriggerError>;
