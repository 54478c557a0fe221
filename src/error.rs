//! Error types
//!
//! Only setup can fail hard. Everything that goes wrong during a tick is
//! recovered in place, and leaderboard failures never void a finish.

use thiserror::Error;

/// Fatal problems found while building a race. The simulation does not start.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("course has no start/finish line")]
    MissingStartLine,

    #[error("course has no rounding marks")]
    NoRoundingMarks,

    #[error("course mark {0} is declared more than once")]
    DuplicateMark(u8),

    #[error("invalid course frame {width}x{height} (step {step})")]
    InvalidFrame { width: f32, height: f32, step: f32 },

    #[error("invalid polar table: {0}")]
    InvalidPolar(String),

    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("failed to read settings from {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings")]
    Parse(#[from] serde_json::Error),
}

/// A control value that could not be read. Recovered by the reader, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("unparseable {control} value {raw:?}")]
    Malformed { control: &'static str, raw: String },
}

/// Failures reported by the external results store
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("results store unavailable: {0}")]
    Unavailable(String),

    #[error("results store rejected the record: {0}")]
    Rejected(String),
}
