//! Contract violations raised by the statistics engine.
//!
//! "Not enough data" and "DNF" are not errors; they are `Average` values.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::CategoryKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("raw duration {0} ms exceeds the 24 hour maximum")]
    DurationOutOfRange(u64),

    #[error("attempt has an empty tag")]
    EmptyTag,

    #[error("unrecognized outcome '{0}'")]
    UnknownOutcome(String),

    #[error("unrecognized puzzle type '{0}'")]
    UnknownPuzzle(String),

    #[error("unsupported window size {0}; expected one of 5, 12, 50, 100")]
    UnsupportedWindow(usize),

    #[error("window size must be at least 1")]
    EmptyWindow,

    #[error("attempt belongs to {found}, snapshot tracks {expected}")]
    CategoryMismatch {
        expected: CategoryKey,
        found: CategoryKey,
    },

    #[error("attempt at {found} is older than the newest retained attempt at {newest}")]
    OutOfOrder {
        newest: DateTime<Utc>,
        found: DateTime<Utc>,
    },

    #[error("an edit cannot change the attempt id ('{old}' -> '{new}')")]
    IdChanged { old: String, new: String },

    #[error("an edit cannot move an attempt in time ({old} -> {new})")]
    TimestampChanged {
        old: DateTime<Utc>,
        new: DateTime<Utc>,
    },

    #[error("attempt is not part of this snapshot's aggregate")]
    UnknownAttempt,
}
