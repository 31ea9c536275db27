//! Rolling speed-solving statistics.
//!
//! Everything in here is synchronous and free of I/O. Callers serialize the
//! mutations of one category; different categories never share state.

pub mod aggregate;
pub mod average;
pub mod error;
pub mod snapshot;
pub mod window;


pub use aggregate::Aggregate;
pub use average::{average_of_n, Average, TrimPolicy, WindowSize, DNF_SENTINEL, NOT_ENOUGH_DATA_SENTINEL};
pub use error::StatsError;
pub use snapshot::{
    apply_delete, apply_insert, apply_update, recompute, StatisticsSnapshot, WindowedAverages,
};
pub use window::{best_average, latest_average, moving_averages, RecentWindow, RECENT_CAPACITY};
