//! Per-category statistics service over the attempt store.

pub mod edit;
pub mod events;
pub mod service;

#[cfg(test)]
mod tests;

pub use edit::AttemptEdit;
pub use events::{ChangeCause, SnapshotChanged};
pub use service::StatsTracker;
