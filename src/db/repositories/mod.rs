pub mod attempts;
pub mod snapshots;
pub mod tags;
