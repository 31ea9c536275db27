use serde::Serialize;

use crate::models::CategoryKey;
use crate::stats::StatisticsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeCause {
    Inserted,
    Updated,
    Deleted,
    Repaired,
    TagRemoved,
}

impl ChangeCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeCause::Inserted => "inserted",
            ChangeCause::Updated => "updated",
            ChangeCause::Deleted => "deleted",
            ChangeCause::Repaired => "repaired",
            ChangeCause::TagRemoved => "tagRemoved",
        }
    }
}

/// Published after every mutation that reached the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotChanged {
    pub category: CategoryKey,
    pub cause: ChangeCause,
    pub snapshot: StatisticsSnapshot,
}
