use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Attempt, CategoryKey};

use super::{
    aggregate::Aggregate,
    average::{Average, WindowSize},
    window::RecentWindow,
    StatsError,
};

/// Latest and best AoN for every tracked window size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowedAverages {
    pub latest: BTreeMap<WindowSize, Average>,
    pub best: BTreeMap<WindowSize, Average>,
}

impl WindowedAverages {
    pub fn latest(&self, size: WindowSize) -> Average {
        self.latest.get(&size).copied().unwrap_or_default()
    }

    pub fn best(&self, size: WindowSize) -> Average {
        self.best.get(&size).copied().unwrap_or_default()
    }
}

/// Statistics of one category. Only ever produced by `recompute` and the
/// mutation methods; every mutation validates before it touches any state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    category: CategoryKey,
    aggregate: Aggregate,
    recent: RecentWindow,
    averages: WindowedAverages,
    /// Set when an edit or delete reached attempts outside the retained window.
    #[serde(default)]
    needs_recompute: bool,
}

impl StatisticsSnapshot {
    pub fn empty(category: CategoryKey) -> Self {
        let mut snapshot = Self {
            category,
            aggregate: Aggregate::new(),
            recent: RecentWindow::new(),
            averages: WindowedAverages::default(),
            needs_recompute: false,
        };
        snapshot.refresh_averages();
        snapshot
    }

    /// Full recompute from a chronological history.
    pub fn recompute(category: CategoryKey, history: &[Attempt]) -> Result<Self, StatsError> {
        let mut snapshot = Self::empty(category);
        for attempt in history {
            snapshot.validate_insert(attempt)?;
            snapshot.aggregate.insert(attempt);
            snapshot.recent.push(attempt.clone());
        }
        snapshot.refresh_averages();
        Ok(snapshot)
    }

    pub fn category(&self) -> &CategoryKey {
        &self.category
    }

    pub fn count(&self) -> u64 {
        self.aggregate.count()
    }

    pub fn valid_count(&self) -> u64 {
        self.aggregate.valid_count()
    }

    pub fn dnf_count(&self) -> u64 {
        self.aggregate.dnf_count()
    }

    pub fn plus_two_count(&self) -> u64 {
        self.aggregate.plus_two_count()
    }

    /// Best effective duration, 0 without a valid attempt.
    pub fn best(&self) -> u64 {
        self.aggregate.best()
    }

    /// Worst effective duration, 0 without a valid attempt.
    pub fn worst(&self) -> u64 {
        self.aggregate.worst()
    }

    /// `None` while no valid attempt exists.
    pub fn global_average(&self) -> Option<f64> {
        self.aggregate.mean()
    }

    pub fn standard_deviation(&self) -> f64 {
        self.aggregate.standard_deviation()
    }

    pub fn windowed_averages(&self) -> &WindowedAverages {
        &self.averages
    }

    pub fn latest_average(&self, size: WindowSize) -> Average {
        self.averages.latest(size)
    }

    pub fn best_average(&self, size: WindowSize) -> Average {
        self.averages.best(size)
    }

    pub fn recent(&self) -> &RecentWindow {
        &self.recent
    }

    /// True once an edit or delete touched a window the retained attempts can no
    /// longer reproduce. Best AoN may then be off until a full `recompute`.
    pub fn needs_recompute(&self) -> bool {
        self.needs_recompute
    }

    /// Every attempt of the category is still retained.
    fn retains_everything(&self) -> bool {
        self.count() == self.recent.len() as u64
    }

    /// Whether a changed effective duration of `attempt` stays inside windows the
    /// retained attempts cover. Windows that started at evicted attempts reach the
    /// first `n - 1` retained slots.
    fn change_stays_retained(&self, attempt: &Attempt) -> bool {
        if self.retains_everything() {
            return true;
        }
        match self.recent.position(attempt) {
            Some(index) => WindowSize::ALL.iter().all(|size| index + 1 >= size.len()),
            None => false,
        }
    }

    pub fn validate_insert(&self, attempt: &Attempt) -> Result<(), StatsError> {
        attempt.validate()?;
        self.check_category(attempt)?;
        if let Some(newest) = self.recent.newest() {
            if attempt.timestamp < newest.timestamp {
                return Err(StatsError::OutOfOrder {
                    newest: newest.timestamp,
                    found: attempt.timestamp,
                });
            }
        }
        Ok(())
    }

    pub fn validate_update(&self, old: &Attempt, new: &Attempt) -> Result<(), StatsError> {
        new.validate()?;
        self.check_category(old)?;
        self.check_category(new)?;
        if old.id != new.id {
            return Err(StatsError::IdChanged {
                old: old.id.clone(),
                new: new.id.clone(),
            });
        }
        if old.timestamp != new.timestamp {
            return Err(StatsError::TimestampChanged {
                old: old.timestamp,
                new: new.timestamp,
            });
        }
        self.check_known(old)
    }

    pub fn validate_delete(&self, attempt: &Attempt) -> Result<(), StatsError> {
        self.check_category(attempt)?;
        self.check_known(attempt)
    }

    fn check_known(&self, attempt: &Attempt) -> Result<(), StatsError> {
        if self.retains_everything() && self.recent.position(attempt).is_none() {
            return Err(StatsError::UnknownAttempt);
        }
        self.aggregate.check_remove(attempt)
    }

    fn check_category(&self, attempt: &Attempt) -> Result<(), StatsError> {
        if attempt.category != self.category {
            return Err(StatsError::CategoryMismatch {
                expected: self.category.clone(),
                found: attempt.category.clone(),
            });
        }
        Ok(())
    }

    pub fn insert(&mut self, attempt: &Attempt) -> Result<(), StatsError> {
        self.validate_insert(attempt)?;
        self.aggregate.insert(attempt);
        self.recent.push(attempt.clone());
        self.refresh_averages();
        Ok(())
    }

    /// Comment or scramble edits, and effective-duration changes inside the
    /// retained window, stay exact. Anything else flags `needs_recompute`.
    pub fn update(&mut self, old: &Attempt, new: &Attempt) -> Result<(), StatsError> {
        self.validate_update(old, new)?;
        if old.effective_duration_ms() != new.effective_duration_ms()
            && !self.change_stays_retained(old)
        {
            self.needs_recompute = true;
        }
        self.aggregate.remove(old)?;
        self.aggregate.insert(new);
        if self.recent.replace(old, new) {
            self.refresh_averages();
        }
        Ok(())
    }

    /// Exact while every attempt is retained. Once attempts have been evicted the
    /// retained window can neither be refilled nor its archive revised, so the
    /// snapshot flags `needs_recompute`.
    pub fn delete(&mut self, attempt: &Attempt) -> Result<(), StatsError> {
        self.validate_delete(attempt)?;
        if !self.retains_everything() {
            self.needs_recompute = true;
        }
        self.aggregate.remove(attempt)?;
        if self.recent.remove(attempt) {
            self.refresh_averages();
        }
        Ok(())
    }

    fn refresh_averages(&mut self) {
        for size in WindowSize::ALL {
            self.averages.latest.insert(size, self.recent.latest(size));
            self.averages.best.insert(size, self.recent.best(size));
        }
    }
}

/// Full recompute of a category from its chronological history.
pub fn recompute(category: CategoryKey, history: &[Attempt]) -> Result<StatisticsSnapshot, StatsError> {
    StatisticsSnapshot::recompute(category, history)
}

pub fn apply_insert(
    snapshot: &StatisticsSnapshot,
    attempt: &Attempt,
) -> Result<StatisticsSnapshot, StatsError> {
    let mut next = snapshot.clone();
    next.insert(attempt)?;
    Ok(next)
}

/// Check `needs_recompute` on the result; see `StatisticsSnapshot::update`.
pub fn apply_update(
    snapshot: &StatisticsSnapshot,
    old: &Attempt,
    new: &Attempt,
) -> Result<StatisticsSnapshot, StatsError> {
    let mut next = snapshot.clone();
    next.update(old, new)?;
    Ok(next)
}

/// Check `needs_recompute` on the result; see `StatisticsSnapshot::delete`.
pub fn apply_delete(
    snapshot: &StatisticsSnapshot,
    removed: &Attempt,
) -> Result<StatisticsSnapshot, StatsError> {
    let mut next = snapshot.clone();
    next.delete(removed)?;
    Ok(next)
}
