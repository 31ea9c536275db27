use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Attempt, Outcome};

use super::StatsError;

/// Whole-history counters and accumulators for one category.
///
/// Sums are exact integers, so inserting and removing the same attempts in any
/// order always lands on the same state. Effective durations are also kept in a
/// multiset so best and worst survive deletes without a rescan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    count: u64,
    dnf_count: u64,
    plus_two_count: u64,
    sum_ms: u64,
    sum_sq_ms: u128,
    durations: BTreeMap<u64, u64>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn valid_count(&self) -> u64 {
        self.count - self.dnf_count
    }

    pub fn dnf_count(&self) -> u64 {
        self.dnf_count
    }

    pub fn plus_two_count(&self) -> u64 {
        self.plus_two_count
    }

    pub fn best(&self) -> u64 {
        self.durations.keys().next().copied().unwrap_or(0)
    }

    pub fn worst(&self) -> u64 {
        self.durations.keys().next_back().copied().unwrap_or(0)
    }

    /// Mean effective duration of non-DNF attempts.
    pub fn mean(&self) -> Option<f64> {
        match self.valid_count() {
            0 => None,
            valid => Some(self.sum_ms as f64 / valid as f64),
        }
    }

    /// Population standard deviation of non-DNF effective durations.
    pub fn standard_deviation(&self) -> f64 {
        let valid = self.valid_count();
        if valid < 2 {
            return 0.0;
        }
        let n = valid as f64;
        let mean = self.sum_ms as f64 / n;
        let variance = self.sum_sq_ms as f64 / n - mean * mean;
        variance.max(0.0).sqrt()
    }

    pub fn insert(&mut self, attempt: &Attempt) {
        self.count += 1;
        match attempt.outcome {
            Outcome::Dnf => self.dnf_count += 1,
            Outcome::PlusTwo => self.plus_two_count += 1,
            Outcome::Ok => {}
        }

        if let Some(ms) = attempt.effective_duration_ms() {
            self.sum_ms += ms;
            self.sum_sq_ms += u128::from(ms) * u128::from(ms);
            *self.durations.entry(ms).or_insert(0) += 1;
        }
    }

    /// Checks that `attempt` could have been inserted, without changing anything.
    pub fn check_remove(&self, attempt: &Attempt) -> Result<(), StatsError> {
        if self.count == 0 {
            return Err(StatsError::UnknownAttempt);
        }
        let known = match attempt.outcome {
            Outcome::Dnf => self.dnf_count > 0,
            Outcome::PlusTwo => {
                self.plus_two_count > 0 && self.holds(attempt.effective_duration_ms())
            }
            Outcome::Ok => self.holds(attempt.effective_duration_ms()),
        };
        if known {
            Ok(())
        } else {
            Err(StatsError::UnknownAttempt)
        }
    }

    fn holds(&self, duration: Option<u64>) -> bool {
        duration.map_or(false, |ms| self.durations.contains_key(&ms))
    }

    /// Removes a previously inserted attempt. Leaves the aggregate untouched on error.
    pub fn remove(&mut self, attempt: &Attempt) -> Result<(), StatsError> {
        self.check_remove(attempt)?;

        self.count -= 1;
        match attempt.outcome {
            Outcome::Dnf => self.dnf_count -= 1,
            Outcome::PlusTwo => self.plus_two_count -= 1,
            Outcome::Ok => {}
        }

        if let Some(ms) = attempt.effective_duration_ms() {
            self.sum_ms -= ms;
            self.sum_sq_ms -= u128::from(ms) * u128::from(ms);
            if let Some(occurrences) = self.durations.get_mut(&ms) {
                *occurrences -= 1;
                if *occurrences == 0 {
                    self.durations.remove(&ms);
                }
            }
        }
        Ok(())
    }
}
