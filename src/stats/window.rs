use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::models::Attempt;

use super::average::{exact_window_average, Average, WindowSize};

/// Attempts retained per category. Every supported window fits inside it.
pub const RECENT_CAPACITY: usize = 100;

/// AoN over the most recent `size` attempts of a chronological history.
pub fn latest_average(history: &[Attempt], size: WindowSize) -> Average {
    let n = size.len();
    if history.len() < n {
        return Average::NotEnoughData;
    }
    exact_window_average(history[history.len() - n..].iter())
}

/// Lowest numeric AoN over every contiguous window of `size` attempts.
/// Never DNF: a history without a numeric window has simply not achieved one.
pub fn best_average(history: &[Attempt], size: WindowSize) -> Average {
    history
        .windows(size.len())
        .filter_map(|window| exact_window_average(window.iter()).millis())
        .fold(None, min_millis)
        .map(Average::Millis)
        .unwrap_or(Average::NotEnoughData)
}

/// AoN of every contiguous window, oldest first. Empty for short histories.
pub fn moving_averages(history: &[Attempt], size: WindowSize) -> Vec<Average> {
    history
        .windows(size.len())
        .map(|window| exact_window_average(window.iter()))
        .collect()
}

fn min_millis(best: Option<f64>, candidate: f64) -> Option<f64> {
    match best {
        Some(current) if current <= candidate => Some(current),
        _ => Some(candidate),
    }
}

/// The most recent attempts of one category, oldest first, plus the best AoN of
/// every window that started at an attempt which has since been evicted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentWindow {
    attempts: VecDeque<Attempt>,
    archived_best: BTreeMap<WindowSize, f64>,
}

impl RecentWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn attempts(&self) -> impl DoubleEndedIterator<Item = &Attempt> + ExactSizeIterator {
        self.attempts.iter()
    }

    pub fn newest(&self) -> Option<&Attempt> {
        self.attempts.back()
    }

    pub fn push(&mut self, attempt: Attempt) {
        if self.attempts.len() == RECENT_CAPACITY {
            self.archive_front();
            self.attempts.pop_front();
        }
        self.attempts.push_back(attempt);
    }

    /// Folds every window starting at the oldest attempt into the archive.
    fn archive_front(&mut self) {
        for size in WindowSize::ALL {
            let n = size.len();
            if self.attempts.len() < n {
                continue;
            }
            if let Some(ms) = exact_window_average(self.attempts.iter().take(n)).millis() {
                let archived = self.archived_best.get(&size).copied();
                if let Some(best) = min_millis(archived, ms) {
                    self.archived_best.insert(size, best);
                }
            }
        }
    }

    /// Swaps `old` for `new` in place. Returns false when `old` is not retained.
    pub fn replace(&mut self, old: &Attempt, new: &Attempt) -> bool {
        match self.position(old) {
            Some(index) => {
                self.attempts[index] = new.clone();
                true
            }
            None => false,
        }
    }

    /// Returns false when `attempt` is not retained.
    pub fn remove(&mut self, attempt: &Attempt) -> bool {
        match self.position(attempt) {
            Some(index) => {
                self.attempts.remove(index);
                true
            }
            None => false,
        }
    }

    /// Index of `attempt`, oldest first. Persisted attempts match by id.
    pub fn position(&self, attempt: &Attempt) -> Option<usize> {
        if attempt.is_persisted() {
            self.attempts.iter().position(|kept| kept.id == attempt.id)
        } else {
            self.attempts.iter().position(|kept| kept == attempt)
        }
    }

    pub fn latest(&self, size: WindowSize) -> Average {
        let n = size.len();
        if self.attempts.len() < n {
            return Average::NotEnoughData;
        }
        exact_window_average(self.attempts.iter().skip(self.attempts.len() - n))
    }

    pub fn best(&self, size: WindowSize) -> Average {
        let n = size.len();
        let retained = if self.attempts.len() < n {
            0
        } else {
            self.attempts.len() - n + 1
        };

        (0..retained)
            .filter_map(|start| {
                exact_window_average(self.attempts.iter().skip(start).take(n)).millis()
            })
            .fold(self.archived_best.get(&size).copied(), min_millis)
            .map(Average::Millis)
            .unwrap_or(Average::NotEnoughData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryKey, Outcome};
    use chrono::{Duration, TimeZone, Utc};

    fn history(times: &[u64]) -> Vec<Attempt> {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 18, 0, 0).unwrap();
        times
            .iter()
            .enumerate()
            .map(|(i, ms)| {
                let mut attempt =
                    Attempt::new(CategoryKey::default(), *ms, start + Duration::seconds(i as i64));
                attempt.id = format!("a{i}");
                attempt
            })
            .collect()
    }

    #[test]
    fn best_is_minimum_over_windows() {
        let attempts = history(&[20_000, 10_000, 10_000, 10_000, 10_000, 10_000, 30_000]);
        assert_eq!(best_average(&attempts, WindowSize::Ao5), Average::Millis(10_000.0));
        // last window is [10000, 10000, 10000, 10000, 30000]
        assert_eq!(latest_average(&attempts, WindowSize::Ao5), Average::Millis(10_000.0));
        assert_eq!(best_average(&attempts, WindowSize::Ao12), Average::NotEnoughData);
    }

    #[test]
    fn best_ignores_dnf_windows() {
        let mut attempts = history(&[9_000, 9_000, 9_000, 9_000, 9_000]);
        attempts[0].outcome = Outcome::Dnf;
        attempts[1].outcome = Outcome::Dnf;
        assert_eq!(latest_average(&attempts, WindowSize::Ao5), Average::Dnf);
        assert_eq!(best_average(&attempts, WindowSize::Ao5), Average::NotEnoughData);
    }

    #[test]
    fn moving_averages_cover_every_window() {
        let attempts = history(&[10_000, 11_000, 12_000, 13_000, 14_000, 15_000, 16_000]);
        let series = moving_averages(&attempts, WindowSize::Ao5);
        assert_eq!(
            series,
            vec![
                Average::Millis(12_000.0),
                Average::Millis(13_000.0),
                Average::Millis(14_000.0),
            ]
        );
        assert!(moving_averages(&attempts, WindowSize::Ao12).is_empty());
    }

    #[test]
    fn ring_keeps_capacity_and_archives_evicted_windows() {
        // A fast Ao5 at the very start, then slow solves that push it out.
        let mut times = vec![5_000; 5];
        times.extend(std::iter::repeat(20_000).take(RECENT_CAPACITY + 10));
        let attempts = history(&times);

        let mut ring = RecentWindow::new();
        for attempt in &attempts {
            ring.push(attempt.clone());
        }

        assert_eq!(ring.len(), RECENT_CAPACITY);
        assert_eq!(ring.best(WindowSize::Ao5), Average::Millis(5_000.0));
        assert_eq!(ring.best(WindowSize::Ao5), best_average(&attempts, WindowSize::Ao5));
        assert_eq!(ring.best(WindowSize::Ao100), best_average(&attempts, WindowSize::Ao100));
        assert_eq!(ring.latest(WindowSize::Ao100), Average::Millis(20_000.0));
    }

    #[test]
    fn replace_and_remove_match_by_id() {
        let attempts = history(&[10_000, 11_000, 12_000]);
        let mut ring = RecentWindow::new();
        attempts.iter().cloned().for_each(|attempt| ring.push(attempt));

        let mut edited = attempts[1].clone();
        edited.outcome = Outcome::PlusTwo;
        edited.comment = "pop".into();
        assert!(ring.replace(&attempts[1], &edited));
        assert_eq!(ring.attempts().nth(1), Some(&edited));

        assert!(ring.remove(&attempts[0]));
        assert!(!ring.remove(&attempts[0]));
        assert_eq!(ring.len(), 2);
    }
}
