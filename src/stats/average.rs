use serde::{Deserialize, Serialize};

use crate::models::Attempt;

use super::StatsError;

/// Legacy numeric encoding of `Average::Dnf`.
pub const DNF_SENTINEL: f64 = -1.0;
/// Legacy numeric encoding of `Average::NotEnoughData`.
pub const NOT_ENOUGH_DATA_SENTINEL: f64 = 0.0;

/// Result of a windowed average. The two unavailable states are kept apart:
/// a window can be too short, or it can hold too many DNFs to be averaged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ms", rename_all = "camelCase")]
pub enum Average {
    NotEnoughData,
    Dnf,
    Millis(f64),
}

impl Default for Average {
    fn default() -> Self {
        Average::NotEnoughData
    }
}

impl Average {
    pub fn millis(&self) -> Option<f64> {
        match self {
            Average::Millis(ms) => Some(*ms),
            _ => None,
        }
    }

    pub fn is_dnf(&self) -> bool {
        matches!(self, Average::Dnf)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Average::Millis(_))
    }

    /// Legacy numeric form. Lossy at zero: a genuine `Millis(0.0)` average of 0 ms
    /// attempts encodes like `NotEnoughData` and decodes as such.
    pub fn to_sentinel(self) -> f64 {
        match self {
            Average::NotEnoughData => NOT_ENOUGH_DATA_SENTINEL,
            Average::Dnf => DNF_SENTINEL,
            Average::Millis(ms) => ms,
        }
    }

    pub fn from_sentinel(value: f64) -> Self {
        if value < 0.0 {
            Average::Dnf
        } else if value == 0.0 {
            Average::NotEnoughData
        } else {
            Average::Millis(value)
        }
    }
}

/// The window sizes a snapshot tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSize {
    Ao5,
    Ao12,
    Ao50,
    Ao100,
}

impl WindowSize {
    pub const ALL: [WindowSize; 4] = [
        WindowSize::Ao5,
        WindowSize::Ao12,
        WindowSize::Ao50,
        WindowSize::Ao100,
    ];

    pub fn len(self) -> usize {
        match self {
            WindowSize::Ao5 => 5,
            WindowSize::Ao12 => 12,
            WindowSize::Ao50 => 50,
            WindowSize::Ao100 => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WindowSize::Ao5 => "Ao5",
            WindowSize::Ao12 => "Ao12",
            WindowSize::Ao50 => "Ao50",
            WindowSize::Ao100 => "Ao100",
        }
    }
}

impl TryFrom<usize> for WindowSize {
    type Error = StatsError;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        WindowSize::ALL
            .into_iter()
            .find(|size| size.len() == n)
            .ok_or(StatsError::UnsupportedWindow(n))
    }
}

/// DNF tolerance and trimming for a window of `n` attempts.
///
/// `max_allowed_dnfs <= trim_count` holds for every tier, so a window that passes
/// the DNF gate always loses all of its DNFs to the worst-side trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPolicy {
    pub max_allowed_dnfs: usize,
    pub trim_count: usize,
}

impl TrimPolicy {
    pub fn for_window(n: usize) -> Self {
        let (max_allowed_dnfs, trim_count) = match n {
            0..=2 => (0, 0),
            3..=12 => (1, 1),
            13..=50 => (2, 2),
            _ => (5, 5),
        };
        Self {
            max_allowed_dnfs,
            trim_count,
        }
    }

    /// Number of entries a numeric average of `n` is taken over.
    pub fn averaged_count(&self, n: usize) -> usize {
        n.saturating_sub(2 * self.trim_count)
    }
}

/// Trimmed average of the most recent `n` attempts in `window`.
pub fn average_of_n(window: &[Attempt], n: usize) -> Result<Average, StatsError> {
    if n == 0 {
        return Err(StatsError::EmptyWindow);
    }
    if window.len() < n {
        return Ok(Average::NotEnoughData);
    }

    Ok(exact_window_average(window[window.len() - n..].iter()))
}

/// Average of a window whose length is exactly its size.
pub(crate) fn exact_window_average<'a, I>(window: I) -> Average
where
    I: Iterator<Item = &'a Attempt>,
{
    let entries: Vec<Option<u64>> = window.map(Attempt::effective_duration_ms).collect();
    let policy = TrimPolicy::for_window(entries.len());

    match middle_entries(entries, policy) {
        Some(middle) if !middle.is_empty() => {
            let sum: u64 = middle.iter().sum();
            Average::Millis(sum as f64 / middle.len() as f64)
        }
        Some(_) => Average::NotEnoughData,
        None => Average::Dnf,
    }
}

/// Entries left after trimming, or `None` when the window is voided by DNFs.
fn middle_entries(mut entries: Vec<Option<u64>>, policy: TrimPolicy) -> Option<Vec<u64>> {
    let dnf_count = entries.iter().filter(|entry| entry.is_none()).count();
    if dnf_count > policy.max_allowed_dnfs {
        return None;
    }

    // DNFs land at the tail regardless of time; equal times keep window order.
    entries.sort_by_key(|entry| match entry {
        Some(ms) => (false, *ms),
        None => (true, 0),
    });

    if entries.len() <= 2 * policy.trim_count {
        return Some(Vec::new());
    }
    let end = entries.len() - policy.trim_count;
    entries[policy.trim_count..end].iter().copied().collect()
}
