use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::models::{Attempt, CategoryKey, Outcome, PLUS_TWO_PENALTY_MS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    Stopped,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Idle
    }
}

/// One solve from start to the moment it is saved or discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub category: Option<CategoryKey>,
    pub scramble: String,
    pub started_at: Option<DateTime<Utc>>,
    /// Frozen on stop; while running it trails `running_anchor`.
    pub elapsed_ms: u64,
    pub dnf: bool,
    pub plus_two: bool,
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_elapsed_ms(&self) -> u64 {
        match (self.status, self.running_anchor) {
            (TimerStatus::Running, Some(anchor)) => anchor.elapsed().as_millis() as u64,
            _ => self.elapsed_ms,
        }
    }

    pub fn sync_elapsed_from_anchor(&mut self) {
        if let (TimerStatus::Running, Some(anchor)) = (self.status, self.running_anchor) {
            self.elapsed_ms = anchor.elapsed().as_millis() as u64;
        }
    }

    pub fn start(
        &mut self,
        category: CategoryKey,
        scramble: String,
        started_at: DateTime<Utc>,
        now: Instant,
    ) -> Result<()> {
        if self.status != TimerStatus::Idle {
            bail!("timer already active");
        }
        *self = Self {
            status: TimerStatus::Running,
            category: Some(category),
            scramble,
            started_at: Some(started_at),
            elapsed_ms: 0,
            dnf: false,
            plus_two: false,
            running_anchor: Some(now),
        };
        Ok(())
    }

    /// Freezes the measured time and returns it.
    pub fn stop(&mut self, now: Instant) -> Result<u64> {
        let anchor = match (self.status, self.running_anchor) {
            (TimerStatus::Running, Some(anchor)) => anchor,
            _ => bail!("timer is not running"),
        };
        self.elapsed_ms = now.saturating_duration_since(anchor).as_millis() as u64;
        self.status = TimerStatus::Stopped;
        self.running_anchor = None;
        Ok(self.elapsed_ms)
    }

    pub fn toggle_dnf(&mut self) -> Result<bool> {
        self.ensure_stopped()?;
        self.dnf = !self.dnf;
        Ok(self.dnf)
    }

    pub fn toggle_plus_two(&mut self) -> Result<bool> {
        self.ensure_stopped()?;
        self.plus_two = !self.plus_two;
        Ok(self.plus_two)
    }

    /// DNF wins over +2.
    pub fn outcome(&self) -> Outcome {
        if self.dnf {
            Outcome::Dnf
        } else if self.plus_two {
            Outcome::PlusTwo
        } else {
            Outcome::Ok
        }
    }

    /// Time to show the solver: the measured time plus any penalty, `None` for a DNF.
    pub fn display_ms(&self) -> Option<u64> {
        match self.outcome() {
            Outcome::Dnf => None,
            Outcome::PlusTwo => Some(self.current_elapsed_ms() + PLUS_TWO_PENALTY_MS),
            Outcome::Ok => Some(self.current_elapsed_ms()),
        }
    }

    /// Unsaved attempt for the stopped solve. The raw duration is the measured
    /// time, the penalty lives only in the outcome.
    pub fn to_attempt(&self, comment: impl Into<String>) -> Result<Attempt> {
        self.ensure_stopped()?;
        let category = self
            .category
            .clone()
            .ok_or_else(|| anyhow!("stopped timer has no category"))?;
        let started_at = self
            .started_at
            .ok_or_else(|| anyhow!("stopped timer has no start time"))?;
        let finished_at = started_at + ChronoDuration::milliseconds(self.elapsed_ms as i64);

        Ok(Attempt::new(category, self.elapsed_ms, finished_at)
            .with_outcome(self.outcome())
            .with_scramble(self.scramble.clone())
            .with_comment(comment))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn ensure_stopped(&self) -> Result<()> {
        if self.status != TimerStatus::Stopped {
            bail!("timer is not stopped");
        }
        Ok(())
    }
}
