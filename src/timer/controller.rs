use std::{sync::Arc, time::Instant};

use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    models::{Attempt, CategoryKey, PuzzleType},
    scramble::ScrambleSource,
    tracker::StatsTracker,
};

use super::{TimerState, TimerStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Drives one solve at a time and hands finished solves to the tracker.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    tracker: StatsTracker,
    scrambler: Arc<Mutex<Box<dyn ScrambleSource>>>,
}

impl TimerController {
    pub fn new(tracker: StatsTracker, scrambler: Box<dyn ScrambleSource>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            tracker,
            scrambler: Arc::new(Mutex::new(scrambler)),
        }
    }

    pub async fn get_state(&self) -> TimerState {
        let mut guard = self.state.lock().await;
        guard.sync_elapsed_from_anchor();
        guard.clone()
    }

    pub async fn next_scramble(&self, puzzle: PuzzleType) -> String {
        self.scrambler.lock().await.scramble(puzzle)
    }

    /// Starts a solve. Without an explicit scramble a fresh one is generated.
    pub async fn start_timer(&self, category: CategoryKey, scramble: Option<String>) -> Result<TimerState> {
        let scramble = match scramble {
            Some(scramble) => scramble,
            None => self.next_scramble(category.puzzle).await,
        };

        let mut state = self.state.lock().await;
        state.start(category, scramble, Utc::now(), Instant::now())?;
        Ok(state.clone())
    }

    pub async fn stop_timer(&self) -> Result<TimerState> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let elapsed_ms = state.stop(now)?;
        log_info!("solve stopped at {} ms", elapsed_ms);
        Ok(state.clone())
    }

    pub async fn toggle_dnf(&self) -> Result<TimerState> {
        let mut state = self.state.lock().await;
        state.toggle_dnf()?;
        Ok(state.clone())
    }

    pub async fn toggle_plus_two(&self) -> Result<TimerState> {
        let mut state = self.state.lock().await;
        state.toggle_plus_two()?;
        Ok(state.clone())
    }

    /// Records the stopped solve and resets the timer. On failure the solve stays
    /// stopped so it can be retried or discarded.
    pub async fn save_solve(&self, comment: &str) -> Result<Attempt> {
        let mut state = self.state.lock().await;
        let attempt = state.to_attempt(comment)?;
        match self.tracker.record_attempt(attempt).await {
            Ok(recorded) => {
                state.reset();
                Ok(recorded)
            }
            Err(err) => {
                log_warn!("failed to save solve: {:#}", err);
                Err(err)
            }
        }
    }

    pub async fn discard(&self) -> TimerState {
        let mut state = self.state.lock().await;
        if state.status != TimerStatus::Idle {
            log_info!("solve discarded");
        }
        state.reset();
        state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::Database,
        models::{Outcome, DEFAULT_TAG},
        scramble::RandomMoveScrambler,
    };

    fn controller() -> TimerController {
        let tracker = StatsTracker::new(Database::open_in_memory().unwrap());
        TimerController::new(tracker, Box::new(RandomMoveScrambler::seeded(1)))
    }

    #[tokio::test]
    async fn full_solve_cycle_records_an_attempt() {
        let controller = controller();
        let category = CategoryKey::new(PuzzleType::Cube2x2, DEFAULT_TAG);

        let running = controller.start_timer(category.clone(), None).await.unwrap();
        assert_eq!(running.status, TimerStatus::Running);
        assert_eq!(running.scramble.split(' ').count(), 11);

        controller.stop_timer().await.unwrap();
        controller.toggle_plus_two().await.unwrap();
        let saved = controller.save_solve("").await.unwrap();

        assert!(saved.is_persisted());
        assert_eq!(saved.outcome, Outcome::PlusTwo);
        assert_eq!(saved.scramble, running.scramble);
        assert_eq!(controller.get_state().await.status, TimerStatus::Idle);

        let stats = controller.tracker.snapshot(&category).await.unwrap();
        assert_eq!(stats.count(), 1);
        assert_eq!(stats.plus_two_count(), 1);
    }

    #[tokio::test]
    async fn explicit_scramble_and_discard() {
        let controller = controller();
        let state = controller
            .start_timer(CategoryKey::default(), Some("F2 B2".into()))
            .await
            .unwrap();
        assert_eq!(state.scramble, "F2 B2");
        assert!(controller.start_timer(CategoryKey::default(), None).await.is_err());
        assert!(controller.save_solve("").await.is_err());

        assert_eq!(controller.discard().await.status, TimerStatus::Idle);
        let stats = controller.tracker.snapshot(&CategoryKey::default()).await.unwrap();
        assert_eq!(stats.count(), 0);
    }
}
