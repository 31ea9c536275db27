pub mod db;
pub mod models;
pub mod scramble;
pub mod settings;
pub mod stats;
pub mod timer;
pub mod tracker;
mod utils;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

pub use db::Database;
pub use models::{Attempt, CategoryKey, HistoryOrder, HistoryQuery, Outcome, PuzzleType};
pub use scramble::{RandomMoveScrambler, ScrambleSource};
pub use settings::SettingsStore;
pub use stats::{Average, StatisticsSnapshot, StatsError, WindowSize};
pub use timer::TimerController;
pub use tracker::{AttemptEdit, ChangeCause, SnapshotChanged, StatsTracker};

pub const DATABASE_FILE: &str = "solvestats.sqlite3";
pub const SETTINGS_FILE: &str = "settings.json";

/// Installs `env_logger` at info level; `RUST_LOG` overrides it. Safe to call twice.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Everything a front end needs, opened from one data directory.
pub struct AppState {
    pub data_dir: PathBuf,
    pub db: Database,
    pub tracker: StatsTracker,
    pub timer: TimerController,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DATABASE_FILE))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let tracker = StatsTracker::new(db.clone());
        let timer = TimerController::new(tracker.clone(), Box::new(RandomMoveScrambler::new()));

        info!("Opened solve data in {}", data_dir.display());

        Ok(Self {
            data_dir,
            db,
            tracker,
            timer,
            settings,
        })
    }

    /// Statistics of the category selected in the settings.
    pub async fn current_statistics(&self) -> Result<StatisticsSnapshot> {
        let category = self.settings.selected_category();
        self.tracker.snapshot(&category).await
    }

    /// A page of the selected category's history.
    pub async fn current_history(&self, query: &HistoryQuery) -> Result<Vec<Attempt>> {
        let category = self.settings.selected_category();
        self.db.history_page(&category, query).await
    }
}
