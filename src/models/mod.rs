pub mod attempt;
pub mod history;

pub use attempt::{
    Attempt, CategoryKey, Outcome, PuzzleType, DEFAULT_TAG, MAX_DURATION_MS, PLUS_TWO_PENALTY_MS,
};
pub use history::{HistoryOrder, HistoryQuery, HISTORY_PAGE_SIZE};
