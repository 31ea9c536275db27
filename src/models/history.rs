use serde::{Deserialize, Serialize};

/// Attempts per history page.
pub const HISTORY_PAGE_SIZE: usize = 100;

/// How a history page is ordered. Time orders rank by effective duration and
/// always put DNFs last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryOrder {
    #[default]
    DateDesc,
    DateAsc,
    TimeAsc,
    TimeDesc,
}

/// One page of a category's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub order: HistoryOrder,
    /// Case-insensitive substring of the comment. Blank matches everything.
    #[serde(default)]
    pub search: String,
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            order: HistoryOrder::default(),
            search: String::new(),
            limit: HISTORY_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl HistoryQuery {
    pub fn ordered(order: HistoryOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn searching(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// The page after this one.
    pub fn next_page(&self) -> Self {
        Self {
            offset: self.offset + self.limit,
            ..self.clone()
        }
    }
}
