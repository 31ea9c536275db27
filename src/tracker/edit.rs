use serde::{Deserialize, Serialize};

use crate::models::{Attempt, Outcome};

/// Fields an attempt may change after it was recorded. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEdit {
    pub raw_duration_ms: Option<u64>,
    pub outcome: Option<Outcome>,
    pub scramble: Option<String>,
    pub comment: Option<String>,
}

impl AttemptEdit {
    pub fn outcome(outcome: Outcome) -> Self {
        Self {
            outcome: Some(outcome),
            ..Self::default()
        }
    }

    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, attempt: &Attempt) -> Attempt {
        let mut edited = attempt.clone();
        if let Some(raw) = self.raw_duration_ms {
            edited.raw_duration_ms = raw;
        }
        if let Some(outcome) = self.outcome {
            edited.outcome = outcome;
        }
        if let Some(scramble) = &self.scramble {
            edited.scramble = scramble.clone();
        }
        if let Some(comment) = &self.comment {
            edited.comment = comment.clone();
        }
        edited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryKey;
    use chrono::Utc;

    #[test]
    fn apply_only_touches_given_fields() {
        let original = Attempt::new(CategoryKey::default(), 9_000, Utc::now()).with_comment("ok");
        let edited = AttemptEdit::outcome(Outcome::PlusTwo).apply(&original);

        assert_eq!(edited.outcome, Outcome::PlusTwo);
        assert_eq!(edited.raw_duration_ms, 9_000);
        assert_eq!(edited.effective_duration_ms(), Some(11_000));
        assert_eq!(edited.comment, "ok");
        assert_eq!(edited.timestamp, original.timestamp);

        let reverted = AttemptEdit::outcome(Outcome::Ok).apply(&edited);
        assert_eq!(reverted, original);
        assert!(AttemptEdit::default().is_empty());
        assert!(!AttemptEdit::comment("").is_empty());
    }
}
