use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, helpers::format_datetime, repositories::tags::ensure_tag};
use crate::models::CategoryKey;
use crate::stats::StatisticsSnapshot;

impl Database {
    pub async fn save_snapshot(&self, snapshot: &StatisticsSnapshot) -> Result<()> {
        let category = snapshot.category().clone();
        let payload = serde_json::to_string(snapshot)
            .with_context(|| format!("failed to serialize statistics for {category}"))?;
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            ensure_tag(&tx, &category)?;
            tx.execute(
                "INSERT INTO stats_snapshots (puzzle, tag, payload, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(puzzle, tag) DO UPDATE SET
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                params![
                    category.puzzle.as_str(),
                    category.tag,
                    payload,
                    format_datetime(&Utc::now()),
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// `None` when nothing was stored yet.
    pub async fn load_snapshot(&self, category: &CategoryKey) -> Result<Option<StatisticsSnapshot>> {
        let category = category.clone();
        let payload: Option<String> = self
            .execute(move |conn| {
                let payload = conn
                    .query_row(
                        "SELECT payload FROM stats_snapshots WHERE puzzle = ?1 AND tag = ?2",
                        params![category.puzzle.as_str(), category.tag],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(payload)
            })
            .await?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw).context("failed to deserialize stored statistics")
            })
            .transpose()
    }

    pub async fn delete_snapshot(&self, category: &CategoryKey) -> Result<()> {
        let category = category.clone();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM stats_snapshots WHERE puzzle = ?1 AND tag = ?2",
                params![category.puzzle.as_str(), category.tag],
            )?;
            Ok(())
        })
        .await
    }
}
