use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Connection};

use crate::db::{connection::Database, helpers::format_datetime};
use crate::models::{CategoryKey, PuzzleType, DEFAULT_TAG};

pub(crate) fn ensure_tag(conn: &Connection, category: &CategoryKey) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO tags (puzzle, name, created_at) VALUES (?1, ?2, ?3)",
        params![
            category.puzzle.as_str(),
            category.tag,
            format_datetime(&Utc::now()),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Tags of a puzzle in creation order. The default tag is always listed first.
    pub async fn list_tags(&self, puzzle: PuzzleType) -> Result<Vec<String>> {
        self.execute(move |conn| {
            ensure_tag(conn, &CategoryKey::new(puzzle, DEFAULT_TAG))?;
            let mut stmt = conn.prepare(
                "SELECT name FROM tags
                 WHERE puzzle = ?1
                 ORDER BY name = ?2 DESC, created_at ASC, name ASC",
            )?;
            let mut rows = stmt.query(params![puzzle.as_str(), DEFAULT_TAG])?;
            let mut tags = Vec::new();
            while let Some(row) = rows.next()? {
                tags.push(row.get(0)?);
            }
            Ok(tags)
        })
        .await
    }

    /// Returns false when the tag already existed.
    pub async fn add_tag(&self, category: &CategoryKey) -> Result<bool> {
        if category.tag.trim().is_empty() {
            bail!("tag name must not be empty");
        }
        let category = category.clone();
        self.execute(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO tags (puzzle, name, created_at) VALUES (?1, ?2, ?3)",
                params![
                    category.puzzle.as_str(),
                    category.tag,
                    format_datetime(&Utc::now()),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    /// Drops a tag together with its attempts and stored statistics. Returns the
    /// number of attempts removed.
    pub async fn remove_tag(&self, category: &CategoryKey) -> Result<u64> {
        if category.tag == DEFAULT_TAG {
            bail!("the {DEFAULT_TAG} tag cannot be removed");
        }
        let category = category.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM attempts WHERE puzzle = ?1 AND tag = ?2",
                params![category.puzzle.as_str(), category.tag],
            )?;
            tx.execute(
                "DELETE FROM stats_snapshots WHERE puzzle = ?1 AND tag = ?2",
                params![category.puzzle.as_str(), category.tag],
            )?;
            tx.execute(
                "DELETE FROM tags WHERE puzzle = ?1 AND name = ?2",
                params![category.puzzle.as_str(), category.tag],
            )?;
            tx.commit()?;
            Ok(removed as u64)
        })
        .await
    }
}
