use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_outcome, parse_puzzle, to_i64, to_u64},
    repositories::tags::ensure_tag,
};
use crate::models::{
    Attempt, CategoryKey, HistoryOrder, HistoryQuery, Outcome, PLUS_TWO_PENALTY_MS,
};

const ATTEMPT_COLUMNS: &str =
    "id, puzzle, tag, timestamp, raw_duration_ms, outcome, scramble, comment";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptCounts {
    pub total: u64,
    /// Attempts that are not DNF.
    pub valid: u64,
}

fn row_to_attempt(row: &Row) -> Result<Attempt> {
    let puzzle: String = row.get("puzzle")?;
    let timestamp: String = row.get("timestamp")?;
    let raw_duration_ms: i64 = row.get("raw_duration_ms")?;
    let outcome: String = row.get("outcome")?;

    Ok(Attempt {
        id: row.get("id")?,
        category: CategoryKey::new(parse_puzzle(&puzzle)?, row.get::<_, String>("tag")?),
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        raw_duration_ms: to_u64(raw_duration_ms, "raw_duration_ms")?,
        outcome: parse_outcome(&outcome)?,
        scramble: row.get("scramble")?,
        comment: row.get("comment")?,
    })
}

fn collect_attempts(conn: &Connection, sql: &str, category: &CategoryKey, limit: i64) -> Result<Vec<Attempt>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params![category.puzzle.as_str(), category.tag, limit])?;
    let mut attempts = Vec::new();
    while let Some(row) = rows.next()? {
        attempts.push(row_to_attempt(row)?);
    }
    Ok(attempts)
}

fn history_order_by(order: HistoryOrder) -> String {
    let effective = format!(
        "raw_duration_ms + CASE WHEN outcome = '{}' THEN {PLUS_TWO_PENALTY_MS} ELSE 0 END",
        Outcome::PlusTwo.as_str()
    );
    let dnf_last = format!("outcome = '{}' ASC", Outcome::Dnf.as_str());
    match order {
        HistoryOrder::DateDesc => "timestamp DESC, seq DESC".to_string(),
        HistoryOrder::DateAsc => "timestamp ASC, seq ASC".to_string(),
        HistoryOrder::TimeAsc => format!("{dnf_last}, {effective} ASC, timestamp DESC, seq DESC"),
        HistoryOrder::TimeDesc => format!("{dnf_last}, {effective} DESC, timestamp DESC, seq DESC"),
    }
}

fn select_attempt(conn: &Connection, attempt_id: &str) -> Result<Option<Attempt>> {
    let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![attempt_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_attempt(row)?)),
        None => Ok(None),
    }
}

impl Database {
    /// Stores a new attempt. The id must already be assigned; the attempt's tag is
    /// created on the fly.
    pub async fn insert_attempt(&self, attempt: &Attempt) -> Result<()> {
        if !attempt.is_persisted() {
            bail!("attempt has no id");
        }
        let record = attempt.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            ensure_tag(&tx, &record.category)?;
            tx.execute(
                "INSERT INTO attempts (id, puzzle, tag, timestamp, raw_duration_ms, outcome, scramble, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.category.puzzle.as_str(),
                    record.category.tag,
                    format_datetime(&record.timestamp),
                    to_i64(record.raw_duration_ms)?,
                    record.outcome.as_str(),
                    record.scramble,
                    record.comment,
                ],
            )
            .with_context(|| format!("failed to insert attempt {}", record.id))?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>> {
        let attempt_id = attempt_id.to_string();
        self.execute(move |conn| select_attempt(conn, &attempt_id)).await
    }

    /// Rewrites the mutable fields of a stored attempt. Category, id and timestamp
    /// are fixed once persisted.
    pub async fn update_attempt(&self, attempt: &Attempt) -> Result<()> {
        let record = attempt.clone();
        self.execute(move |conn| {
            let changed = conn.execute(
                "UPDATE attempts
                 SET raw_duration_ms = ?1,
                     outcome = ?2,
                     scramble = ?3,
                     comment = ?4
                 WHERE id = ?5",
                params![
                    to_i64(record.raw_duration_ms)?,
                    record.outcome.as_str(),
                    record.scramble,
                    record.comment,
                    record.id,
                ],
            )?;
            if changed == 0 {
                bail!("attempt {} not found", record.id);
            }
            Ok(())
        })
        .await
    }

    /// Deletes one attempt and hands back what was stored.
    pub async fn delete_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>> {
        let attempt_id = attempt_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let existing = select_attempt(&tx, &attempt_id)?;
            if existing.is_some() {
                tx.execute("DELETE FROM attempts WHERE id = ?1", params![attempt_id])?;
            }
            tx.commit()?;
            Ok(existing)
        })
        .await
    }

    /// Deletes every listed attempt in one transaction. Unknown ids are skipped.
    pub async fn delete_attempts(&self, attempt_ids: &[String]) -> Result<Vec<Attempt>> {
        let attempt_ids = attempt_ids.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = Vec::with_capacity(attempt_ids.len());
            for attempt_id in &attempt_ids {
                if let Some(existing) = select_attempt(&tx, attempt_id)? {
                    tx.execute("DELETE FROM attempts WHERE id = ?1", params![attempt_id])?;
                    removed.push(existing);
                }
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    /// Full history of a category, oldest first. Equal timestamps keep insertion order.
    pub async fn list_attempts(&self, category: &CategoryKey) -> Result<Vec<Attempt>> {
        let category = category.clone();
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE puzzle = ?1 AND tag = ?2
                 ORDER BY timestamp ASC, seq ASC
                 LIMIT ?3"
            );
            collect_attempts(conn, &sql, &category, -1)
        })
        .await
    }

    /// The `limit` most recent attempts of a category, newest first.
    pub async fn recent_attempts(&self, category: &CategoryKey, limit: usize) -> Result<Vec<Attempt>> {
        let category = category.clone();
        let limit = to_i64(limit as u64)?;
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE puzzle = ?1 AND tag = ?2
                 ORDER BY timestamp DESC, seq DESC
                 LIMIT ?3"
            );
            collect_attempts(conn, &sql, &category, limit)
        })
        .await
    }

    /// One page of a category's history, filtered by comment and ordered as asked.
    pub async fn history_page(&self, category: &CategoryKey, query: &HistoryQuery) -> Result<Vec<Attempt>> {
        let category = category.clone();
        let limit = to_i64(query.limit as u64)?;
        let offset = to_i64(query.offset as u64)?;
        let search = if query.search.trim().is_empty() {
            String::new()
        } else {
            query.search.clone()
        };
        let order_by = history_order_by(query.order);
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE puzzle = ?1 AND tag = ?2
                   AND (?3 = '' OR instr(lower(comment), lower(?3)) > 0)
                 ORDER BY {order_by}
                 LIMIT ?4 OFFSET ?5"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![
                category.puzzle.as_str(),
                category.tag,
                search,
                limit,
                offset
            ])?;
            let mut attempts = Vec::new();
            while let Some(row) = rows.next()? {
                attempts.push(row_to_attempt(row)?);
            }
            Ok(attempts)
        })
        .await
    }

    pub async fn count_attempts(&self, category: &CategoryKey) -> Result<AttemptCounts> {
        let category = category.clone();
        self.execute(move |conn| {
            let (total, valid): (i64, i64) = conn
                .query_row(
                    "SELECT COUNT(*), COALESCE(SUM(CASE WHEN outcome != ?3 THEN 1 ELSE 0 END), 0)
                     FROM attempts
                     WHERE puzzle = ?1 AND tag = ?2",
                    params![category.puzzle.as_str(), category.tag, Outcome::Dnf.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .unwrap_or((0, 0));
            Ok(AttemptCounts {
                total: to_u64(total, "total")?,
                valid: to_u64(valid, "valid")?,
            })
        })
        .await
    }
}
