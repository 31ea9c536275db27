use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use chrono::SubsecRound;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    db::Database,
    models::{Attempt, CategoryKey},
    stats::{self, Average, StatisticsSnapshot, WindowSize},
};

use super::{AttemptEdit, ChangeCause, SnapshotChanged};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const EVENT_CAPACITY: usize = 64;

/// `None` until the category is first touched.
type Slot = Arc<Mutex<Option<StatisticsSnapshot>>>;

/// Keeps every category's statistics in step with the attempt store.
///
/// Mutations of one category are serialized by that category's slot lock, held
/// across the store round trip. Categories never block each other.
#[derive(Clone)]
pub struct StatsTracker {
    db: Database,
    slots: Arc<Mutex<HashMap<CategoryKey, Slot>>>,
    events: broadcast::Sender<SnapshotChanged>,
}

impl StatsTracker {
    pub fn new(db: Database) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            db,
            slots: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotChanged> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self, category: &CategoryKey) -> Result<StatisticsSnapshot> {
        let mut guard = self.lock_slot(category).await;
        let snapshot = self.ensure_loaded(category, &mut guard).await?;
        Ok(snapshot.clone())
    }

    /// Persists a finished attempt and folds it into its category. Assigns an id
    /// when missing and truncates the timestamp to what the store keeps.
    pub async fn record_attempt(&self, mut attempt: Attempt) -> Result<Attempt> {
        if !attempt.is_persisted() {
            attempt.id = Uuid::new_v4().to_string();
        }
        attempt.timestamp = attempt.timestamp.trunc_subsecs(3);

        let category = attempt.category.clone();
        let mut guard = self.lock_slot(&category).await;
        let snapshot = self.ensure_loaded(&category, &mut guard).await?;
        snapshot
            .validate_insert(&attempt)
            .with_context(|| format!("cannot record attempt in {category}"))?;

        self.db.insert_attempt(&attempt).await?;

        if let Err(err) = snapshot.insert(&attempt) {
            log_error!("insert into {} failed after store write: {}", category, err);
            *snapshot = self.rebuild(&category).await?;
        }
        self.persist_and_publish(snapshot, ChangeCause::Inserted).await;

        Ok(attempt)
    }

    /// Rewrites outcome, duration, scramble or comment of a stored attempt.
    pub async fn edit_attempt(&self, attempt_id: &str, edit: AttemptEdit) -> Result<Attempt> {
        let category = self.category_of(attempt_id).await?;
        let mut guard = self.lock_slot(&category).await;

        // re-read under the lock, a concurrent edit may have landed in between
        let old = self
            .db
            .get_attempt(attempt_id)
            .await?
            .ok_or_else(|| anyhow!("attempt {attempt_id} not found"))?;
        let new = edit.apply(&old);
        if new == old {
            return Ok(old);
        }

        let snapshot = self.ensure_loaded(&category, &mut guard).await?;
        snapshot
            .validate_update(&old, &new)
            .with_context(|| format!("cannot edit attempt {attempt_id}"))?;

        self.db.update_attempt(&new).await?;

        if let Err(err) = snapshot.update(&old, &new) {
            log_error!("update of {} failed after store write: {}", attempt_id, err);
            *snapshot = self.rebuild(&category).await?;
        }
        self.settle(snapshot).await?;
        self.persist_and_publish(snapshot, ChangeCause::Updated).await;

        Ok(new)
    }

    /// Returns the removed attempt, or `None` if the id was unknown.
    pub async fn delete_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>> {
        let category = match self.db.get_attempt(attempt_id).await? {
            Some(attempt) => attempt.category,
            None => return Ok(None),
        };
        let mut guard = self.lock_slot(&category).await;
        let snapshot = self.ensure_loaded(&category, &mut guard).await?;

        let removed = match self.db.delete_attempt(attempt_id).await? {
            Some(removed) => removed,
            None => return Ok(None),
        };

        self.absorb_deletes(snapshot, &[removed.clone()]).await?;
        self.persist_and_publish(snapshot, ChangeCause::Deleted).await;

        Ok(Some(removed))
    }

    /// Deletes a batch in one store transaction. Ids may span categories; unknown
    /// ids are ignored.
    pub async fn delete_attempts(&self, attempt_ids: &[String]) -> Result<Vec<Attempt>> {
        let mut categories = Vec::new();
        for attempt_id in attempt_ids {
            if let Some(attempt) = self.db.get_attempt(attempt_id).await? {
                categories.push(attempt.category);
            }
        }
        categories.sort();
        categories.dedup();

        // sorted order, so two batches never wait on each other crosswise
        let mut guards: BTreeMap<CategoryKey, OwnedMutexGuard<Option<StatisticsSnapshot>>> =
            BTreeMap::new();
        for category in categories {
            let slot = self.slot(&category).await;
            guards.insert(category, slot.lock_owned().await);
        }

        for (category, guard) in guards.iter_mut() {
            self.ensure_loaded(category, guard).await?;
        }

        let removed = self.db.delete_attempts(attempt_ids).await?;

        for (category, guard) in guards.iter_mut() {
            let batch: Vec<Attempt> = removed
                .iter()
                .filter(|attempt| &attempt.category == category)
                .cloned()
                .collect();
            if batch.is_empty() {
                continue;
            }
            let snapshot = self.ensure_loaded(category, guard).await?;
            self.absorb_deletes(snapshot, &batch).await?;
            self.persist_and_publish(snapshot, ChangeCause::Deleted).await;
        }

        Ok(removed)
    }

    /// Throws away the maintained statistics and recomputes from the full history.
    pub async fn repair(&self, category: &CategoryKey) -> Result<StatisticsSnapshot> {
        let mut guard = self.lock_slot(category).await;
        let snapshot = guard.insert(self.rebuild(category).await?);
        self.persist_and_publish(snapshot, ChangeCause::Repaired).await;
        Ok(snapshot.clone())
    }

    /// AoN after every attempt of the category, oldest first.
    pub async fn moving_averages(&self, category: &CategoryKey, size: WindowSize) -> Result<Vec<Average>> {
        let history = self.db.list_attempts(category).await?;
        Ok(stats::moving_averages(&history, size))
    }

    /// Removes a tag with all its attempts. The default tag is refused.
    pub async fn remove_tag(&self, category: &CategoryKey) -> Result<u64> {
        let mut guard = self.lock_slot(category).await;
        let removed = self.db.remove_tag(category).await?;
        let snapshot = guard.insert(StatisticsSnapshot::empty(category.clone()));
        log_info!("removed tag {} with {} attempts", category, removed);
        self.publish(snapshot, ChangeCause::TagRemoved);
        Ok(removed)
    }

    async fn slot(&self, category: &CategoryKey) -> Slot {
        let mut slots = self.slots.lock().await;
        slots
            .entry(category.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    async fn lock_slot(&self, category: &CategoryKey) -> OwnedMutexGuard<Option<StatisticsSnapshot>> {
        self.slot(category).await.lock_owned().await
    }

    async fn category_of(&self, attempt_id: &str) -> Result<CategoryKey> {
        self.db
            .get_attempt(attempt_id)
            .await?
            .map(|attempt| attempt.category)
            .ok_or_else(|| anyhow!("attempt {attempt_id} not found"))
    }

    async fn ensure_loaded<'a>(
        &self,
        category: &CategoryKey,
        slot: &'a mut Option<StatisticsSnapshot>,
    ) -> Result<&'a mut StatisticsSnapshot> {
        let snapshot = match slot.take() {
            Some(snapshot) if !snapshot.needs_recompute() => snapshot,
            _ => self.load_or_rebuild(category).await?,
        };
        Ok(slot.insert(snapshot))
    }

    /// Trusts a stored snapshot only while its counts still match the store.
    async fn load_or_rebuild(&self, category: &CategoryKey) -> Result<StatisticsSnapshot> {
        let counts = self.db.count_attempts(category).await?;
        let stored = match self.db.load_snapshot(category).await {
            Ok(stored) => stored,
            Err(err) => {
                log_warn!("ignoring unreadable statistics for {}: {:#}", category, err);
                None
            }
        };

        if let Some(snapshot) = stored {
            if snapshot.category() == category
                && !snapshot.needs_recompute()
                && snapshot.count() == counts.total
                && snapshot.valid_count() == counts.valid
            {
                log_debug!("reusing stored statistics for {}", category);
                return Ok(snapshot);
            }
            log_warn!(
                "stored statistics for {} are stale ({} attempts stored, {} counted)",
                category,
                snapshot.count(),
                counts.total
            );
        }

        self.rebuild(category).await
    }

    async fn rebuild(&self, category: &CategoryKey) -> Result<StatisticsSnapshot> {
        let history = self.db.list_attempts(category).await?;
        let snapshot = stats::recompute(category.clone(), &history)
            .with_context(|| format!("failed to recompute statistics for {category}"))?;
        log_info!("recomputed {} from {} attempts", category, history.len());
        Ok(snapshot)
    }

    /// Applies already-persisted deletes.
    async fn absorb_deletes(&self, snapshot: &mut StatisticsSnapshot, removed: &[Attempt]) -> Result<()> {
        let category = snapshot.category().clone();
        for attempt in removed {
            if let Err(err) = snapshot.delete(attempt) {
                log_error!("delete of {} failed after store write: {}", attempt.id, err);
                *snapshot = self.rebuild(&category).await?;
                return Ok(());
            }
        }
        self.settle(snapshot).await
    }

    /// Recomputes a snapshot whose change reached beyond its retained attempts.
    /// On failure the stored copy is dropped so no later load trusts it.
    async fn settle(&self, snapshot: &mut StatisticsSnapshot) -> Result<()> {
        if !snapshot.needs_recompute() {
            return Ok(());
        }
        let category = snapshot.category().clone();
        log_debug!("{} changed outside its recent attempts, recomputing", category);
        match self.rebuild(&category).await {
            Ok(rebuilt) => {
                *snapshot = rebuilt;
                Ok(())
            }
            Err(err) => {
                if let Err(delete_err) = self.db.delete_snapshot(&category).await {
                    log_warn!("failed to drop stored statistics for {}: {:#}", category, delete_err);
                }
                Err(err)
            }
        }
    }

    async fn persist_and_publish(&self, snapshot: &StatisticsSnapshot, cause: ChangeCause) {
        // a stale stored copy is detected by its counts on the next load
        if let Err(err) = self.db.save_snapshot(snapshot).await {
            log_warn!("failed to store statistics for {}: {:#}", snapshot.category(), err);
        }
        self.publish(snapshot, cause);
    }

    fn publish(&self, snapshot: &StatisticsSnapshot, cause: ChangeCause) {
        log_debug!("{} {}: {} attempts", snapshot.category(), cause.as_str(), snapshot.count());
        let event = SnapshotChanged {
            category: snapshot.category().clone(),
            cause,
            snapshot: snapshot.clone(),
        };
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
