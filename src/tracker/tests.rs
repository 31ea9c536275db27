use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::db::Database;
use crate::models::{Attempt, CategoryKey, Outcome, PuzzleType, DEFAULT_TAG};
use crate::stats::{recompute, Average, WindowSize};

fn category() -> CategoryKey {
    CategoryKey::new(PuzzleType::Cube3x3, DEFAULT_TAG)
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap()
}

fn solve(raw: u64, offset_secs: i64) -> Attempt {
    Attempt::new(category(), raw, start() + Duration::seconds(offset_secs))
}

fn tracker() -> StatsTracker {
    StatsTracker::new(Database::open_in_memory().unwrap())
}

async fn record_all(tracker: &StatsTracker, raws: &[u64]) -> Vec<Attempt> {
    let mut recorded = Vec::new();
    for (i, raw) in raws.iter().enumerate() {
        recorded.push(tracker.record_attempt(solve(*raw, i as i64)).await.unwrap());
    }
    recorded
}

#[tokio::test]
async fn recording_assigns_ids_and_updates_statistics() {
    let tracker = tracker();
    let recorded = record_all(&tracker, &[10_000, 11_000, 9_000, 12_000, 10_500]).await;

    assert!(recorded.iter().all(Attempt::is_persisted));
    let snapshot = tracker.snapshot(&category()).await.unwrap();
    assert_eq!(snapshot.count(), 5);
    assert_eq!(snapshot.best(), 9_000);
    assert_eq!(snapshot.latest_average(WindowSize::Ao5), Average::Millis(10_500.0));
}

#[tokio::test]
async fn timestamps_are_truncated_to_milliseconds() {
    let tracker = tracker();
    let precise = start() + Duration::nanoseconds(1_234_567);
    let recorded = tracker
        .record_attempt(Attempt::new(category(), 10_000, precise))
        .await
        .unwrap();
    assert_eq!(recorded.timestamp, start() + Duration::milliseconds(1));

    let stored = tracker.database().get_attempt(&recorded.id).await.unwrap();
    assert_eq!(stored, Some(recorded));
}

#[tokio::test]
async fn rejected_attempt_never_reaches_the_store() {
    let tracker = tracker();
    record_all(&tracker, &[10_000]).await;

    let stale = Attempt::new(category(), 8_000, start() - Duration::hours(1));
    assert!(tracker.record_attempt(stale).await.is_err());
    let too_long = solve(86_400_001, 10);
    assert!(tracker.record_attempt(too_long).await.is_err());

    assert_eq!(tracker.database().count_attempts(&category()).await.unwrap().total, 1);
    assert_eq!(tracker.snapshot(&category()).await.unwrap().count(), 1);
}

#[tokio::test]
async fn edits_follow_penalty_rules() {
    let tracker = tracker();
    let recorded = record_all(&tracker, &[8_000]).await;
    let id = recorded[0].id.clone();

    let penalized = tracker
        .edit_attempt(&id, AttemptEdit::outcome(Outcome::PlusTwo))
        .await
        .unwrap();
    assert_eq!(penalized.raw_duration_ms, 8_000);
    assert_eq!(tracker.snapshot(&category()).await.unwrap().best(), 10_000);

    tracker
        .edit_attempt(&id, AttemptEdit::outcome(Outcome::Ok))
        .await
        .unwrap();
    assert_eq!(tracker.snapshot(&category()).await.unwrap().best(), 8_000);

    assert!(tracker.edit_attempt("missing", AttemptEdit::comment("x")).await.is_err());
}

#[tokio::test]
async fn delete_refills_the_recent_window() {
    let tracker = tracker();
    let raws = vec![10_000; 101];
    let recorded = record_all(&tracker, &raws).await;

    let removed = tracker.delete_attempt(&recorded[100].id).await.unwrap();
    assert_eq!(removed.as_ref().map(|a| a.id.as_str()), Some(recorded[100].id.as_str()));

    let snapshot = tracker.snapshot(&category()).await.unwrap();
    assert_eq!(snapshot.count(), 100);
    assert_eq!(snapshot.recent().len(), 100);
    assert_eq!(snapshot.latest_average(WindowSize::Ao100), Average::Millis(10_000.0));
    assert!(!snapshot.needs_recompute());

    assert_eq!(tracker.delete_attempt(&recorded[100].id).await.unwrap(), None);
}

/// Five fast solves, then enough slow ones to push them out of the recent window.
async fn record_evicting_history(tracker: &StatsTracker) -> Vec<Attempt> {
    let mut raws = vec![4_000, 5_000, 6_000, 7_000, 8_000];
    raws.extend(std::iter::repeat(20_000).take(100));
    record_all(tracker, &raws).await
}

#[tokio::test]
async fn deleting_an_evicted_attempt_revises_best_average() {
    let db = Database::open_in_memory().unwrap();
    let tracker = StatsTracker::new(db.clone());
    let mut recorded = record_evicting_history(&tracker).await;
    let before = tracker.snapshot(&category()).await.unwrap();
    assert_eq!(before.best_average(WindowSize::Ao5), Average::Millis(6_000.0));

    tracker.delete_attempt(&recorded[2].id).await.unwrap();
    recorded.remove(2);
    let expected = recompute(category(), &recorded).unwrap();
    // [4000, 5000, 7000, 8000, 20000] keeps [5000, 7000, 8000]
    assert_eq!(expected.best_average(WindowSize::Ao5), Average::Millis(20_000.0 / 3.0));

    let live = tracker.snapshot(&category()).await.unwrap();
    assert_eq!(live, expected);

    let reopened = StatsTracker::new(db);
    assert_eq!(reopened.snapshot(&category()).await.unwrap(), expected);
}

#[tokio::test]
async fn editing_an_evicted_attempt_revises_best_average() {
    let db = Database::open_in_memory().unwrap();
    let tracker = StatsTracker::new(db.clone());
    let mut recorded = record_evicting_history(&tracker).await;

    let voided = tracker
        .edit_attempt(&recorded[2].id, AttemptEdit::outcome(Outcome::Dnf))
        .await
        .unwrap();
    recorded[2] = voided;
    let expected = recompute(category(), &recorded).unwrap();
    assert_eq!(expected.best_average(WindowSize::Ao5), Average::Millis(20_000.0 / 3.0));
    assert_eq!(tracker.snapshot(&category()).await.unwrap(), expected);

    let reopened = StatsTracker::new(db);
    assert_eq!(reopened.snapshot(&category()).await.unwrap(), expected);

    // comment edits leave the statistics alone
    let annotated = tracker
        .edit_attempt(&recorded[1].id, AttemptEdit::comment("warm-up"))
        .await
        .unwrap();
    recorded[1] = annotated;
    assert_eq!(
        tracker.snapshot(&category()).await.unwrap(),
        recompute(category(), &recorded).unwrap()
    );
}

#[tokio::test]
async fn batch_delete_across_categories() {
    let tracker = tracker();
    let cube = record_all(&tracker, &[10_000, 11_000, 12_000]).await;
    let skewb = tracker
        .record_attempt(Attempt::new(
            CategoryKey::new(PuzzleType::Skewb, DEFAULT_TAG),
            4_000,
            start(),
        ))
        .await
        .unwrap();

    let removed = tracker
        .delete_attempts(&[cube[0].id.clone(), skewb.id.clone(), "nope".to_string()])
        .await
        .unwrap();
    assert_eq!(removed.len(), 2);

    let snapshot = tracker.snapshot(&category()).await.unwrap();
    assert_eq!(snapshot.count(), 2);
    assert_eq!(snapshot.best(), 11_000);
    let skewb_stats = tracker.snapshot(&skewb.category).await.unwrap();
    assert_eq!(skewb_stats.count(), 0);
    assert_eq!(skewb_stats.global_average(), None);
}

#[tokio::test]
async fn fresh_tracker_reuses_matching_stored_statistics() {
    let db = Database::open_in_memory().unwrap();
    let first = StatsTracker::new(db.clone());
    let recorded = record_all(&first, &[10_000, 11_000, 12_000, 13_000, 14_000]).await;
    let expected = first.snapshot(&category()).await.unwrap();

    let second = StatsTracker::new(db.clone());
    assert_eq!(second.snapshot(&category()).await.unwrap(), expected);

    // a write the trackers never saw makes the stored copy stale
    let mut extra = solve(9_000, 60);
    extra.id = "external".into();
    db.insert_attempt(&extra).await.unwrap();

    let third = StatsTracker::new(db);
    let mut history = recorded;
    history.push(extra);
    let expected = recompute(category(), &history).unwrap();
    assert_eq!(third.snapshot(&category()).await.unwrap(), expected);
}

#[tokio::test]
async fn repair_matches_full_recompute() {
    let tracker = tracker();
    let recorded = record_all(&tracker, &[10_000, 9_000, 15_000, 11_000, 12_000, 10_000]).await;
    tracker.delete_attempt(&recorded[1].id).await.unwrap();

    let maintained = tracker.snapshot(&category()).await.unwrap();
    let repaired = tracker.repair(&category()).await.unwrap();
    assert_eq!(repaired.count(), maintained.count());
    assert_eq!(repaired.best(), maintained.best());
    assert_eq!(
        repaired.latest_average(WindowSize::Ao5),
        maintained.latest_average(WindowSize::Ao5)
    );
}

#[tokio::test]
async fn moving_averages_cover_every_attempt() {
    let tracker = tracker();
    record_all(&tracker, &[10_000, 11_000, 9_000, 12_000, 10_500, 20_000]).await;

    let series = tracker
        .moving_averages(&category(), WindowSize::Ao5)
        .await
        .unwrap();
    assert_eq!(series.len(), 6);
    assert!(series[..4].iter().all(|avg| *avg == Average::NotEnoughData));
    assert_eq!(series[4], Average::Millis(10_500.0));
    // [11000, 9000, 12000, 10500, 20000] -> middle 10500, 11000, 12000
    assert_eq!(series[5], Average::Millis(33_500.0 / 3.0));
}

#[tokio::test]
async fn subscribers_see_each_change() {
    let tracker = tracker();
    let mut events = tracker.subscribe();

    let recorded = tracker.record_attempt(solve(10_000, 0)).await.unwrap();
    tracker
        .edit_attempt(&recorded.id, AttemptEdit::outcome(Outcome::Dnf))
        .await
        .unwrap();
    tracker.delete_attempt(&recorded.id).await.unwrap();

    let causes = [
        events.recv().await.unwrap(),
        events.recv().await.unwrap(),
        events.recv().await.unwrap(),
    ]
    .map(|event| event.cause);
    assert_eq!(causes, [ChangeCause::Inserted, ChangeCause::Updated, ChangeCause::Deleted]);
}

#[tokio::test]
async fn removing_a_tag_resets_its_statistics() {
    let tracker = tracker();
    let feet = CategoryKey::new(PuzzleType::Cube3x3, "feet");
    tracker
        .record_attempt(Attempt::new(feet.clone(), 60_000, start()))
        .await
        .unwrap();

    assert_eq!(tracker.remove_tag(&feet).await.unwrap(), 1);
    assert_eq!(tracker.snapshot(&feet).await.unwrap().count(), 0);
    assert!(tracker.remove_tag(&category()).await.is_err());
}
