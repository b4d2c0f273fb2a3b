// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal progress updater.
//!
//! Handles the core workflow when a pickup is marked collected:
//! 1. Serialize on the pickup owner (per-user lock)
//! 2. Re-read the pickup and validate the status transition
//! 3. Apply the collected waste to every active score of the owner
//! 4. Emit a notification for every goal completed
//! 5. Commit pickup, scores and notifications in one atomic write

use crate::db::{collections, Database, Write};
use crate::error::{AppError, Result};
use crate::models::{
    CollectedWaste, Collection, CollectionStatus, Goal, Notification, NotificationKind,
    ProgressOutcome, Score, ScoreStatus,
};
use crate::services::expiration::{load_goals, load_user_scores};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-user locks serializing score updates within this instance.
pub type ProgressLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Credits collected pickups toward users' goals.
#[derive(Clone)]
pub struct ProgressService {
    db: Database,
    locks: ProgressLocks,
}

/// Holds one user's lock; drops the map entry once nobody else wants it.
struct UserLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own clone, so a count of one means only the map is left
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Effect of a pickup on one score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreUpdate {
    pub goal_id: String,
    pub outcome: &'static str,
    pub status: ScoreStatus,
    pub points_earned: u32,
}

/// Result of marking a pickup collected.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub collection: Collection,
    pub score_updates: Vec<ScoreUpdate>,
    /// Points awarded by goals completed with this pickup
    pub points_awarded: u32,
}

fn outcome_label(outcome: ProgressOutcome) -> &'static str {
    use crate::models::SkipReason;
    match outcome {
        ProgressOutcome::Skipped(SkipReason::NotActive) => "not_active",
        ProgressOutcome::Skipped(SkipReason::AlreadyApplied) => "already_applied",
        ProgressOutcome::Skipped(SkipReason::NotStarted) => "not_started",
        ProgressOutcome::Skipped(SkipReason::NoMatch) => "no_match",
        ProgressOutcome::Expired => "expired",
        ProgressOutcome::Progressed => "progressed",
        ProgressOutcome::Completed { .. } => "completed",
    }
}

/// Apply one collected pickup to a user's scores in memory.
///
/// Returns the per-score updates and the writes needed to persist them
/// (changed scores plus one notification per completed goal). Scores whose
/// goal no longer exists are left untouched.
pub fn apply_to_scores(
    collection: &Collection,
    scores: &mut [Score],
    goals: &HashMap<String, Goal>,
    now: DateTime<Utc>,
) -> Result<(Vec<ScoreUpdate>, Vec<Write>, u32)> {
    let mut updates = Vec::new();
    let mut writes = Vec::new();
    let mut points_awarded = 0;

    for score in scores.iter_mut() {
        let Some(goal) = goals.get(&score.goal_id) else {
            tracing::warn!(
                score_id = %score.id,
                goal_id = %score.goal_id,
                "Score references a missing goal, skipping"
            );
            continue;
        };

        let outcome = score.apply_collection(goal, collection, now);

        if outcome.is_mutation() {
            writes.push(Write::set(collections::SCORES, score.id.clone(), &*score)?);
        }

        if let ProgressOutcome::Completed { points } = outcome {
            points_awarded += points;
            let notification = Notification::new(
                &score.user_id,
                NotificationKind::GoalCompleted,
                "Goal completed".to_string(),
                format!(
                    "You completed \"{}\" and earned {} points.",
                    goal.title, points
                ),
            );
            writes.push(Write::set(
                collections::NOTIFICATIONS,
                notification.id.clone(),
                &notification,
            )?);
        }

        updates.push(ScoreUpdate {
            goal_id: score.goal_id.clone(),
            outcome: outcome_label(outcome),
            status: score.status,
            points_earned: score.points_earned,
        });
    }

    Ok((updates, writes, points_awarded))
}

impl ProgressService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            locks: Arc::new(DashMap::new()),
        }
    }

    async fn lock_user(&self, user_id: &str) -> UserLock<'_> {
        let lock = self
            .locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        UserLock {
            locks: &self.locks,
            user_id: user_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// A user's scores with the expiration sweep applied, read under the
    /// user's lock so an expiry cannot overwrite a concurrent completion.
    pub async fn user_scores(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Score>, HashMap<String, Goal>)> {
        let _lock = self.lock_user(user_id).await;
        load_user_scores(&self.db, user_id, now).await
    }

    /// Remove every record of a user.
    ///
    /// Serialized with completions, so a pickup being collected either
    /// commits before the deletion or finds its document gone.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize> {
        let _lock = self.lock_user(user_id).await;
        self.db.delete_user_data(user_id).await
    }

    /// Confirm or cancel a pickup.
    ///
    /// Runs under the owner's lock so it cannot interleave with a completion.
    pub async fn set_status(
        &self,
        collection_id: &str,
        next: CollectionStatus,
    ) -> Result<Collection> {
        if next == CollectionStatus::Collected {
            return Err(AppError::BadRequest(
                "Use completion to mark a pickup collected".to_string(),
            ));
        }

        let owner = self
            .db
            .get_collection(collection_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection {} not found", collection_id)))?
            .user_id;

        let _lock = self.lock_user(&owner).await;

        let mut collection = self
            .db
            .get_collection(collection_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection {} not found", collection_id)))?;

        if !collection.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Cannot move collection from {} to {}",
                collection.status.as_str(),
                next.as_str()
            )));
        }

        collection.status = next;
        collection.updated_at = format_utc_rfc3339(Utc::now());
        self.db.upsert_collection(&collection).await?;

        Ok(collection)
    }

    /// Mark a pickup collected and credit its owner's active scores.
    ///
    /// `final_wastes` replaces the scheduled estimate with weighed amounts.
    pub async fn complete_collection(
        &self,
        collection_id: &str,
        collected_by: &str,
        final_wastes: Option<Vec<CollectedWaste>>,
    ) -> Result<CompletionReport> {
        let owner = self
            .db
            .get_collection(collection_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection {} not found", collection_id)))?
            .user_id;

        let _lock = self.lock_user(&owner).await;

        // Re-read under the lock; another request may have collected it meanwhile.
        let mut collection = self
            .db
            .get_collection(collection_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection {} not found", collection_id)))?;

        if collection.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Collection {} is already {}",
                collection_id,
                collection.status.as_str()
            )));
        }
        if !collection.status.can_transition_to(CollectionStatus::Collected) {
            return Err(AppError::Conflict(format!(
                "Collection {} must be confirmed before it is collected",
                collection_id
            )));
        }

        let now = Utc::now();
        let stamp = format_utc_rfc3339(now);
        if let Some(wastes) = final_wastes {
            collection.wastes = wastes;
        }
        collection.status = CollectionStatus::Collected;
        collection.collected_at = Some(stamp.clone());
        collection.collected_by = Some(collected_by.to_string());
        collection.updated_at = stamp;

        let mut scores = self.db.scores_for_user(&collection.user_id).await?;
        scores.retain(Score::is_active);
        let goals = load_goals(&self.db, scores.iter().map(|s| s.goal_id.as_str())).await?;

        let (score_updates, mut writes, points_awarded) =
            apply_to_scores(&collection, &mut scores, &goals, now)?;
        writes.push(Write::set(
            collections::COLLECTIONS,
            collection.id.clone(),
            &collection,
        )?);

        self.db.commit(&writes).await?;

        tracing::info!(
            collection_id = %collection.id,
            user_id = %collection.user_id,
            collected_by,
            scores_updated = score_updates.len(),
            documents_written = writes.len(),
            points_awarded,
            "Collection marked collected"
        );

        Ok(CompletionReport {
            collection,
            score_updates,
            points_awarded,
        })
    }
}
