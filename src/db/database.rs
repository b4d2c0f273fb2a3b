// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed document operations.
//!
//! Provides high-level operations for:
//! - Users (profiles)
//! - Waste types and eco-points (catalog)
//! - Goals and scores (gamification)
//! - Collections (scheduled pickups)
//! - Notifications
//! - Posts (community feed)

use crate::config::{Config, StorageBackend};
use crate::db::firestore::FirestoreBackend;
use crate::db::memory::MemoryBackend;
use crate::db::{collections, Write, BATCH_SIZE};
use crate::error::AppError;
use crate::models::{
    Collection, EcoPoint, Goal, Notification, Post, Score, ScoreStatus, User, WasteType,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreBackend),
    Memory(Arc<MemoryBackend>),
}

/// Document database handle shared by all handlers.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

fn decode<T: DeserializeOwned>(doc: Value) -> Result<T, AppError> {
    Ok(serde_json::from_value(doc)?)
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>, AppError> {
    docs.into_iter().map(decode).collect()
}

impl Database {
    /// Connect to the backend selected in `config`.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.storage_backend {
            StorageBackend::Firestore => Self::firestore(&config.gcp_project_id).await,
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory document store; data is lost on restart");
                Ok(Self::in_memory())
            }
        }
    }

    pub async fn firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreBackend::connect(project_id).await?),
        })
    }

    /// Empty process-local store (local development and tests).
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryBackend::new())),
        }
    }

    // ─── Raw Document Access ─────────────────────────────────────

    async fn get_doc<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        let doc = match &self.backend {
            Backend::Firestore(fs) => fs.get(collection, id).await?,
            Backend::Memory(mem) => mem.get(collection, id).await?,
        };
        doc.map(decode).transpose()
    }

    async fn set_doc<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let doc = serde_json::to_value(doc)?;
        match &self.backend {
            Backend::Firestore(fs) => fs.set(collection, id, &doc).await,
            Backend::Memory(mem) => mem.set(collection, id, &doc).await,
        }
    }

    async fn create_doc<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let doc = serde_json::to_value(doc)?;
        match &self.backend {
            Backend::Firestore(fs) => fs.create(collection, id, &doc).await,
            Backend::Memory(mem) => mem.create(collection, id, &doc).await,
        }
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.delete(collection, id).await,
            Backend::Memory(mem) => mem.delete(collection, id).await,
        }
    }

    async fn list_docs<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, AppError> {
        let docs = match &self.backend {
            Backend::Firestore(fs) => fs.list(collection).await?,
            Backend::Memory(mem) => mem.list(collection).await?,
        };
        decode_all(docs)
    }

    async fn find_docs<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError> {
        let docs = match &self.backend {
            Backend::Firestore(fs) => fs.find_by(collection, field, value).await?,
            Backend::Memory(mem) => mem.find_by(collection, field, value).await?,
        };
        decode_all(docs)
    }

    /// Apply all writes atomically.
    pub async fn commit(&self, writes: &[Write]) -> Result<(), AppError> {
        if writes.is_empty() {
            return Ok(());
        }
        match &self.backend {
            Backend::Firestore(fs) => fs.commit(writes).await,
            Backend::Memory(mem) => mem.commit(writes).await,
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, user_id).await
    }

    /// Register a new user; `Conflict` if the profile already exists.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.create_doc(collections::USERS, &user.id, user).await
    }

    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &user.id, user).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.list_docs(collections::USERS).await
    }

    pub async fn list_users_with_role(&self, role: &str) -> Result<Vec<User>, AppError> {
        self.find_docs(collections::USERS, "role", role).await
    }

    // ─── Catalog Operations ──────────────────────────────────────

    pub async fn get_waste_type(&self, id: &str) -> Result<Option<WasteType>, AppError> {
        self.get_doc(collections::WASTE_TYPES, id).await
    }

    pub async fn list_waste_types(&self) -> Result<Vec<WasteType>, AppError> {
        self.list_docs(collections::WASTE_TYPES).await
    }

    pub async fn create_waste_type(&self, waste_type: &WasteType) -> Result<(), AppError> {
        self.create_doc(collections::WASTE_TYPES, &waste_type.id, waste_type)
            .await
    }

    pub async fn delete_waste_type(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::WASTE_TYPES, id).await
    }

    pub async fn get_eco_point(&self, id: &str) -> Result<Option<EcoPoint>, AppError> {
        self.get_doc(collections::ECO_POINTS, id).await
    }

    pub async fn list_eco_points(&self) -> Result<Vec<EcoPoint>, AppError> {
        self.list_docs(collections::ECO_POINTS).await
    }

    pub async fn upsert_eco_point(&self, eco_point: &EcoPoint) -> Result<(), AppError> {
        self.set_doc(collections::ECO_POINTS, &eco_point.id, eco_point)
            .await
    }

    // ─── Goal Operations ─────────────────────────────────────────

    pub async fn get_goal(&self, id: &str) -> Result<Option<Goal>, AppError> {
        self.get_doc(collections::GOALS, id).await
    }

    pub async fn list_goals(&self) -> Result<Vec<Goal>, AppError> {
        self.list_docs(collections::GOALS).await
    }

    pub async fn upsert_goal(&self, goal: &Goal) -> Result<(), AppError> {
        self.set_doc(collections::GOALS, &goal.id, goal).await
    }

    /// Delete a goal together with its still-active scores.
    ///
    /// Completed scores are kept so earned points stay in the ranking.
    pub async fn delete_goal(&self, goal_id: &str) -> Result<usize, AppError> {
        let scores = self.scores_for_goal(goal_id).await?;
        let mut writes: Vec<Write> = scores
            .iter()
            .filter(|s| s.status != ScoreStatus::Completed)
            .map(|s| Write::delete(collections::SCORES, s.id.clone()))
            .collect();
        let removed_scores = writes.len();
        writes.push(Write::delete(collections::GOALS, goal_id));

        for chunk in writes.chunks(BATCH_SIZE) {
            self.commit(chunk).await?;
        }
        Ok(removed_scores)
    }

    // ─── Score Operations ────────────────────────────────────────

    pub async fn get_score(&self, user_id: &str, goal_id: &str) -> Result<Option<Score>, AppError> {
        self.get_doc(collections::SCORES, &Score::document_id(user_id, goal_id))
            .await
    }

    /// Create a score; `Conflict` if the user already joined the goal.
    pub async fn create_score(&self, score: &Score) -> Result<(), AppError> {
        self.create_doc(collections::SCORES, &score.id, score).await
    }

    pub async fn upsert_score(&self, score: &Score) -> Result<(), AppError> {
        self.set_doc(collections::SCORES, &score.id, score).await
    }

    pub async fn scores_for_user(&self, user_id: &str) -> Result<Vec<Score>, AppError> {
        self.find_docs(collections::SCORES, "user_id", user_id).await
    }

    pub async fn scores_for_goal(&self, goal_id: &str) -> Result<Vec<Score>, AppError> {
        self.find_docs(collections::SCORES, "goal_id", goal_id).await
    }

    pub async fn completed_scores(&self) -> Result<Vec<Score>, AppError> {
        self.find_docs(
            collections::SCORES,
            "status",
            ScoreStatus::Completed.as_str(),
        )
        .await
    }

    // ─── Collection Operations ───────────────────────────────────

    pub async fn get_collection(&self, id: &str) -> Result<Option<Collection>, AppError> {
        self.get_doc(collections::COLLECTIONS, id).await
    }

    pub async fn create_collection(&self, collection: &Collection) -> Result<(), AppError> {
        self.create_doc(collections::COLLECTIONS, &collection.id, collection)
            .await
    }

    pub async fn upsert_collection(&self, collection: &Collection) -> Result<(), AppError> {
        self.set_doc(collections::COLLECTIONS, &collection.id, collection)
            .await
    }

    pub async fn collections_for_user(&self, user_id: &str) -> Result<Vec<Collection>, AppError> {
        self.find_docs(collections::COLLECTIONS, "user_id", user_id)
            .await
    }

    pub async fn collections_for_eco_point(
        &self,
        eco_point_id: &str,
    ) -> Result<Vec<Collection>, AppError> {
        self.find_docs(collections::COLLECTIONS, "eco_point_id", eco_point_id)
            .await
    }

    // ─── Notification Operations ─────────────────────────────────

    pub async fn get_notification(&self, id: &str) -> Result<Option<Notification>, AppError> {
        self.get_doc(collections::NOTIFICATIONS, id).await
    }

    pub async fn upsert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.set_doc(collections::NOTIFICATIONS, &notification.id, notification)
            .await
    }

    pub async fn notifications_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, AppError> {
        self.find_docs(collections::NOTIFICATIONS, "user_id", user_id)
            .await
    }

    // ─── Post Operations ─────────────────────────────────────────

    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        self.get_doc(collections::POSTS, id).await
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        self.list_docs(collections::POSTS).await
    }

    pub async fn create_post(&self, post: &Post) -> Result<(), AppError> {
        self.create_doc(collections::POSTS, &post.id, post).await
    }

    pub async fn upsert_post(&self, post: &Post) -> Result<(), AppError> {
        self.set_doc(collections::POSTS, &post.id, post).await
    }

    pub async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::POSTS, id).await
    }

    pub async fn posts_by_author(&self, author_id: &str) -> Result<Vec<Post>, AppError> {
        self.find_docs(collections::POSTS, "author_id", author_id)
            .await
    }

    // ─── User Data Deletion ──────────────────────────────────────

    /// Delete ALL data for a user.
    ///
    /// Removes scores, collections, notifications, posts and the profile.
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut writes = Vec::new();

        let scores = self.scores_for_user(user_id).await?;
        writes.extend(
            scores
                .iter()
                .map(|s| Write::delete(collections::SCORES, s.id.clone())),
        );

        let pickups = self.collections_for_user(user_id).await?;
        writes.extend(
            pickups
                .iter()
                .map(|c| Write::delete(collections::COLLECTIONS, c.id.clone())),
        );

        let notifications = self.notifications_for_user(user_id).await?;
        writes.extend(
            notifications
                .iter()
                .map(|n| Write::delete(collections::NOTIFICATIONS, n.id.clone())),
        );

        let posts = self.posts_by_author(user_id).await?;
        writes.extend(
            posts
                .iter()
                .map(|p| Write::delete(collections::POSTS, p.id.clone())),
        );

        writes.push(Write::delete(collections::USERS, user_id));

        let deleted_count = writes.len();
        for chunk in writes.chunks(BATCH_SIZE) {
            self.commit(chunk).await?;
        }

        tracing::info!(
            user_id,
            scores = scores.len(),
            collections = pickups.len(),
            notifications = notifications.len(),
            posts = posts.len(),
            deleted_count,
            "User data deletion complete"
        );

        Ok(deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::goal::fixtures::{at, challenge, goal};
    use crate::models::TargetType;

    #[tokio::test]
    async fn test_score_unique_per_user_and_goal() {
        let db = Database::in_memory();
        let goal = goal(Some(10.0), vec![challenge("plastic", 10.0, TargetType::Weight)]);
        let score = Score::new("user-1", &goal, at(2));

        db.create_score(&score).await.unwrap();
        let err = db.create_score(&score).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let fetched = db.get_score("user-1", &goal.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, "user-1_goal-1");
        assert_eq!(fetched.progress, score.progress);
    }

    #[tokio::test]
    async fn test_delete_goal_keeps_completed_scores() {
        let db = Database::in_memory();
        let goal = goal(Some(10.0), vec![challenge("plastic", 10.0, TargetType::Weight)]);
        db.upsert_goal(&goal).await.unwrap();

        let active = Score::new("user-1", &goal, at(2));
        let mut completed = Score::new("user-2", &goal, at(2));
        completed.status = ScoreStatus::Completed;
        completed.points_earned = goal.points;
        db.upsert_score(&active).await.unwrap();
        db.upsert_score(&completed).await.unwrap();

        let removed = db.delete_goal(&goal.id).await.unwrap();

        assert_eq!(removed, 1);
        assert!(db.get_goal(&goal.id).await.unwrap().is_none());
        assert!(db.get_score("user-1", &goal.id).await.unwrap().is_none());
        assert_eq!(db.completed_scores().await.unwrap().len(), 1);
    }
}
