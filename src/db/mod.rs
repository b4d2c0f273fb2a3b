//! Database layer (document store).
//!
//! `Database` exposes typed operations; the backend is either Firestore or a
//! process-local store with the same semantics.

pub mod database;
pub mod firestore;
pub mod memory;

pub use database::Database;

use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const WASTE_TYPES: &str = "waste_types";
    pub const ECO_POINTS: &str = "eco_points";
    pub const GOALS: &str = "goals";
    /// Scores keyed by `{user_id}_{goal_id}`
    pub const SCORES: &str = "scores";
    pub const COLLECTIONS: &str = "collections";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const POSTS: &str = "posts";
}

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
pub const BATCH_SIZE: usize = 400;

/// One document write in an atomic commit.
#[derive(Debug, Clone)]
pub enum Write {
    Set {
        collection: &'static str,
        id: String,
        doc: Value,
    },
    Delete {
        collection: &'static str,
        id: String,
    },
}

impl Write {
    pub fn set<T: Serialize>(
        collection: &'static str,
        id: impl Into<String>,
        doc: &T,
    ) -> Result<Self, AppError> {
        Ok(Write::Set {
            collection,
            id: id.into(),
            doc: serde_json::to_value(doc)?,
        })
    }

    pub fn delete(collection: &'static str, id: impl Into<String>) -> Self {
        Write::Delete {
            collection,
            id: id.into(),
        }
    }
}
