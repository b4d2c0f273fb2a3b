//! In-app notifications.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Emitted by score accounting when a goal is completed
    GoalCompleted,
    /// Sent by an administrator
    Announcement,
}

/// A notification record shown to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: String,
}

impl Notification {
    pub fn new(user_id: &str, kind: NotificationKind, title: String, message: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            title,
            message,
            read: false,
            created_at: crate::time_utils::now_rfc3339(),
        }
    }
}
