//! Community feed posts.

use serde::{Deserialize, Serialize};

/// A post on the shared feed (tips, eco-point news, event calls).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    /// Author's display name when the post was written
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    pub fn new(author_id: &str, author_name: String, title: String, content: String) -> Self {
        let now = crate::time_utils::now_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            author_name,
            title,
            content,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Authors may edit or remove their own posts.
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }
}
