//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Role granted by the identity provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular user scheduling pickups
    #[default]
    User,
    /// Eco-point operator confirming and collecting pickups
    Responsible,
    /// Administrator managing goals, waste types and notifications
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Responsible => "responsible",
            Role::Admin => "admin",
        }
    }
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity provider subject (also used as document ID)
    pub id: String,
    /// Display name shown in the ranking
    pub name: String,
    /// Contact email
    pub email: String,
    /// Role at registration time
    #[serde(default)]
    pub role: Role,
    /// When the profile was registered
    pub created_at: String,
    /// Last profile change
    pub updated_at: String,
}
