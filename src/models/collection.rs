// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Pickup (collection) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a scheduled pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Scheduled,
    Confirmed,
    Collected,
    Cancelled,
}

impl CollectionStatus {
    /// Allowed moves: scheduled → confirmed → collected, and
    /// scheduled/confirmed → cancelled. A pickup must be confirmed by the
    /// eco-point before it can be collected.
    pub fn can_transition_to(self, next: CollectionStatus) -> bool {
        use CollectionStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Scheduled, Confirmed)
                | (Confirmed, Collected)
                | (Scheduled, Cancelled)
                | (Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CollectionStatus::Collected | CollectionStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionStatus::Scheduled => "scheduled",
            CollectionStatus::Confirmed => "confirmed",
            CollectionStatus::Collected => "collected",
            CollectionStatus::Cancelled => "cancelled",
        }
    }
}

/// One waste entry of a pickup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectedWaste {
    /// Waste type ID
    pub waste_type_id: String,
    /// Number of items/bags
    #[serde(default)]
    pub quantity: f64,
    /// Weight in kilograms
    #[serde(default)]
    pub weight: f64,
}

/// A pickup scheduled by a user at an eco-point.
///
/// Read-only input to score accounting once it reaches `Collected`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    /// Owner of the pickup
    pub user_id: String,
    pub eco_point_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub wastes: Vec<CollectedWaste>,
    pub status: CollectionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub collected_at: Option<String>,
    /// User ID of the responsible/admin who marked it collected
    #[serde(default)]
    pub collected_by: Option<String>,
}

impl Collection {
    /// Waste entries of the given type.
    pub fn wastes_of<'a>(
        &'a self,
        waste_type_id: &'a str,
    ) -> impl Iterator<Item = &'a CollectedWaste> + 'a {
        self.wastes
            .iter()
            .filter(move |w| w.waste_type_id == waste_type_id)
    }
}
