// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Recycling goals defined by administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::collection::CollectedWaste;
use crate::models::score::{ChallengeProgress, Progress};

/// What a target counts: kilograms or items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Weight,
    Quantity,
}

impl TargetType {
    /// Amount a waste entry contributes toward a target of this type.
    pub fn amount(self, waste: &CollectedWaste) -> f64 {
        let value = match self {
            TargetType::Weight => waste.weight,
            TargetType::Quantity => waste.quantity,
        };
        // Negative entries are rejected on input; never let one lower progress.
        value.max(0.0)
    }
}

/// A sub-target of a goal tied to one waste type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Challenge {
    pub waste_type_id: String,
    pub target_value: f64,
    pub target_type: TargetType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Expired,
}

/// Administrator-defined recycling challenge with a point reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// Points awarded once on completion
    pub points: u32,
    pub target_type: TargetType,
    /// Single target across all challenges; `None` means per-challenge targets
    #[serde(default)]
    pub target_value: Option<f64>,
    pub challenges: Vec<Challenge>,
    pub status: GoalStatus,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Goal {
    /// Past the validity window.
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_from
    }

    /// Whether users can join and make progress right now.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == GoalStatus::Active && self.has_started(now) && !self.is_past(now)
    }

    /// Lazily expire the goal. Returns `true` if the status changed.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == GoalStatus::Active && self.is_past(now) {
            self.status = GoalStatus::Expired;
            self.updated_at = crate::time_utils::format_utc_rfc3339(now);
            true
        } else {
            false
        }
    }

    /// Fresh progress record for a user opting into this goal.
    pub fn initial_progress(&self) -> Progress {
        match self.target_value {
            Some(target_value) => Progress::Total {
                current_value: 0.0,
                target_value,
            },
            None => Progress::PerChallenge {
                challenges: self
                    .challenges
                    .iter()
                    .map(|c| ChallengeProgress {
                        waste_type_id: c.waste_type_id.clone(),
                        target_type: c.target_type,
                        current_value: 0.0,
                        target_value: c.target_value,
                        completed: false,
                    })
                    .collect(),
            },
        }
    }
}
