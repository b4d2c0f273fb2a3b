// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! A user's progress record against one goal.
//!
//! Progress only moves forward while a score is active. Once a score is
//! completed or expired its progress and points are frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::collection::Collection;
use crate::models::goal::{Goal, GoalStatus, TargetType};
use crate::time_utils::format_utc_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Active,
    Completed,
    Expired,
}

impl ScoreStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreStatus::Active => "active",
            ScoreStatus::Completed => "completed",
            ScoreStatus::Expired => "expired",
        }
    }
}

/// Progress toward one challenge of a per-challenge goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeProgress {
    pub waste_type_id: String,
    pub target_type: TargetType,
    pub current_value: f64,
    pub target_value: f64,
    pub completed: bool,
}

/// Accumulated progress, shaped after the goal's target kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Progress {
    /// One counter against the goal's single target
    Total {
        current_value: f64,
        target_value: f64,
    },
    /// One counter per challenge, index-aligned with the goal's challenges
    PerChallenge { challenges: Vec<ChallengeProgress> },
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        match self {
            Progress::Total {
                current_value,
                target_value,
            } => current_value >= target_value,
            Progress::PerChallenge { challenges } => {
                !challenges.is_empty() && challenges.iter().all(|c| c.completed)
            }
        }
    }

    /// Completion ratio in `[0, 1]` for display.
    pub fn ratio(&self) -> f64 {
        fn clamp(current: f64, target: f64) -> f64 {
            if target <= 0.0 {
                1.0
            } else {
                (current / target).clamp(0.0, 1.0)
            }
        }

        match self {
            Progress::Total {
                current_value,
                target_value,
            } => clamp(*current_value, *target_value),
            Progress::PerChallenge { challenges } if challenges.is_empty() => 0.0,
            Progress::PerChallenge { challenges } => {
                challenges
                    .iter()
                    .map(|c| clamp(c.current_value, c.target_value))
                    .sum::<f64>()
                    / challenges.len() as f64
            }
        }
    }
}

/// Why a collection left a score untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Score is already completed or expired
    NotActive,
    /// This collection was already counted
    AlreadyApplied,
    /// Goal window has not opened yet
    NotStarted,
    /// No collected waste matches the goal's challenges
    NoMatch,
}

/// Result of applying one collection to one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    Skipped(SkipReason),
    /// Goal window closed; the score was expired instead
    Expired,
    Progressed,
    /// Target reached; points awarded
    Completed { points: u32 },
}

impl ProgressOutcome {
    /// Whether the score document needs to be written back.
    pub fn is_mutation(self) -> bool {
        !matches!(self, ProgressOutcome::Skipped(_))
    }
}

/// Links one user to one goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// `{user_id}_{goal_id}`; at most one score per pair
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub progress: Progress,
    #[serde(default)]
    pub points_earned: u32,
    pub status: ScoreStatus,
    /// Collections already counted (idempotency)
    #[serde(default)]
    pub processed_collection_ids: BTreeSet<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl Score {
    /// Document ID for a (user, goal) pair.
    pub fn document_id(user_id: &str, goal_id: &str) -> String {
        format!("{}_{}", user_id, goal_id)
    }

    /// New active score for a user opting into `goal`.
    pub fn new(user_id: &str, goal: &Goal, now: DateTime<Utc>) -> Self {
        let now = format_utc_rfc3339(now);
        Self {
            id: Self::document_id(user_id, &goal.id),
            user_id: user_id.to_string(),
            goal_id: goal.id.clone(),
            progress: goal.initial_progress(),
            points_earned: 0,
            status: ScoreStatus::Active,
            processed_collection_ids: BTreeSet::new(),
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ScoreStatus::Active
    }

    /// Whether this score is still active although its goal has closed.
    pub fn is_past_due(&self, goal: &Goal, now: DateTime<Utc>) -> bool {
        self.is_active() && (goal.status == GoalStatus::Expired || goal.is_past(now))
    }

    /// Expire an active score whose goal has closed. Returns `true` if changed.
    pub fn expire_if_past(&mut self, goal: &Goal, now: DateTime<Utc>) -> bool {
        if self.is_past_due(goal, now) {
            self.status = ScoreStatus::Expired;
            self.updated_at = format_utc_rfc3339(now);
            true
        } else {
            false
        }
    }

    /// Count a collected pickup toward this score.
    pub fn apply_collection(
        &mut self,
        goal: &Goal,
        collection: &Collection,
        now: DateTime<Utc>,
    ) -> ProgressOutcome {
        if !self.is_active() {
            return ProgressOutcome::Skipped(SkipReason::NotActive);
        }
        if self.processed_collection_ids.contains(&collection.id) {
            return ProgressOutcome::Skipped(SkipReason::AlreadyApplied);
        }
        if self.expire_if_past(goal, now) {
            return ProgressOutcome::Expired;
        }
        if !goal.has_started(now) {
            return ProgressOutcome::Skipped(SkipReason::NotStarted);
        }

        let mut matched = false;
        match &mut self.progress {
            // A single target counts in the goal's unit only
            Progress::Total { current_value, .. } => {
                for challenge in &goal.challenges {
                    for waste in collection.wastes_of(&challenge.waste_type_id) {
                        *current_value += goal.target_type.amount(waste);
                        matched = true;
                    }
                }
            }
            Progress::PerChallenge { challenges } => {
                for progress in challenges.iter_mut() {
                    for waste in collection.wastes_of(&progress.waste_type_id) {
                        progress.current_value += progress.target_type.amount(waste);
                        matched = true;
                    }
                    if !progress.completed && progress.current_value >= progress.target_value {
                        progress.completed = true;
                    }
                }
            }
        }

        if !matched {
            return ProgressOutcome::Skipped(SkipReason::NoMatch);
        }

        let stamp = format_utc_rfc3339(now);
        self.processed_collection_ids.insert(collection.id.clone());
        self.updated_at = stamp.clone();

        if self.progress.is_complete() {
            self.status = ScoreStatus::Completed;
            self.points_earned = goal.points;
            self.completed_at = Some(stamp);
            ProgressOutcome::Completed {
                points: goal.points,
            }
        } else {
            ProgressOutcome::Progressed
        }
    }
}
