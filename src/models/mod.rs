// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod collection;
pub mod goal;
pub mod notification;
pub mod post;
pub mod score;
pub mod user;
pub mod waste_type;

pub use collection::{CollectedWaste, Collection, CollectionStatus};
pub use goal::{Challenge, Goal, GoalStatus, TargetType};
pub use notification::{Notification, NotificationKind};
pub use post::Post;
pub use score::{ChallengeProgress, Progress, ProgressOutcome, Score, ScoreStatus, SkipReason};
pub use user::{Role, User};
pub use waste_type::{EcoPoint, WasteType};
