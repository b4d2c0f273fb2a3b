// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod expiration;
pub mod progress;
pub mod ranking;

pub use progress::{CompletionReport, ProgressService};
pub use ranking::{build_ranking, RankingEntry};
