// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ranking aggregation over completed scores.

use crate::models::{Score, ScoreStatus};
use serde::Serialize;
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One row of the ranking.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingEntry {
    /// 1-based position
    pub position: u32,
    pub user_id: String,
    pub name: String,
    /// Sum over completed goals; wider than a single award
    pub total_points: u64,
    pub completed_goals: u32,
}

/// Accumulates completed scores per user, remembering first appearance.
struct Tally<'a> {
    names: &'a HashMap<String, String>,
    index: HashMap<String, usize>,
    rows: Vec<RankingEntry>,
}

impl<'a> Tally<'a> {
    fn new(names: &'a HashMap<String, String>) -> Self {
        Self {
            names,
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn row(&mut self, user_id: &str) -> &mut RankingEntry {
        let i = match self.index.get(user_id) {
            Some(&i) => i,
            None => {
                self.rows.push(RankingEntry {
                    position: 0,
                    user_id: user_id.to_string(),
                    name: self.names.get(user_id).cloned().unwrap_or_default(),
                    total_points: 0,
                    completed_goals: 0,
                });
                self.index.insert(user_id.to_string(), self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        &mut self.rows[i]
    }
}

/// Build the ranking from completed scores.
///
/// Scores are grouped by user in order of first appearance, then stably
/// sorted by total points (descending), so ties keep input order. The
/// requesting user is always present, with zero points if they have no
/// completed goals. Only the top `limit` rows are kept; if the requester
/// falls below the cut their row is appended with its real position.
pub fn build_ranking(
    scores: &[Score],
    names: &HashMap<String, String>,
    requester_id: &str,
    limit: usize,
) -> Vec<RankingEntry> {
    let mut tally = Tally::new(names);

    for score in scores.iter().filter(|s| s.status == ScoreStatus::Completed) {
        let row = tally.row(&score.user_id);
        row.total_points = row.total_points.saturating_add(u64::from(score.points_earned));
        row.completed_goals = row.completed_goals.saturating_add(1);
    }
    tally.row(requester_id);

    let mut rows = tally.rows;
    rows.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    for (i, row) in rows.iter_mut().enumerate() {
        row.position = i as u32 + 1;
    }

    let requester_row = rows
        .iter()
        .position(|r| r.user_id == requester_id)
        .filter(|pos| *pos >= limit)
        .map(|pos| rows[pos].clone());

    rows.truncate(limit);
    rows.extend(requester_row);
    rows
}
