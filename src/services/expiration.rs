// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-triggered expiration sweep.
//!
//! There is no background job: every read of goals or scores compares the
//! goal's `valid_until` with the current time and persists any active goal
//! or score that has run past it.

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Goal, Score};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::collections::{HashMap, HashSet};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Expire past goals in place and persist the ones that changed.
///
/// Returns the number of goals expired.
pub async fn sweep_goals(db: &Database, goals: &mut [Goal], now: DateTime<Utc>) -> Result<usize> {
    let expired: Vec<Goal> = goals
        .iter_mut()
        .filter_map(|goal| goal.refresh_status(now).then(|| goal.clone()))
        .collect();

    let count = expired.len();
    if count == 0 {
        return Ok(0);
    }

    stream::iter(expired)
        .map(|goal| async move { db.upsert_goal(&goal).await })
        .buffer_unordered(MAX_CONCURRENT_DB_OPS)
        .collect::<Vec<Result<()>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<()>>>()?;

    tracing::info!(count, "Expired goals past their validity window");
    Ok(count)
}

/// Expire active scores whose goal has closed and persist them.
///
/// `goals` must hold the (already swept) goal of every score; scores of
/// unknown goals are left alone. Each due score is re-read before it is
/// written, so a score completed after `scores` was loaded keeps its stored
/// state and replaces the stale copy. Returns the number of scores expired.
pub async fn sweep_scores(
    db: &Database,
    scores: &mut [Score],
    goals: &HashMap<String, Goal>,
    now: DateTime<Utc>,
) -> Result<usize> {
    let candidates: Vec<(usize, String, Goal)> = scores
        .iter()
        .enumerate()
        .filter_map(|(index, score)| {
            let goal = goals.get(&score.goal_id)?;
            score
                .is_past_due(goal, now)
                .then(|| (index, score.user_id.clone(), goal.clone()))
        })
        .collect();

    if candidates.is_empty() {
        return Ok(0);
    }

    let refreshed = stream::iter(candidates)
        .map(|(index, user_id, goal)| async move {
            expire_stored_score(db, &user_id, &goal, now)
                .await
                .map(|stored| (index, stored))
        })
        .buffer_unordered(MAX_CONCURRENT_DB_OPS)
        .collect::<Vec<Result<(usize, Option<(Score, bool)>)>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let mut count = 0;
    for (index, stored) in refreshed {
        if let Some((current, expired)) = stored {
            scores[index] = current;
            count += usize::from(expired);
        }
    }

    if count > 0 {
        tracing::info!(count, "Expired scores of closed goals");
    }
    Ok(count)
}

/// Re-read one score and expire it if it is still active.
async fn expire_stored_score(
    db: &Database,
    user_id: &str,
    goal: &Goal,
    now: DateTime<Utc>,
) -> Result<Option<(Score, bool)>> {
    let Some(mut score) = db.get_score(user_id, &goal.id).await? else {
        return Ok(None);
    };
    let expired = score.expire_if_past(goal, now);
    if expired {
        db.upsert_score(&score).await?;
    }
    Ok(Some((score, expired)))
}

/// Fetch the distinct goals referenced by `goal_ids`, keyed by ID.
///
/// Missing goals are simply absent from the map.
pub async fn load_goals<'a>(
    db: &Database,
    goal_ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, Goal>> {
    let unique: HashSet<String> = goal_ids.map(str::to_string).collect();

    let goals = stream::iter(unique)
        .map(|id| async move { db.get_goal(&id).await })
        .buffer_unordered(MAX_CONCURRENT_DB_OPS)
        .collect::<Vec<std::result::Result<Option<Goal>, AppError>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<Option<Goal>>>>()?;

    Ok(goals
        .into_iter()
        .flatten()
        .map(|goal| (goal.id.clone(), goal))
        .collect())
}

/// A user's scores with the expiration sweep applied to them and their goals.
pub async fn load_user_scores(
    db: &Database,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<(Vec<Score>, HashMap<String, Goal>)> {
    let mut scores = db.scores_for_user(user_id).await?;
    let mut goals = load_goals(db, scores.iter().map(|s| s.goal_id.as_str())).await?;

    let mut goal_list: Vec<Goal> = goals.drain().map(|(_, g)| g).collect();
    sweep_goals(db, &mut goal_list, now).await?;
    let goals: HashMap<String, Goal> = goal_list
        .into_iter()
        .map(|goal| (goal.id.clone(), goal))
        .collect();

    sweep_scores(db, &mut scores, &goals, now).await?;
    Ok((scores, goals))
}
