// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal, score and ranking routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Challenge, Goal, GoalStatus, Progress, Score, ScoreStatus, TargetType};
use crate::routes::catalog::ensure_waste_types_exist;
use crate::services::expiration::sweep_goals;
use crate::services::{build_ranking, RankingEntry};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::{Validate, ValidationError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", get(list_goals))
        .route("/api/goals/{id}", get(get_goal))
        .route("/api/goals/{id}/join", post(join_goal))
        .route("/api/admin/goals", post(create_goal))
        .route(
            "/api/admin/goals/{id}",
            delete(delete_goal).put(update_goal),
        )
        .route("/api/scores", get(list_my_scores))
        .route("/api/ranking", get(get_ranking))
}

// ─── Goals ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct GoalsQuery {
    status: Option<GoalStatus>,
}

/// List goals, newest window first, expiring any that have closed.
async fn list_goals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GoalsQuery>,
) -> Result<Json<Vec<Goal>>> {
    let mut goals = state.db.list_goals().await?;
    sweep_goals(&state.db, &mut goals, Utc::now()).await?;

    if let Some(status) = params.status {
        goals.retain(|g| g.status == status);
    }
    goals.sort_by(|a, b| b.valid_from.cmp(&a.valid_from));

    Ok(Json(goals))
}

async fn load_goal(state: &AppState, id: &str) -> Result<Goal> {
    let goal = state
        .db
        .get_goal(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Goal {} not found", id)))?;

    let mut goals = [goal];
    sweep_goals(&state.db, &mut goals, Utc::now()).await?;
    let [goal] = goals;
    Ok(goal)
}

async fn get_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Goal>> {
    Ok(Json(load_goal(&state, &id).await?))
}

/// Opt the caller into a goal.
async fn join_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Score>)> {
    let goal = load_goal(&state, &id).await?;
    let now = Utc::now();

    if !goal.is_open(now) {
        return Err(AppError::BadRequest(format!(
            "Goal {} is not open for participation",
            goal.id
        )));
    }

    let score = Score::new(&user.user_id, &goal, now);
    state.db.create_score(&score).await.map_err(|e| match e {
        AppError::Conflict(_) => AppError::Conflict(format!("Already joined goal {}", goal.id)),
        other => other,
    })?;

    tracing::info!(user_id = %user.user_id, goal_id = %goal.id, "User joined goal");

    Ok((StatusCode::CREATED, Json(score)))
}

// ─── Goal Administration ─────────────────────────────────────

fn positive(value: f64) -> std::result::Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChallengeRequest {
    #[validate(length(min = 1))]
    pub waste_type_id: String,
    #[validate(custom(function = "positive"))]
    pub target_value: f64,
    pub target_type: TargetType,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[validate(range(min = 1, max = 100000))]
    pub points: u32,
    pub target_type: TargetType,
    #[serde(default)]
    #[validate(custom(function = "positive"))]
    pub target_value: Option<f64>,
    #[validate(length(min = 1, max = 20), nested)]
    pub challenges: Vec<ChallengeRequest>,
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Goal>)> {
    user.require_admin()?;
    body.validate()?;

    if body.valid_until <= body.valid_from {
        return Err(AppError::BadRequest(
            "valid_until must be after valid_from".to_string(),
        ));
    }
    // One counter cannot add kilograms to item counts
    if body.target_value.is_some() {
        if let Some(mixed) = body
            .challenges
            .iter()
            .find(|c| c.target_type != body.target_type)
        {
            return Err(AppError::BadRequest(format!(
                "Challenge {} must use the goal's target type when the goal has a single target",
                mixed.waste_type_id
            )));
        }
    }
    ensure_waste_types_exist(&state, body.challenges.iter().map(|c| &c.waste_type_id)).await?;

    let now = Utc::now();
    let stamp = format_utc_rfc3339(now);
    let mut goal = Goal {
        id: uuid::Uuid::new_v4().to_string(),
        title: body.title.trim().to_string(),
        description: body.description,
        valid_from: body.valid_from,
        valid_until: body.valid_until,
        points: body.points,
        target_type: body.target_type,
        target_value: body.target_value,
        challenges: body
            .challenges
            .into_iter()
            .map(|c| Challenge {
                waste_type_id: c.waste_type_id,
                target_value: c.target_value,
                target_type: c.target_type,
            })
            .collect(),
        status: GoalStatus::Active,
        created_by: user.user_id.clone(),
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    // A window already in the past is created expired
    goal.refresh_status(now);
    state.db.upsert_goal(&goal).await?;

    tracing::info!(
        goal_id = %goal.id,
        created_by = %goal.created_by,
        challenges = goal.challenges.len(),
        single_target = goal.target_value.is_some(),
        "Goal created"
    );

    Ok((StatusCode::CREATED, Json(goal)))
}

/// Editable goal fields. Challenges and targets are fixed once created,
/// since existing scores are shaped after them.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGoalRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 100000))]
    pub points: Option<u32>,
    pub valid_until: Option<DateTime<Utc>>,
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateGoalRequest>,
) -> Result<Json<Goal>> {
    user.require_admin()?;
    body.validate()?;

    let mut goal = load_goal(&state, &id).await?;

    if let Some(title) = body.title {
        goal.title = title.trim().to_string();
    }
    if let Some(description) = body.description {
        goal.description = description;
    }
    if let Some(points) = body.points {
        goal.points = points;
    }
    if let Some(valid_until) = body.valid_until {
        if goal.status == GoalStatus::Expired {
            return Err(AppError::Conflict(format!(
                "Goal {} has expired and cannot be extended",
                goal.id
            )));
        }
        if valid_until <= goal.valid_from {
            return Err(AppError::BadRequest(
                "valid_until must be after valid_from".to_string(),
            ));
        }
        goal.valid_until = valid_until;
    }

    let now = Utc::now();
    goal.updated_at = format_utc_rfc3339(now);
    goal.refresh_status(now);
    state.db.upsert_goal(&goal).await?;

    tracing::info!(goal_id = %goal.id, updated_by = %user.user_id, "Goal updated");

    Ok(Json(goal))
}

#[derive(Serialize)]
pub struct DeleteGoalResponse {
    pub success: bool,
    pub removed_scores: usize,
}

async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteGoalResponse>> {
    user.require_admin()?;

    if state.db.get_goal(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Goal {} not found", id)));
    }
    let removed_scores = state.db.delete_goal(&id).await?;

    tracing::info!(goal_id = %id, removed_scores, "Goal deleted");

    Ok(Json(DeleteGoalResponse {
        success: true,
        removed_scores,
    }))
}

// ─── Scores & Ranking ────────────────────────────────────────

/// A score with display fields from its goal.
#[derive(Debug, Serialize)]
pub struct ScoreView {
    pub goal_id: String,
    pub goal_title: Option<String>,
    pub status: ScoreStatus,
    pub progress: Progress,
    /// Completion ratio in `[0, 1]`
    pub ratio: f64,
    pub points_earned: u32,
    pub created_at: String,
    pub completed_at: Option<String>,
}

async fn list_my_scores(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ScoreView>>> {
    let (mut scores, goals) = state
        .progress_service
        .user_scores(&user.user_id, Utc::now())
        .await?;
    scores.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let views = scores
        .into_iter()
        .map(|s| ScoreView {
            goal_title: goals.get(&s.goal_id).map(|g| g.title.clone()),
            ratio: s.progress.ratio(),
            goal_id: s.goal_id,
            status: s.status,
            progress: s.progress,
            points_earned: s.points_earned,
            created_at: s.created_at,
            completed_at: s.completed_at,
        })
        .collect();

    Ok(Json(views))
}

async fn get_ranking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<RankingEntry>>> {
    let scores = state.db.completed_scores().await?;
    let names: HashMap<String, String> = state
        .db
        .list_users()
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let ranking = build_ranking(&scores, &names, &user.user_id, state.config.ranking_limit);

    tracing::debug!(
        completed_scores = scores.len(),
        rows = ranking.len(),
        "Ranking built"
    );

    Ok(Json(ranking))
}
