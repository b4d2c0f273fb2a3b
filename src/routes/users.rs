// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Role, User};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", post(register))
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/account", delete(delete_account))
        .route("/api/admin/users", get(list_users))
}

// ─── Registration & Profile ──────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

/// Register the caller's profile. The identity provider owns credentials;
/// this only stores what the app shows (name, email, role).
async fn register(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ProfileRequest>,
) -> Result<(StatusCode, Json<User>)> {
    body.validate()?;

    let now = now_rfc3339();
    let profile = User {
        id: user.user_id.clone(),
        name: body.name.trim().to_string(),
        email: body.email.trim().to_lowercase(),
        role: user.role,
        created_at: now.clone(),
        updated_at: now,
    };

    state.db.create_user(&profile).await?;

    tracing::info!(user_id = %profile.id, role = profile.role.as_str(), "User registered");

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(profile))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<User>> {
    body.validate()?;

    // Fetch-modify-write to keep created_at and role
    let mut profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    profile.name = body.name.trim().to_string();
    profile.email = body.email.trim().to_lowercase();
    profile.updated_at = now_rfc3339();
    state.db.upsert_user(&profile).await?;

    Ok(Json(profile))
}

// ─── Account Deletion ────────────────────────────────────────

#[derive(Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub deleted_documents: usize,
}

/// Delete the caller's profile and all associated data.
///
/// Completed scores go too, so the user drops out of the ranking.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteAccountResponse>> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    // Through the progress service so no completion can re-create records
    let deleted_documents = state
        .progress_service
        .delete_user_data(&user.user_id)
        .await?;

    Ok(Json(DeleteAccountResponse {
        success: true,
        deleted_documents,
    }))
}

// ─── Administration ──────────────────────────────────────────

#[derive(Deserialize)]
struct UsersQuery {
    role: Option<Role>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<UsersQuery>,
) -> Result<Json<Vec<User>>> {
    user.require_admin()?;

    let mut users = match params.role {
        Some(role) => state.db.list_users_with_role(role.as_str()).await?,
        None => state.db.list_users().await?,
    };
    users.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(users))
}
