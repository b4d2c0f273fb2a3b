// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community feed routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Post;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

const DEFAULT_FEED_LIMIT: usize = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostRequest {
    #[validate(length(min = 1, max = 150))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Deserialize)]
struct FeedQuery {
    author_id: Option<String>,
    limit: Option<usize>,
}

async fn load_post(state: &AppState, id: &str) -> Result<Post> {
    state
        .db
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
}

/// The feed, newest first.
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedQuery>,
) -> Result<Json<Vec<Post>>> {
    let mut posts = match params.author_id {
        Some(author_id) => state.db.posts_by_author(&author_id).await?,
        None => state.db.list_posts().await?,
    };
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts.truncate(params.limit.unwrap_or(DEFAULT_FEED_LIMIT));
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>> {
    Ok(Json(load_post(&state, &id).await?))
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<PostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    body.validate()?;

    // Posts show the author's name, so a profile is required
    let profile = state.db.get_user(&user.user_id).await?.ok_or_else(|| {
        AppError::BadRequest("Register a profile before posting".to_string())
    })?;

    let post = Post::new(
        &user.user_id,
        profile.name,
        body.title.trim().to_string(),
        body.content,
    );
    state.db.create_post(&post).await?;

    tracing::info!(post_id = %post.id, author_id = %post.author_id, "Post published");

    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<PostRequest>,
) -> Result<Json<Post>> {
    body.validate()?;

    let mut post = load_post(&state, &id).await?;
    if !post.is_authored_by(&user.user_id) {
        return Err(AppError::Forbidden(
            "Only the author may edit a post".to_string(),
        ));
    }

    post.title = body.title.trim().to_string();
    post.content = body.content;
    post.updated_at = now_rfc3339();
    state.db.upsert_post(&post).await?;

    Ok(Json(post))
}

#[derive(Serialize)]
pub struct DeletePostResponse {
    pub success: bool,
}

/// Authors remove their own posts; administrators moderate any post.
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeletePostResponse>> {
    let post = load_post(&state, &id).await?;
    if !post.is_authored_by(&user.user_id) && !user.is_admin() {
        tracing::warn!(
            user_id = %user.user_id,
            post_id = %post.id,
            "Non-author attempted post deletion"
        );
        return Err(AppError::Forbidden(
            "Only the author or an administrator may delete a post".to_string(),
        ));
    }

    state.db.delete_post(&post.id).await?;

    tracing::info!(post_id = %post.id, deleted_by = %user.user_id, "Post deleted");

    Ok(Json(DeletePostResponse { success: true }))
}
