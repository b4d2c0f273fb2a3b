// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-app notification routes.

use crate::db::{collections, Write, BATCH_SIZE};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Notification, NotificationKind};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/{id}/read", put(mark_read))
        .route("/api/admin/notifications", post(send_announcement))
}

/// The caller's notifications, newest first.
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Notification>>> {
    let mut notifications = state.db.notifications_for_user(&user.user_id).await?;
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(notifications))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Notification>> {
    let mut notification = state
        .db
        .get_notification(&id)
        .await?
        // Someone else's notification looks the same as a missing one
        .filter(|n| n.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;

    if !notification.read {
        notification.read = true;
        state.db.upsert_notification(&notification).await?;
    }

    Ok(Json(notification))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnnouncementRequest {
    /// Recipient; absent means every registered user
    #[serde(default)]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 1000))]
    pub message: String,
}

#[derive(Serialize)]
pub struct AnnouncementResponse {
    pub success: bool,
    pub recipients: usize,
}

async fn send_announcement(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<AnnouncementRequest>,
) -> Result<(StatusCode, Json<AnnouncementResponse>)> {
    user.require_admin()?;
    body.validate()?;

    let recipients: Vec<String> = match body.user_id {
        Some(user_id) => {
            if state.db.get_user(&user_id).await?.is_none() {
                return Err(AppError::NotFound(format!("User {} not found", user_id)));
            }
            vec![user_id]
        }
        None => state
            .db
            .list_users()
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect(),
    };

    let writes = recipients
        .iter()
        .map(|recipient| {
            let notification = Notification::new(
                recipient,
                NotificationKind::Announcement,
                body.title.clone(),
                body.message.clone(),
            );
            Write::set(collections::NOTIFICATIONS, notification.id.clone(), &notification)
        })
        .collect::<Result<Vec<Write>>>()?;

    for chunk in writes.chunks(BATCH_SIZE) {
        state.db.commit(chunk).await?;
    }

    tracing::info!(
        sent_by = %user.user_id,
        recipients = recipients.len(),
        "Announcement sent"
    );

    Ok((
        StatusCode::CREATED,
        Json(AnnouncementResponse {
            success: true,
            recipients: recipients.len(),
        }),
    ))
}
