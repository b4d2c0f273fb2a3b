// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pickup scheduling and status transitions.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{CollectedWaste, Collection, CollectionStatus, EcoPoint};
use crate::routes::catalog::ensure_waste_types_exist;
use crate::services::CompletionReport;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/collections",
            get(list_my_collections).post(schedule_collection),
        )
        .route("/api/collections/{id}", get(get_collection))
        .route("/api/collections/{id}/status", put(update_status))
        .route(
            "/api/eco-points/{id}/collections",
            get(list_eco_point_collections),
        )
}

// ─── Request Types ───────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WasteEntry {
    #[validate(length(min = 1))]
    pub waste_type_id: String,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100000.0))]
    pub quantity: f64,
    /// Kilograms
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100000.0))]
    pub weight: f64,
}

impl From<WasteEntry> for CollectedWaste {
    fn from(entry: WasteEntry) -> Self {
        CollectedWaste {
            waste_type_id: entry.waste_type_id,
            quantity: entry.quantity,
            weight: entry.weight,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleRequest {
    #[validate(length(min = 1))]
    pub eco_point_id: String,
    pub scheduled_for: DateTime<Utc>,
    #[validate(length(min = 1, max = 20), nested)]
    pub wastes: Vec<WasteEntry>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusRequest {
    pub status: CollectionStatus,
    /// Final weighed amounts, only honored when collecting
    #[serde(default)]
    #[validate(length(min = 1, max = 20), nested)]
    pub wastes: Option<Vec<WasteEntry>>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum StatusResponse {
    Collected(CompletionReport),
    Updated(Collection),
}

// ─── Helpers ─────────────────────────────────────────────────

async fn load_collection(state: &AppState, id: &str) -> Result<Collection> {
    state
        .db
        .get_collection(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Collection {} not found", id)))
}

async fn load_eco_point(state: &AppState, id: &str) -> Result<EcoPoint> {
    state
        .db
        .get_eco_point(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Eco-point {} not found", id)))
}

/// Validate waste entries against the catalog and the eco-point.
async fn check_wastes(state: &AppState, eco_point: &EcoPoint, wastes: &[WasteEntry]) -> Result<()> {
    ensure_waste_types_exist(state, wastes.iter().map(|w| &w.waste_type_id)).await?;

    if let Some(rejected) = wastes.iter().find(|w| !eco_point.accepts(&w.waste_type_id)) {
        return Err(AppError::BadRequest(format!(
            "Eco-point {} does not accept waste type {}",
            eco_point.id, rejected.waste_type_id
        )));
    }
    if wastes.iter().any(|w| !w.quantity.is_finite() || !w.weight.is_finite()) {
        return Err(AppError::BadRequest("Invalid waste amount".to_string()));
    }
    Ok(())
}

/// Eco-point staff: its responsible or an administrator.
fn require_operator(user: &AuthUser, eco_point: &EcoPoint) -> Result<()> {
    if user.is_admin() || eco_point.is_responsible(&user.user_id) {
        return Ok(());
    }
    tracing::warn!(
        user_id = %user.user_id,
        eco_point_id = %eco_point.id,
        "Non-responsible attempted eco-point operation"
    );
    Err(AppError::Forbidden(
        "Only the eco-point responsible may do this".to_string(),
    ))
}

// ─── Handlers ────────────────────────────────────────────────

async fn schedule_collection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<Collection>)> {
    body.validate()?;

    let eco_point = state
        .db
        .get_eco_point(&body.eco_point_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown eco-point: {}", body.eco_point_id)))?;
    check_wastes(&state, &eco_point, &body.wastes).await?;

    let now = now_rfc3339();
    let collection = Collection {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        eco_point_id: eco_point.id,
        scheduled_for: body.scheduled_for,
        wastes: body.wastes.into_iter().map(CollectedWaste::from).collect(),
        status: CollectionStatus::Scheduled,
        notes: body.notes,
        created_at: now.clone(),
        updated_at: now,
        collected_at: None,
        collected_by: None,
    };
    state.db.create_collection(&collection).await?;

    tracing::info!(
        collection_id = %collection.id,
        user_id = %collection.user_id,
        eco_point_id = %collection.eco_point_id,
        "Pickup scheduled"
    );

    Ok((StatusCode::CREATED, Json(collection)))
}

/// The caller's own pickups, soonest first.
async fn list_my_collections(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Collection>>> {
    let mut pickups = state.db.collections_for_user(&user.user_id).await?;
    pickups.sort_by_key(|c| c.scheduled_for);
    Ok(Json(pickups))
}

async fn get_collection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Collection>> {
    let collection = load_collection(&state, &id).await?;

    if collection.user_id != user.user_id {
        let eco_point = load_eco_point(&state, &collection.eco_point_id).await?;
        require_operator(&user, &eco_point)?;
    }

    Ok(Json(collection))
}

async fn list_eco_point_collections(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Collection>>> {
    let eco_point = load_eco_point(&state, &id).await?;
    require_operator(&user, &eco_point)?;

    let mut pickups = state.db.collections_for_eco_point(&eco_point.id).await?;
    pickups.sort_by_key(|c| c.scheduled_for);
    Ok(Json(pickups))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<StatusResponse>> {
    body.validate()?;

    let collection = load_collection(&state, &id).await?;
    let eco_point = load_eco_point(&state, &collection.eco_point_id).await?;

    match body.status {
        CollectionStatus::Confirmed | CollectionStatus::Collected => {
            require_operator(&user, &eco_point)?
        }
        CollectionStatus::Cancelled => {
            if collection.user_id != user.user_id && !user.is_admin() {
                return Err(AppError::Forbidden(
                    "Only the owner may cancel a pickup".to_string(),
                ));
            }
        }
        CollectionStatus::Scheduled => {}
    }

    if !collection.status.can_transition_to(body.status) {
        return Err(AppError::Conflict(format!(
            "Cannot move collection from {} to {}",
            collection.status.as_str(),
            body.status.as_str()
        )));
    }

    if body.status == CollectionStatus::Collected {
        let final_wastes = match body.wastes {
            Some(wastes) => {
                check_wastes(&state, &eco_point, &wastes).await?;
                Some(wastes.into_iter().map(CollectedWaste::from).collect())
            }
            None => None,
        };
        // Progress service re-checks the transition under the owner's lock
        let report = state
            .progress_service
            .complete_collection(&collection.id, &user.user_id, final_wastes)
            .await?;
        return Ok(Json(StatusResponse::Collected(report)));
    }

    let collection = state
        .progress_service
        .set_status(&collection.id, body.status)
        .await?;

    tracing::info!(
        collection_id = %collection.id,
        status = collection.status.as_str(),
        changed_by = %user.user_id,
        "Collection status updated"
    );

    Ok(Json(StatusResponse::Updated(collection)))
}
