// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Waste type and eco-point routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{EcoPoint, Role, WasteType};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/waste-types", get(list_waste_types))
        .route("/api/admin/waste-types", post(create_waste_type))
        .route("/api/admin/waste-types/{id}", delete(delete_waste_type))
        .route("/api/eco-points", get(list_eco_points))
        .route("/api/eco-points/{id}", get(get_eco_point))
        .route("/api/admin/eco-points", post(create_eco_point))
        .route(
            "/api/admin/eco-points/{id}/responsible",
            put(assign_responsible),
        )
}

// ─── Waste Types ─────────────────────────────────────────────

async fn list_waste_types(State(state): State<Arc<AppState>>) -> Result<Json<Vec<WasteType>>> {
    let mut waste_types = state.db.list_waste_types().await?;
    waste_types.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(waste_types))
}

#[derive(Debug, Deserialize, Validate)]
pub struct WasteTypeRequest {
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
}

async fn create_waste_type(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<WasteTypeRequest>,
) -> Result<(StatusCode, Json<WasteType>)> {
    user.require_admin()?;
    body.validate()?;

    let name = body.name.trim().to_string();
    let existing = state.db.list_waste_types().await?;
    if existing.iter().any(|w| w.name.eq_ignore_ascii_case(&name)) {
        return Err(AppError::Conflict(format!(
            "Waste type '{}' already exists",
            name
        )));
    }

    let waste_type = WasteType {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        description: body.description,
        created_at: now_rfc3339(),
    };
    state.db.create_waste_type(&waste_type).await?;

    tracing::info!(waste_type_id = %waste_type.id, name = %waste_type.name, "Waste type created");

    Ok((StatusCode::CREATED, Json(waste_type)))
}

async fn delete_waste_type(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    user.require_admin()?;

    if state.db.get_waste_type(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Waste type {} not found", id)));
    }
    state.db.delete_waste_type(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ─── Eco-Points ──────────────────────────────────────────────

async fn list_eco_points(State(state): State<Arc<AppState>>) -> Result<Json<Vec<EcoPoint>>> {
    let mut eco_points = state.db.list_eco_points().await?;
    eco_points.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(eco_points))
}

async fn get_eco_point(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EcoPoint>> {
    let eco_point = state
        .db
        .get_eco_point(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Eco-point {} not found", id)))?;
    Ok(Json(eco_point))
}

#[derive(Debug, Deserialize, Validate)]
pub struct EcoPointRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(default)]
    pub accepted_waste_types: Vec<String>,
    #[serde(default)]
    pub responsible_id: Option<String>,
}

/// Check that every referenced waste type exists.
pub(crate) async fn ensure_waste_types_exist<'a>(
    state: &AppState,
    ids: impl IntoIterator<Item = &'a String>,
) -> Result<()> {
    let known = state.db.list_waste_types().await?;
    for id in ids {
        if !known.iter().any(|w| &w.id == id) {
            return Err(AppError::BadRequest(format!("Unknown waste type: {}", id)));
        }
    }
    Ok(())
}

/// Check that `user_id` is a registered responsible.
async fn ensure_responsible(state: &AppState, user_id: &str) -> Result<()> {
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown user: {}", user_id)))?;
    if user.role != Role::Responsible && user.role != Role::Admin {
        return Err(AppError::BadRequest(format!(
            "User {} is not a responsible",
            user_id
        )));
    }
    Ok(())
}

async fn create_eco_point(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<EcoPointRequest>,
) -> Result<(StatusCode, Json<EcoPoint>)> {
    user.require_admin()?;
    body.validate()?;
    ensure_waste_types_exist(&state, &body.accepted_waste_types).await?;
    if let Some(responsible_id) = &body.responsible_id {
        ensure_responsible(&state, responsible_id).await?;
    }

    let eco_point = EcoPoint {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        address: body.address.trim().to_string(),
        latitude: body.latitude,
        longitude: body.longitude,
        accepted_waste_types: body.accepted_waste_types,
        responsible_id: body.responsible_id,
        created_at: now_rfc3339(),
    };
    state.db.upsert_eco_point(&eco_point).await?;

    tracing::info!(eco_point_id = %eco_point.id, name = %eco_point.name, "Eco-point created");

    Ok((StatusCode::CREATED, Json(eco_point)))
}

#[derive(Debug, Deserialize)]
pub struct AssignResponsibleRequest {
    pub responsible_id: Option<String>,
}

async fn assign_responsible(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<AssignResponsibleRequest>,
) -> Result<Json<EcoPoint>> {
    user.require_admin()?;

    let mut eco_point = state
        .db
        .get_eco_point(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Eco-point {} not found", id)))?;

    if let Some(responsible_id) = &body.responsible_id {
        ensure_responsible(&state, responsible_id).await?;
    }
    eco_point.responsible_id = body.responsible_id;
    state.db.upsert_eco_point(&eco_point).await?;

    tracing::info!(
        eco_point_id = %eco_point.id,
        responsible_id = ?eco_point.responsible_id,
        "Eco-point responsible assigned"
    );

    Ok(Json(eco_point))
}
