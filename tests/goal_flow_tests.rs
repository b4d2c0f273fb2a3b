// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end pickup → score → notification flow over HTTP.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use ecotrack::models::Role;
use serde_json::{json, Value};

mod common;
use common::{create_test_app, create_test_jwt, json_body, send};

struct World {
    app: axum::Router,
    admin: String,
    responsible: String,
    user: String,
    plastic_id: String,
    eco_point_id: String,
    goal_id: String,
}

/// Admin, a responsible running one eco-point, a user, and a 10 kg plastic goal.
async fn setup() -> World {
    let (app, state) = create_test_app();
    let key = &state.config.jwt_signing_key;
    let admin = create_test_jwt("admin-1", Role::Admin, key);
    let responsible = create_test_jwt("resp-1", Role::Responsible, key);
    let user = create_test_jwt("user-1", Role::User, key);

    for (token, name, email) in [
        (&admin, "Admin", "admin@example.com"),
        (&responsible, "Rita", "rita@example.com"),
        (&user, "Ana", "ana@example.com"),
    ] {
        let response = send(
            &app,
            "POST",
            "/api/users",
            Some(token),
            Some(json!({ "name": name, "email": email })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(
        &app,
        "POST",
        "/api/admin/waste-types",
        Some(&admin),
        Some(json!({ "name": "Plástico", "description": "Garrafas e embalagens" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let plastic_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "POST",
        "/api/admin/eco-points",
        Some(&admin),
        Some(json!({
            "name": "Ecoponto Centro",
            "address": "Rua Principal, 100",
            "latitude": -23.55,
            "longitude": -46.63,
            "accepted_waste_types": [plastic_id],
            "responsible_id": "resp-1",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let eco_point_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let now = Utc::now();
    let response = send(
        &app,
        "POST",
        "/api/admin/goals",
        Some(&admin),
        Some(json!({
            "title": "Recicle 10 kg de plástico",
            "valid_from": now - Duration::days(1),
            "valid_until": now + Duration::days(30),
            "points": 100,
            "target_type": "weight",
            "target_value": 10.0,
            "challenges": [
                { "waste_type_id": plastic_id, "target_value": 10.0, "target_type": "weight" }
            ],
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let goal_id = json_body(response).await["id"].as_str().unwrap().to_string();

    World {
        app,
        admin,
        responsible,
        user,
        plastic_id,
        eco_point_id,
        goal_id,
    }
}

async fn schedule(world: &World, weight: f64) -> String {
    let response = send(
        &world.app,
        "POST",
        "/api/collections",
        Some(&world.user),
        Some(json!({
            "eco_point_id": world.eco_point_id,
            "scheduled_for": Utc::now() + Duration::days(1),
            "wastes": [{ "waste_type_id": world.plastic_id, "quantity": 1, "weight": weight }],
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "scheduled");
    body["id"].as_str().unwrap().to_string()
}

async fn confirm(world: &World, collection_id: &str) {
    let response = send(
        &world.app,
        "PUT",
        &format!("/api/collections/{}/status", collection_id),
        Some(&world.responsible),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Confirm then collect, as the eco-point responsible.
async fn collect(world: &World, collection_id: &str) -> Value {
    confirm(world, collection_id).await;
    let response = send(
        &world.app,
        "PUT",
        &format!("/api/collections/{}/status", collection_id),
        Some(&world.responsible),
        Some(json!({ "status": "collected" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

async fn my_scores(world: &World) -> Value {
    let response = send(&world.app, "GET", "/api/scores", Some(&world.user), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn test_goal_completes_on_second_pickup() {
    let world = setup().await;

    let response = send(
        &world.app,
        "POST",
        &format!("/api/goals/{}/join", world.goal_id),
        Some(&world.user),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // 6 kg: progress, not complete
    let first = schedule(&world, 6.0).await;
    let report = collect(&world, &first).await;
    assert_eq!(report["collection"]["status"], "collected");
    assert_eq!(report["collection"]["collected_by"], "resp-1");
    assert_eq!(report["score_updates"][0]["outcome"], "progressed");
    assert_eq!(report["points_awarded"], 0);

    let scores = my_scores(&world).await;
    assert_eq!(scores[0]["status"], "active");
    assert_eq!(scores[0]["progress"]["mode"], "total");
    assert_eq!(scores[0]["progress"]["current_value"], 6.0);
    assert_eq!(scores[0]["points_earned"], 0);

    // 5 kg more: 11 kg >= 10 kg, goal completed
    let second = schedule(&world, 5.0).await;
    let report = collect(&world, &second).await;
    assert_eq!(report["score_updates"][0]["outcome"], "completed");
    assert_eq!(report["points_awarded"], 100);

    let scores = my_scores(&world).await;
    assert_eq!(scores[0]["status"], "completed");
    assert_eq!(scores[0]["progress"]["current_value"], 11.0);
    assert_eq!(scores[0]["points_earned"], 100);
    assert_eq!(scores[0]["ratio"], 1.0);
    assert!(scores[0]["completed_at"].is_string());

    let response = send(
        &world.app,
        "GET",
        "/api/notifications",
        Some(&world.user),
        None,
    )
    .await;
    let notifications = json_body(response).await;
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["kind"], "goal_completed");
    assert_eq!(notifications[0]["read"], false);

    let response = send(&world.app, "GET", "/api/ranking", Some(&world.user), None).await;
    let ranking = json_body(response).await;
    assert_eq!(ranking[0]["user_id"], "user-1");
    assert_eq!(ranking[0]["name"], "Ana");
    assert_eq!(ranking[0]["position"], 1);
    assert_eq!(ranking[0]["total_points"], 100);
    assert_eq!(ranking[0]["completed_goals"], 1);
}

#[tokio::test]
async fn test_pickup_cannot_be_collected_twice() {
    let world = setup().await;
    send(
        &world.app,
        "POST",
        &format!("/api/goals/{}/join", world.goal_id),
        Some(&world.user),
        None,
    )
    .await;

    let pickup = schedule(&world, 6.0).await;
    collect(&world, &pickup).await;

    let response = send(
        &world.app,
        "PUT",
        &format!("/api/collections/{}/status", pickup),
        Some(&world.responsible),
        Some(json!({ "status": "collected" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let scores = my_scores(&world).await;
    assert_eq!(scores[0]["progress"]["current_value"], 6.0);
}

#[tokio::test]
async fn test_scheduled_pickup_must_be_confirmed_first() {
    let world = setup().await;
    send(
        &world.app,
        "POST",
        &format!("/api/goals/{}/join", world.goal_id),
        Some(&world.user),
        None,
    )
    .await;

    let pickup = schedule(&world, 20.0).await;
    let response = send(
        &world.app,
        "PUT",
        &format!("/api/collections/{}/status", pickup),
        Some(&world.responsible),
        Some(json!({ "status": "collected" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let scores = my_scores(&world).await;
    assert_eq!(scores[0]["status"], "active");
    assert_eq!(scores[0]["progress"]["current_value"], 0.0);

    // Once confirmed the same pickup counts
    let report = collect(&world, &pickup).await;
    assert_eq!(report["points_awarded"], 100);
}

#[tokio::test]
async fn test_collect_after_account_deletion_is_not_found() {
    let world = setup().await;
    send(
        &world.app,
        "POST",
        &format!("/api/goals/{}/join", world.goal_id),
        Some(&world.user),
        None,
    )
    .await;
    let pickup = schedule(&world, 20.0).await;
    confirm(&world, &pickup).await;

    let response = send(&world.app, "DELETE", "/api/account", Some(&world.user), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &world.app,
        "PUT",
        &format!("/api/collections/{}/status", pickup),
        Some(&world.responsible),
        Some(json!({ "status": "collected" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Nothing was recreated for the deleted account
    let scores = my_scores(&world).await;
    assert!(scores.as_array().unwrap().is_empty());
    let response = send(&world.app, "GET", "/api/ranking", Some(&world.admin), None).await;
    let ranking = json_body(response).await;
    assert!(ranking
        .as_array()
        .unwrap()
        .iter()
        .all(|row| row["user_id"] != "user-1"));
}

#[tokio::test]
async fn test_join_twice_conflicts() {
    let world = setup().await;
    let uri = format!("/api/goals/{}/join", world.goal_id);

    let response = send(&world.app, "POST", &uri, Some(&world.user), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&world.app, "POST", &uri, Some(&world.user), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_pickup_before_joining_does_not_count() {
    let world = setup().await;

    let pickup = schedule(&world, 20.0).await;
    let report = collect(&world, &pickup).await;
    assert!(report["score_updates"].as_array().unwrap().is_empty());

    send(
        &world.app,
        "POST",
        &format!("/api/goals/{}/join", world.goal_id),
        Some(&world.user),
        None,
    )
    .await;
    let scores = my_scores(&world).await;
    assert_eq!(scores[0]["progress"]["current_value"], 0.0);
}

#[tokio::test]
async fn test_collected_weight_replaces_estimate() {
    let world = setup().await;
    send(
        &world.app,
        "POST",
        &format!("/api/goals/{}/join", world.goal_id),
        Some(&world.user),
        None,
    )
    .await;

    let pickup = schedule(&world, 2.0).await;
    confirm(&world, &pickup).await;
    let response = send(
        &world.app,
        "PUT",
        &format!("/api/collections/{}/status", pickup),
        Some(&world.responsible),
        Some(json!({
            "status": "collected",
            "wastes": [{ "waste_type_id": world.plastic_id, "quantity": 3, "weight": 12.5 }],
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["collection"]["wastes"][0]["weight"], 12.5);
    assert_eq!(report["points_awarded"], 100);
}

#[tokio::test]
async fn test_status_transition_permissions() {
    let world = setup().await;
    let pickup = schedule(&world, 1.0).await;
    let uri = format!("/api/collections/{}/status", pickup);

    // Owner cannot confirm or collect their own pickup
    let response = send(
        &world.app,
        "PUT",
        &uri,
        Some(&world.user),
        Some(json!({ "status": "collected" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Responsible confirms
    let response = send(
        &world.app,
        "PUT",
        &uri,
        Some(&world.responsible),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "confirmed");

    // Responsible cannot cancel on the owner's behalf
    let response = send(
        &world.app,
        "PUT",
        &uri,
        Some(&world.responsible),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Owner cancels
    let response = send(
        &world.app,
        "PUT",
        &uri,
        Some(&world.user),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Cancelled is terminal
    let response = send(
        &world.app,
        "PUT",
        &uri,
        Some(&world.admin),
        Some(json!({ "status": "collected" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_pickup_visibility() {
    let world = setup().await;
    let pickup = schedule(&world, 1.0).await;
    let uri = format!("/api/collections/{}", pickup);

    for token in [&world.user, &world.responsible, &world.admin] {
        let response = send(&world.app, "GET", &uri, Some(token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let (_, state) = create_test_app();
    let stranger = create_test_jwt("user-2", Role::User, &state.config.jwt_signing_key);
    let response = send(&world.app, "GET", &uri, Some(&stranger), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &world.app,
        "GET",
        &format!("/api/eco-points/{}/collections", world.eco_point_id),
        Some(&world.responsible),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

    let response = send(
        &world.app,
        "GET",
        &format!("/api/eco-points/{}/collections", world.eco_point_id),
        Some(&world.user),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_mark_notification_read() {
    let world = setup().await;

    let response = send(
        &world.app,
        "POST",
        "/api/admin/notifications",
        Some(&world.admin),
        Some(json!({ "title": "Mutirão", "message": "Sábado tem coleta especial" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["recipients"], 3);

    let response = send(
        &world.app,
        "GET",
        "/api/notifications",
        Some(&world.user),
        None,
    )
    .await;
    let notifications = json_body(response).await;
    assert_eq!(notifications[0]["kind"], "announcement");
    let id = notifications[0]["id"].as_str().unwrap().to_string();

    // Another user's notification is not visible
    let response = send(
        &world.app,
        "PUT",
        &format!("/api/notifications/{}/read", id),
        Some(&world.responsible),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &world.app,
        "PUT",
        &format!("/api/notifications/{}/read", id),
        Some(&world.user),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["read"], true);
}
