// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Integration tests for user deletion.

use chrono::{Duration, Utc};
use ecotrack::db::Database;
use ecotrack::models::{
    Challenge, CollectedWaste, Collection, CollectionStatus, Goal, GoalStatus, Notification,
    NotificationKind, Role, Score, TargetType, User,
};
use ecotrack::time_utils::now_rfc3339;

fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        name: "Delete Me".to_string(),
        email: format!("{}@example.com", id),
        role: Role::User,
        created_at: "2025-01-01T00:00:00Z".to_string(),
        updated_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

fn goal() -> Goal {
    let now = Utc::now();
    Goal {
        id: "goal-1".to_string(),
        title: "Vidro".to_string(),
        description: String::new(),
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(1),
        points: 10,
        target_type: TargetType::Weight,
        target_value: None,
        challenges: vec![Challenge {
            waste_type_id: "glass".to_string(),
            target_value: 5.0,
            target_type: TargetType::Weight,
        }],
        status: GoalStatus::Active,
        created_by: "admin".to_string(),
        created_at: now_rfc3339(),
        updated_at: now_rfc3339(),
    }
}

fn pickup(id: &str, user_id: &str) -> Collection {
    Collection {
        id: id.to_string(),
        user_id: user_id.to_string(),
        eco_point_id: "ep-1".to_string(),
        scheduled_for: Utc::now(),
        wastes: vec![CollectedWaste {
            waste_type_id: "glass".to_string(),
            quantity: 2.0,
            weight: 1.0,
        }],
        status: CollectionStatus::Scheduled,
        notes: Some("Portão lateral".to_string()),
        created_at: now_rfc3339(),
        updated_at: now_rfc3339(),
        collected_at: None,
        collected_by: None,
    }
}

async fn seed(db: &Database, user_id: &str, goal: &Goal) {
    db.upsert_user(&user(user_id)).await.unwrap();
    db.create_score(&Score::new(user_id, goal, Utc::now()))
        .await
        .unwrap();
    db.create_collection(&pickup(&format!("{}-p1", user_id), user_id))
        .await
        .unwrap();
    db.create_collection(&pickup(&format!("{}-p2", user_id), user_id))
        .await
        .unwrap();
    db.upsert_notification(&Notification::new(
        user_id,
        NotificationKind::Announcement,
        "Olá".to_string(),
        "Bem-vindo".to_string(),
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn test_delete_user_data_removes_all_records() {
    let db = Database::in_memory();
    let goal = goal();
    db.upsert_goal(&goal).await.unwrap();
    seed(&db, "leaving", &goal).await;

    let deleted = db.delete_user_data("leaving").await.unwrap();

    // Profile, score, two pickups, one notification
    assert_eq!(deleted, 5);
    assert!(db.get_user("leaving").await.unwrap().is_none());
    assert!(db.get_score("leaving", &goal.id).await.unwrap().is_none());
    assert!(db.collections_for_user("leaving").await.unwrap().is_empty());
    assert!(db.notifications_for_user("leaving").await.unwrap().is_empty());

    // Goals are shared and stay
    assert!(db.get_goal(&goal.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_user_data_leaves_other_users_alone() {
    let db = Database::in_memory();
    let goal = goal();
    db.upsert_goal(&goal).await.unwrap();
    seed(&db, "leaving", &goal).await;
    seed(&db, "staying", &goal).await;

    db.delete_user_data("leaving").await.unwrap();

    assert!(db.get_user("staying").await.unwrap().is_some());
    assert!(db.get_score("staying", &goal.id).await.unwrap().is_some());
    assert_eq!(db.collections_for_user("staying").await.unwrap().len(), 2);
    assert_eq!(db.notifications_for_user("staying").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_unknown_user_is_harmless() {
    let db = Database::in_memory();

    // Only the (absent) profile delete is issued
    assert_eq!(db.delete_user_data("nobody").await.unwrap(), 1);
}
