// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration, Utc};
use ecotrack::db::Database;
use ecotrack::models::{
    Challenge, CollectedWaste, Collection, CollectionStatus, Goal, GoalStatus, Progress, Score,
    ScoreStatus, TargetType,
};
use ecotrack::services::ProgressService;
use ecotrack::time_utils::now_rfc3339;

const NUM_CONCURRENT_PICKUPS: usize = 10;
const PICKUP_WEIGHT: f64 = 1.5;

fn goal(target: f64) -> Goal {
    let now = Utc::now();
    Goal {
        id: "race-goal".to_string(),
        title: "Race".to_string(),
        description: String::new(),
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(1),
        points: 25,
        target_type: TargetType::Weight,
        target_value: Some(target),
        challenges: vec![Challenge {
            waste_type_id: "plastic".to_string(),
            target_value: target,
            target_type: TargetType::Weight,
        }],
        status: GoalStatus::Active,
        created_by: "admin".to_string(),
        created_at: now_rfc3339(),
        updated_at: now_rfc3339(),
    }
}

async fn seed_pickups(db: &Database, user_id: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for i in 0..NUM_CONCURRENT_PICKUPS {
        let pickup = Collection {
            id: format!("pickup-{}", i),
            user_id: user_id.to_string(),
            eco_point_id: "ep-1".to_string(),
            scheduled_for: Utc::now(),
            wastes: vec![CollectedWaste {
                waste_type_id: "plastic".to_string(),
                quantity: 1.0,
                weight: PICKUP_WEIGHT,
            }],
            status: CollectionStatus::Confirmed,
            notes: None,
            created_at: now_rfc3339(),
            updated_at: now_rfc3339(),
            collected_at: None,
            collected_by: None,
        };
        db.create_collection(&pickup).await.unwrap();
        ids.push(pickup.id);
    }
    ids
}

#[tokio::test]
async fn test_concurrent_pickups_all_counted() {
    // Concurrent completions for one user must each read the score written
    // by the previous one; a lost update would leave progress short.
    let db = Database::in_memory();
    let service = ProgressService::new(db.clone());
    let goal = goal(1000.0);
    db.upsert_goal(&goal).await.unwrap();
    db.create_score(&Score::new("racer", &goal, Utc::now()))
        .await
        .unwrap();

    let handles: Vec<_> = seed_pickups(&db, "racer")
        .await
        .into_iter()
        .map(|id| {
            let service = service.clone();
            tokio::spawn(async move { service.complete_collection(&id, "resp-1", None).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().expect("Completion failed");
    }

    let score = db.get_score("racer", &goal.id).await.unwrap().unwrap();
    assert_eq!(score.processed_collection_ids.len(), NUM_CONCURRENT_PICKUPS);
    match score.progress {
        Progress::Total { current_value, .. } => {
            assert_eq!(current_value, PICKUP_WEIGHT * NUM_CONCURRENT_PICKUPS as f64)
        }
        other => panic!("unexpected progress: {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_pickups_award_points_once() {
    let db = Database::in_memory();
    let service = ProgressService::new(db.clone());
    // Reached after two pickups; the rest must not add points
    let goal = goal(PICKUP_WEIGHT * 2.0);
    db.upsert_goal(&goal).await.unwrap();
    db.create_score(&Score::new("racer", &goal, Utc::now()))
        .await
        .unwrap();

    let handles: Vec<_> = seed_pickups(&db, "racer")
        .await
        .into_iter()
        .map(|id| {
            let service = service.clone();
            tokio::spawn(async move { service.complete_collection(&id, "resp-1", None).await })
        })
        .collect();

    let mut points_awarded = 0;
    for handle in handles {
        points_awarded += handle.await.unwrap().unwrap().points_awarded;
    }

    assert_eq!(points_awarded, goal.points);

    let score = db.get_score("racer", &goal.id).await.unwrap().unwrap();
    assert_eq!(score.status, ScoreStatus::Completed);
    assert_eq!(score.points_earned, goal.points);
    assert_eq!(db.notifications_for_user("racer").await.unwrap().len(), 1);

    // Every pickup still reaches collected
    for pickup in db.collections_for_user("racer").await.unwrap() {
        assert_eq!(pickup.status, CollectionStatus::Collected);
    }
}
