// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! EcoTrack: recycling pickups with goals, scores and a ranking
//!
//! This crate provides the backend API: users schedule pickups at eco-points,
//! responsibles collect them, and collected waste is credited toward the
//! recycling goals users have joined.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::ProgressService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub progress_service: ProgressService,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        let progress_service = ProgressService::new(db.clone());
        Self {
            config,
            db,
            progress_service,
        }
    }
}
