// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Waste types and eco-points.

use serde::{Deserialize, Serialize};

/// A recyclable waste category (e.g. "Plástico").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
}

/// A physical waste-collection location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EcoPoint {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Waste type IDs accepted at this location (empty = all)
    #[serde(default)]
    pub accepted_waste_types: Vec<String>,
    /// User ID of the operator in charge, if assigned
    #[serde(default)]
    pub responsible_id: Option<String>,
    pub created_at: String,
}

impl EcoPoint {
    /// Whether this eco-point takes the given waste type.
    pub fn accepts(&self, waste_type_id: &str) -> bool {
        self.accepted_waste_types.is_empty()
            || self.accepted_waste_types.iter().any(|id| id == waste_type_id)
    }

    /// Whether `user_id` operates this eco-point.
    pub fn is_responsible(&self, user_id: &str) -> bool {
        self.responsible_id.as_deref() == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eco_point(accepted: Vec<&str>) -> EcoPoint {
        EcoPoint {
            id: "ep-1".to_string(),
            name: "Ecoponto Centro".to_string(),
            address: "Rua Principal 1".to_string(),
            latitude: -23.55,
            longitude: -46.63,
            accepted_waste_types: accepted.into_iter().map(String::from).collect(),
            responsible_id: Some("resp-1".to_string()),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_empty_accept_list_takes_everything() {
        assert!(eco_point(vec![]).accepts("plastic"));
    }

    #[test]
    fn test_accept_list_is_enforced() {
        let point = eco_point(vec!["plastic", "glass"]);
        assert!(point.accepts("glass"));
        assert!(!point.accepts("metal"));
    }

    #[test]
    fn test_responsible_check() {
        let point = eco_point(vec![]);
        assert!(point.is_responsible("resp-1"));
        assert!(!point.is_responsible("someone-else"));
    }
}
