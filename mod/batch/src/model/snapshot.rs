use serde::{Deserialize, Serialize};

use crate::model::operation::ContainerState;

/// One batch's share of a tank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchShare {
    pub batch_id: String,
    pub quantity: i64,
    pub biomass_kg: f64,
    pub percent_of_tank: f64,
}

/// TankSnapshot — the materialized current state of one tank.
///
/// A pure projection of the allocation ledger: always fully recomputed
/// from the tank's active entries, never incrementally patched, so it
/// converges even after out-of-order or corrective entries. A tank that
/// empties keeps a zeroed snapshot row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TankSnapshot {
    pub tank_id: String,
    pub tenant_id: String,

    /// Majority batch, by quantity. `None` when the tank is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_batch_id: Option<String>,

    #[serde(default)]
    pub total_quantity: i64,
    #[serde(default)]
    pub total_biomass_kg: f64,
    /// Derived: `total_biomass_kg * 1000 / total_quantity`.
    #[serde(default)]
    pub avg_weight_g: f64,
    #[serde(default)]
    pub density: f64,

    #[serde(default)]
    pub is_mixed_batch: bool,
    #[serde(default)]
    pub batches: Vec<BatchShare>,

    #[serde(default)]
    pub capacity_used_percent: f64,
    #[serde(default)]
    pub is_over_capacity: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_allocation_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation_at: Option<String>,

    pub update_at: String,
}

impl TankSnapshot {
    /// Zeroed snapshot for a tank with no active allocations.
    pub fn empty(tenant_id: &str, tank_id: &str, now: &str) -> Self {
        Self {
            tank_id: tank_id.to_string(),
            tenant_id: tenant_id.to_string(),
            primary_batch_id: None,
            total_quantity: 0,
            total_biomass_kg: 0.0,
            avg_weight_g: 0.0,
            density: 0.0,
            is_mixed_batch: false,
            batches: Vec::new(),
            capacity_used_percent: 0.0,
            is_over_capacity: false,
            last_allocation_at: None,
            last_operation_at: None,
            update_at: now.to_string(),
        }
    }

    /// Condensed view captured into operation pre/post states.
    pub fn container_state(&self) -> ContainerState {
        ContainerState {
            quantity: self.total_quantity,
            biomass_kg: self.total_biomass_kg,
            avg_weight_g: self.avg_weight_g,
            density: self.density,
        }
    }

    /// Sum of active allocation biomass matches the stored total within
    /// floating-point tolerance.
    pub fn biomass_consistent_with(&self, allocation_biomass_sum: f64) -> bool {
        (self.total_biomass_kg - allocation_biomass_sum).abs() < 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_is_zeroed() {
        let s = TankSnapshot::empty("farm1", "t1", "2025-04-01T00:00:00Z");
        assert_eq!(s.total_quantity, 0);
        assert_eq!(s.primary_batch_id, None);
        assert!(!s.is_mixed_batch);
        assert!(s.batches.is_empty());
        let cs = s.container_state();
        assert_eq!(cs.quantity, 0);
        assert_eq!(cs.density, 0.0);
    }

    #[test]
    fn snapshot_json_roundtrip() {
        let s = TankSnapshot {
            tank_id: "t1".into(),
            tenant_id: "farm1".into(),
            primary_batch_id: Some("b1".into()),
            total_quantity: 9500,
            total_biomass_kg: 2375.0,
            avg_weight_g: 250.0,
            density: 23.75,
            is_mixed_batch: false,
            batches: vec![BatchShare {
                batch_id: "b1".into(),
                quantity: 9500,
                biomass_kg: 2375.0,
                percent_of_tank: 100.0,
            }],
            capacity_used_percent: 95.0,
            is_over_capacity: false,
            last_allocation_at: Some("2025-04-01T00:00:00Z".into()),
            last_operation_at: None,
            update_at: "2025-04-01T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: TankSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
