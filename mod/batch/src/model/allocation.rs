use serde::{Deserialize, Serialize};

use crate::metrics::biomass_kg;

/// Kind of a tank-allocation ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationType {
    InitialStocking,
    Split,
    TransferIn,
    TransferOut,
    Grading,
    Harvest,
}

impl AllocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialStocking => "INITIAL_STOCKING",
            Self::Split => "SPLIT",
            Self::TransferIn => "TRANSFER_IN",
            Self::TransferOut => "TRANSFER_OUT",
            Self::Grading => "GRADING",
            Self::Harvest => "HARVEST",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INITIAL_STOCKING" => Some(Self::InitialStocking),
            "SPLIT" => Some(Self::Split),
            "TRANSFER_IN" => Some(Self::TransferIn),
            "TRANSFER_OUT" => Some(Self::TransferOut),
            "GRADING" => Some(Self::Grading),
            "HARVEST" => Some(Self::Harvest),
            _ => None,
        }
    }

    /// Whether entries of this type remove stock from the tank.
    pub fn removes_stock(&self) -> bool {
        matches!(self, Self::TransferOut | Self::Harvest)
    }

    /// Apply the ledger sign convention: stock-removing entries are
    /// stored negative so a tank's state is the plain sum of its
    /// active entries.
    pub fn signed(&self, quantity: i64) -> i64 {
        if self.removes_stock() { -quantity } else { quantity }
    }
}

impl std::fmt::Display for AllocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TankAllocation — one entry of the append-only allocation ledger.
///
/// Never mutated after creation; corrections are new entries with
/// inverse quantity, administrative voiding is a soft delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TankAllocation {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    pub tenant_id: String,
    pub batch_id: String,
    pub tank_id: String,

    pub allocation_type: AllocationType,

    /// Signed per [`AllocationType::signed`].
    pub quantity: i64,
    pub avg_weight_g: f64,
    /// `quantity * avg_weight_g / 1000`, sign carried by quantity.
    pub biomass_kg: f64,

    /// Tank density right after this entry was applied.
    #[serde(default)]
    pub density_after: f64,

    /// Originating tank, set on transfer-in entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tank_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated_by: Option<String>,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,
}

impl TankAllocation {
    /// Check the write-time invariant `biomass == qty * avg / 1000`
    /// within floating-point tolerance.
    pub fn biomass_consistent(&self) -> bool {
        let expected = if self.quantity < 0 {
            -biomass_kg(-self.quantity, self.avg_weight_g)
        } else {
            biomass_kg(self.quantity, self.avg_weight_g)
        };
        (self.biomass_kg - expected).abs() < 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_convention() {
        assert_eq!(AllocationType::InitialStocking.signed(500), 500);
        assert_eq!(AllocationType::Split.signed(500), 500);
        assert_eq!(AllocationType::TransferIn.signed(500), 500);
        assert_eq!(AllocationType::Grading.signed(500), 500);
        assert_eq!(AllocationType::TransferOut.signed(500), -500);
        assert_eq!(AllocationType::Harvest.signed(500), -500);
    }

    #[test]
    fn biomass_invariant() {
        let a = TankAllocation {
            id: "a1".into(),
            tenant_id: "farm1".into(),
            batch_id: "b1".into(),
            tank_id: "t1".into(),
            allocation_type: AllocationType::InitialStocking,
            quantity: 10_000,
            avg_weight_g: 5.0,
            biomass_kg: 50.0,
            density_after: 0.5,
            source_tank_id: None,
            allocated_by: None,
            deleted: false,
            create_at: None,
        };
        assert!(a.biomass_consistent());

        let out = TankAllocation {
            allocation_type: AllocationType::TransferOut,
            quantity: -2000,
            biomass_kg: -10.0,
            ..a.clone()
        };
        assert!(out.biomass_consistent());

        let broken = TankAllocation {
            biomass_kg: 49.0,
            ..a
        };
        assert!(!broken.biomass_consistent());
    }

    #[test]
    fn allocation_json_roundtrip() {
        let a = TankAllocation {
            id: "a1".into(),
            tenant_id: "farm1".into(),
            batch_id: "b1".into(),
            tank_id: "t1".into(),
            allocation_type: AllocationType::TransferIn,
            quantity: 300,
            avg_weight_g: 120.0,
            biomass_kg: 36.0,
            density_after: 1.2,
            source_tank_id: Some("t0".into()),
            allocated_by: Some("u1".into()),
            deleted: false,
            create_at: Some("2025-04-01T00:00:00Z".into()),
        };
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("\"allocationType\":\"TRANSFER_IN\""));
        let back: TankAllocation = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
