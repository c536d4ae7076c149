use serde::{Deserialize, Serialize};

/// Kind of a population-affecting event.
///
/// Classification is fixed per type, never data-dependent:
/// stock-reducing = mortality, cull, transfer-out, harvest;
/// stock-increasing = transfer-in; sampling and adjustment are neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Mortality,
    Cull,
    TransferOut,
    TransferIn,
    Harvest,
    Sampling,
    Adjustment,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mortality => "MORTALITY",
            Self::Cull => "CULL",
            Self::TransferOut => "TRANSFER_OUT",
            Self::TransferIn => "TRANSFER_IN",
            Self::Harvest => "HARVEST",
            Self::Sampling => "SAMPLING",
            Self::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn is_stock_reducing(&self) -> bool {
        matches!(
            self,
            Self::Mortality | Self::Cull | Self::TransferOut | Self::Harvest
        )
    }

    pub fn is_stock_increasing(&self) -> bool {
        matches!(self, Self::TransferIn)
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific payload of an operation, tagged by operation type.
///
/// Modeled as a variant per type so illegal field combinations (e.g. a
/// mortality with a harvest buyer) are unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum OperationDetail {
    Mortality {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Cull {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    TransferOut {
        destination_tank_id: String,
        /// Shared by both legs of one logical transfer.
        transfer_id: String,
    },
    TransferIn {
        source_tank_id: String,
        transfer_id: String,
    },
    Harvest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        buyer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price_per_kg: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Sampling {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sample_size: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Adjustment {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
}

impl OperationDetail {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Mortality { .. } => OperationType::Mortality,
            Self::Cull { .. } => OperationType::Cull,
            Self::TransferOut { .. } => OperationType::TransferOut,
            Self::TransferIn { .. } => OperationType::TransferIn,
            Self::Harvest { .. } => OperationType::Harvest,
            Self::Sampling { .. } => OperationType::Sampling,
            Self::Adjustment { .. } => OperationType::Adjustment,
        }
    }
}

/// Point-in-time state of a container, captured around an operation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    pub quantity: i64,
    pub biomass_kg: f64,
    pub avg_weight_g: f64,
    pub density: f64,
}

/// TankOperation — one entry of the append-only operation ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TankOperation {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    pub tenant_id: String,
    pub batch_id: String,
    pub tank_id: String,

    /// Animals affected (always positive; direction comes from the type).
    pub quantity: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_weight_g: Option<f64>,
    #[serde(default)]
    pub biomass_kg: f64,

    /// Tagged per-type payload; flattened so the document carries
    /// `"type": "MORTALITY"` at the top level.
    #[serde(flatten)]
    pub detail: OperationDetail,

    pub pre_state: ContainerState,
    pub post_state: ContainerState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_by: Option<String>,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,
}

impl TankOperation {
    pub fn operation_type(&self) -> OperationType {
        self.detail.operation_type()
    }
}
