use serde::{Deserialize, Serialize};

/// Physical container category. Allocation works the same for all; the
/// kind travels along so reporting can distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerKind {
    Tank,
    Pond,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tank => "TANK",
            Self::Pond => "POND",
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BatchLocation — where (part of) a batch lives or lived.
///
/// At most one current row per (batch, container); a row stops being
/// current when the batch's share of the container drops to zero, at
/// which point `exited_at` closes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchLocation {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    pub tenant_id: String,
    pub batch_id: String,
    pub container_id: String,
    pub container_kind: ContainerKind,

    /// The batch's live share of this container.
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub biomass_kg: f64,

    pub is_current_location: bool,

    pub entered_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<String>,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
