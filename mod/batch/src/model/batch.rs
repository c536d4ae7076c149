use serde::{Deserialize, Serialize};

use aquafarm_core::ServiceError;

use crate::metrics::{GrowthRating, biomass_kg};

/// Variance above this magnitude (percent) between theoretical and
/// actual weight is flagged as significant.
const SIGNIFICANT_VARIANCE_PERCENT: f64 = 10.0;

// ---------------------------------------------------------------------------
// BatchStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a production batch.
///
/// ```text
/// QUARANTINE → ACTIVE → HARVESTING → HARVESTED → CLOSED
///            ↘ CANCELLED (from QUARANTINE or ACTIVE only)
/// ```
///
/// Any non-terminal status may also close directly. CLOSED and
/// CANCELLED are terminal: no population or status mutation afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Quarantine,
    Active,
    Harvesting,
    Harvested,
    Closed,
    Cancelled,
}

impl Default for BatchStatus {
    fn default() -> Self {
        Self::Quarantine
    }
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarantine => "QUARANTINE",
            Self::Active => "ACTIVE",
            Self::Harvesting => "HARVESTING",
            Self::Harvested => "HARVESTED",
            Self::Closed => "CLOSED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "QUARANTINE" => Some(Self::Quarantine),
            "ACTIVE" => Some(Self::Active),
            "HARVESTING" => Some(Self::Harvesting),
            "HARVESTED" => Some(Self::Harvested),
            "CLOSED" => Some(Self::Closed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the batch has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    /// Whether `next` is a legal transition from this status.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        match self {
            Self::Quarantine => matches!(next, Self::Active | Self::Cancelled | Self::Closed),
            Self::Active => matches!(
                next,
                Self::Harvesting | Self::Harvested | Self::Cancelled | Self::Closed
            ),
            Self::Harvesting => matches!(next, Self::Harvested | Self::Closed),
            Self::Harvested => matches!(next, Self::Closed),
            Self::Closed | Self::Cancelled => false,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Weight tracking
// ---------------------------------------------------------------------------

/// One view of the batch's weight: average per animal plus the biomass
/// it implies at the view's population.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightView {
    pub avg_weight_g: f64,
    pub biomass_kg: f64,
}

impl WeightView {
    pub fn of(quantity: i64, avg_weight_g: f64) -> Self {
        Self {
            avg_weight_g,
            biomass_kg: biomass_kg(quantity, avg_weight_g),
        }
    }
}

/// Difference between the theoretical and actual weight views.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightVariance {
    pub difference_g: f64,
    pub percent: f64,
    pub significant: bool,
}

impl WeightVariance {
    pub fn between(theoretical: &WeightView, actual: &WeightView) -> Self {
        let difference_g = actual.avg_weight_g - theoretical.avg_weight_g;
        let percent = if theoretical.avg_weight_g > 0.0 {
            difference_g / theoretical.avg_weight_g * 100.0
        } else {
            0.0
        };
        Self {
            difference_g,
            percent,
            significant: percent.abs() > SIGNIFICANT_VARIANCE_PERCENT,
        }
    }
}

/// The four weight views of a batch.
///
/// `initial` is fixed at stocking. `theoretical` follows the species
/// growth model, `actual` follows physical sampling; both carry biomass
/// at the current population. `variance` compares the last two.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightTracking {
    pub initial: WeightView,
    pub theoretical: WeightView,
    pub actual: WeightView,
    pub variance: WeightVariance,
}

// ---------------------------------------------------------------------------
// Feed conversion / growth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedConversion {
    /// Target FCR — species default unless the operator overrode it.
    #[serde(default)]
    pub target_fcr: f64,

    /// Computed from recorded feed consumption; `None` until enough data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_fcr: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theoretical_fcr: Option<f64>,

    /// Operator override of the species target.
    #[serde(default)]
    pub overridden: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrowthTracking {
    /// Specific growth rate, percent per day. `None` until computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sgr: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<GrowthRating>,

    #[serde(default)]
    pub days_in_production: i64,

    /// Linear growth g/day measured from sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_rate_actual_g: Option<f64>,

    /// Species reference growth g/day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_rate_target_g: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_variance_percent: Option<f64>,
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Batch — one production cohort, from stocking to harvest or closure.
///
/// Population conservation law, enforced on every mutation:
/// `current_quantity + total_mortality + cull_count + harvested_quantity
/// == initial_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    pub tenant_id: String,

    /// Human batch number, unique per tenant (e.g. "B-2025-014").
    pub batch_number: String,

    pub species_id: String,

    // --- population ---
    /// Set once at stocking, immutable.
    pub initial_quantity: i64,
    pub current_quantity: i64,
    #[serde(default)]
    pub total_mortality: i64,
    #[serde(default)]
    pub cull_count: i64,
    #[serde(default)]
    pub harvested_quantity: i64,

    // --- derived rates ---
    #[serde(default)]
    pub mortality_rate_percent: f64,
    #[serde(default)]
    pub survival_rate_percent: f64,

    // --- weight / feed / growth ---
    #[serde(default)]
    pub weight: WeightTracking,
    #[serde(default)]
    pub feed: FeedConversion,
    #[serde(default)]
    pub growth: GrowthTracking,

    // --- lifecycle ---
    #[serde(default)]
    pub status: BatchStatus,
    pub stocking_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_changed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_harvest_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,

    /// Optimistic concurrency counter, bumped on every write.
    #[serde(default)]
    pub version: i64,
}

fn default_true() -> bool {
    true
}

impl Batch {
    /// Whether the population counters satisfy the conservation law.
    pub fn population_balanced(&self) -> bool {
        self.current_quantity + self.total_mortality + self.cull_count + self.harvested_quantity
            == self.initial_quantity
    }

    /// Recompute mortality and survival rates from the counters.
    pub fn recompute_rates(&mut self) {
        if self.initial_quantity > 0 {
            self.mortality_rate_percent =
                self.total_mortality as f64 / self.initial_quantity as f64 * 100.0;
            self.survival_rate_percent =
                self.current_quantity as f64 / self.initial_quantity as f64 * 100.0;
        } else {
            self.mortality_rate_percent = 0.0;
            self.survival_rate_percent = 0.0;
        }
    }

    /// Recompute theoretical/actual biomass at the current population.
    /// The initial view is never touched.
    pub fn refresh_biomass(&mut self) {
        self.weight.theoretical =
            WeightView::of(self.current_quantity, self.weight.theoretical.avg_weight_g);
        self.weight.actual = WeightView::of(self.current_quantity, self.weight.actual.avg_weight_g);
        self.weight.variance = WeightVariance::between(&self.weight.theoretical, &self.weight.actual);
    }

    /// Validated status transition. Stamps `status_changed_at`; closing
    /// also deactivates the batch.
    pub fn transition_to(&mut self, next: BatchStatus, now: &str) -> Result<(), ServiceError> {
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::InvalidState(format!(
                "batch {} cannot transition {} -> {}",
                self.batch_number, self.status, next
            )));
        }
        self.status = next;
        self.status_changed_at = Some(now.to_string());
        if next == BatchStatus::Closed || next == BatchStatus::Cancelled {
            self.is_active = false;
            self.closed_at = Some(now.to_string());
        }
        Ok(())
    }

    /// Remove `quantity` animals from the live population, failing with
    /// a conservation violation rather than going negative.
    pub fn reduce_population(&mut self, quantity: i64, what: &str) -> Result<(), ServiceError> {
        if quantity > self.current_quantity {
            return Err(ServiceError::Conservation(format!(
                "{what} of {quantity} exceeds current population {} of batch {}",
                self.current_quantity, self.batch_number
            )));
        }
        self.current_quantity -= quantity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Batch {
        Batch {
            id: "b1".into(),
            tenant_id: "farm1".into(),
            batch_number: "B-2025-001".into(),
            species_id: "salmon".into(),
            initial_quantity: 1000,
            current_quantity: 1000,
            total_mortality: 0,
            cull_count: 0,
            harvested_quantity: 0,
            mortality_rate_percent: 0.0,
            survival_rate_percent: 100.0,
            weight: WeightTracking {
                initial: WeightView::of(1000, 5.0),
                theoretical: WeightView::of(1000, 5.0),
                actual: WeightView::of(1000, 5.0),
                variance: WeightVariance::default(),
            },
            feed: FeedConversion::default(),
            growth: GrowthTracking::default(),
            status: BatchStatus::Quarantine,
            stocking_date: "2025-03-01T00:00:00Z".into(),
            status_changed_at: None,
            closed_at: None,
            actual_harvest_date: None,
            close_reason: None,
            is_active: true,
            deleted: false,
            description: None,
            created_by: None,
            create_at: None,
            update_at: None,
            version: 0,
        }
    }

    #[test]
    fn batch_json_roundtrip() {
        let b = batch();
        let json = serde_json::to_string(&b).unwrap();
        let back: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }

    #[test]
    fn transition_matrix() {
        use BatchStatus::*;
        assert!(Quarantine.can_transition_to(Active));
        assert!(Quarantine.can_transition_to(Cancelled));
        assert!(Quarantine.can_transition_to(Closed));
        assert!(!Quarantine.can_transition_to(Harvesting));
        assert!(Active.can_transition_to(Harvesting));
        assert!(Active.can_transition_to(Harvested));
        assert!(Active.can_transition_to(Cancelled));
        assert!(Harvesting.can_transition_to(Harvested));
        assert!(!Harvesting.can_transition_to(Cancelled));
        assert!(Harvested.can_transition_to(Closed));
        assert!(!Harvested.can_transition_to(Active));
        assert!(!Closed.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Closed));
        assert!(Closed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Harvested.is_terminal());
    }

    #[test]
    fn transition_stamps_and_deactivates() {
        let mut b = batch();
        b.transition_to(BatchStatus::Active, "2025-03-02T00:00:00Z").unwrap();
        assert_eq!(b.status, BatchStatus::Active);
        assert!(b.is_active);
        b.transition_to(BatchStatus::Closed, "2025-06-01T00:00:00Z").unwrap();
        assert!(!b.is_active);
        assert_eq!(b.closed_at.as_deref(), Some("2025-06-01T00:00:00Z"));

        let err = b.transition_to(BatchStatus::Active, "2025-06-02T00:00:00Z");
        assert!(matches!(err, Err(ServiceError::InvalidState(_))));
    }

    #[test]
    fn reduce_population_guards_conservation() {
        let mut b = batch();
        b.reduce_population(400, "mortality").unwrap();
        assert_eq!(b.current_quantity, 600);
        let err = b.reduce_population(601, "mortality");
        assert!(matches!(err, Err(ServiceError::Conservation(_))));
        assert_eq!(b.current_quantity, 600);
    }

    #[test]
    fn rates_and_balance() {
        let mut b = batch();
        b.total_mortality = 50;
        b.current_quantity = 950;
        b.recompute_rates();
        assert!((b.mortality_rate_percent - 5.0).abs() < 1e-9);
        assert!((b.survival_rate_percent - 95.0).abs() < 1e-9);
        assert!(b.population_balanced());
        b.harvested_quantity = 10;
        assert!(!b.population_balanced());
    }

    #[test]
    fn variance_significance() {
        let theoretical = WeightView::of(100, 200.0);
        let actual = WeightView::of(100, 230.0);
        let v = WeightVariance::between(&theoretical, &actual);
        assert!((v.difference_g - 30.0).abs() < 1e-9);
        assert!((v.percent - 15.0).abs() < 1e-9);
        assert!(v.significant);

        let close = WeightView::of(100, 205.0);
        let v = WeightVariance::between(&theoretical, &close);
        assert!(!v.significant);
    }
}
