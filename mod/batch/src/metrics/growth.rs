use serde::{Deserialize, Serialize};

/// Specific Growth Rate: logarithmic daily growth, in percent per day.
///
/// `SGR = (ln(final) - ln(initial)) / days * 100`
///
/// Returns `0.0` when `days <= 0` or either weight is non-positive —
/// insufficient data, not a failure.
pub fn specific_growth_rate(initial_weight_g: f64, final_weight_g: f64, days: f64) -> f64 {
    if days <= 0.0 || initial_weight_g <= 0.0 || final_weight_g <= 0.0 {
        return 0.0;
    }
    (final_weight_g.ln() - initial_weight_g.ln()) / days * 100.0
}

/// Linear daily growth in grams per day. `0.0` when `days <= 0`.
pub fn daily_growth_rate(initial_weight_g: f64, final_weight_g: f64, days: f64) -> f64 {
    if days <= 0.0 {
        return 0.0;
    }
    (final_weight_g - initial_weight_g) / days
}

/// Feed Conversion Ratio: feed consumed per unit of biomass gained.
///
/// Weight gain counts biomass lost to mortality — feed eaten by animals
/// that later died still converted. Returns `None` when gain is zero or
/// negative; a ratio over no gain is meaningless and a negative ratio
/// would poison downstream averages.
pub fn feed_conversion_ratio(
    total_feed_kg: f64,
    current_biomass_kg: f64,
    initial_biomass_kg: f64,
    mortality_biomass_kg: f64,
) -> Option<f64> {
    let weight_gain = current_biomass_kg - initial_biomass_kg + mortality_biomass_kg;
    if weight_gain <= 0.0 {
        return None;
    }
    Some(total_feed_kg / weight_gain)
}

/// Qualitative bucket for an SGR value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrowthRating {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl GrowthRating {
    /// Classify an SGR value (percent per day).
    pub fn from_sgr(sgr: f64) -> Self {
        if sgr >= 3.0 {
            Self::Excellent
        } else if sgr >= 2.0 {
            Self::Good
        } else if sgr >= 1.0 {
            Self::Average
        } else if sgr >= 0.0 {
            Self::BelowAverage
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Average => "AVERAGE",
            Self::BelowAverage => "BELOW_AVERAGE",
            Self::Poor => "POOR",
        }
    }
}

impl std::fmt::Display for GrowthRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
