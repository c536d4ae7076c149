use serde::{Deserialize, Serialize};

use aquafarm_core::ServiceError;

/// Total live weight in kilograms: `quantity * avg_weight_g / 1000`.
/// `0.0` when either input is non-positive.
pub fn biomass_kg(quantity: i64, avg_weight_g: f64) -> f64 {
    if quantity <= 0 || avg_weight_g <= 0.0 {
        return 0.0;
    }
    quantity as f64 * avg_weight_g / 1000.0
}

/// Stocking density in kg/m³.
///
/// A container without a configured volume is a setup fault: density
/// against a fabricated volume would mislead every capacity decision,
/// so this fails instead of defaulting.
pub fn density(biomass_kg: f64, volume_m3: f64) -> Result<f64, ServiceError> {
    if volume_m3 <= 0.0 {
        return Err(ServiceError::Validation(format!(
            "container volume must be positive, got {volume_m3}"
        )));
    }
    Ok(biomass_kg / volume_m3)
}

/// Density classification against a container's configured band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DensityBand {
    Optimal,
    Low,
    High,
    Critical,
}

impl DensityBand {
    /// Classify a density value.
    ///
    /// CRITICAL at or above the hard maximum; HIGH above the optimal
    /// band; LOW below it (an empty container is not "low", it is
    /// simply empty and classifies OPTIMAL at zero).
    pub fn classify(
        current_density: f64,
        optimal_min: f64,
        optimal_max: f64,
        max_density: f64,
    ) -> Self {
        if max_density > 0.0 && current_density >= max_density {
            Self::Critical
        } else if current_density > optimal_max {
            Self::High
        } else if current_density < optimal_min && current_density > 0.0 {
            Self::Low
        } else {
            Self::Optimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal => "OPTIMAL",
            Self::Low => "LOW",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for DensityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projected post-transfer state of both containers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProjection {
    pub source_density: f64,
    pub destination_density: f64,
    pub destination_band: DensityBand,
    /// Advisory findings. Farms may override density limits, so these
    /// never fail the transfer.
    pub warnings: Vec<String>,
    pub is_valid: bool,
}

/// Project densities after moving `transfer_biomass_kg` from source to
/// destination.
///
/// Oversized transfers and a critical destination produce warnings,
/// not failures. Unconfigured volumes fail per [`density`].
#[allow(clippy::too_many_arguments)]
pub fn project_transfer(
    source_biomass_kg: f64,
    source_volume_m3: f64,
    destination_biomass_kg: f64,
    destination_volume_m3: f64,
    transfer_biomass_kg: f64,
    destination_optimal_min: f64,
    destination_optimal_max: f64,
    destination_max_density: f64,
) -> Result<TransferProjection, ServiceError> {
    let mut warnings = Vec::new();

    if transfer_biomass_kg > source_biomass_kg {
        warnings.push(format!(
            "transfer biomass {transfer_biomass_kg:.3}kg exceeds source biomass {source_biomass_kg:.3}kg"
        ));
    }

    let source_density = density(
        (source_biomass_kg - transfer_biomass_kg).max(0.0),
        source_volume_m3,
    )?;
    let destination_density = density(
        destination_biomass_kg + transfer_biomass_kg,
        destination_volume_m3,
    )?;

    let destination_band = DensityBand::classify(
        destination_density,
        destination_optimal_min,
        destination_optimal_max,
        destination_max_density,
    );
    if destination_band == DensityBand::Critical {
        warnings.push(format!(
            "destination density {destination_density:.2}kg/m³ reaches critical (max {destination_max_density}kg/m³)"
        ));
    }

    let is_valid = warnings.is_empty();
    Ok(TransferProjection {
        source_density,
        destination_density,
        destination_band,
        warnings,
        is_valid,
    })
}
