//! Read-only reference data consumed from other subsystems.
//!
//! Species growth parameters and container specifications are owned
//! elsewhere; this engine only reads them, through injected trait
//! objects. Lookups are fast synchronous reads — retry policy, if any,
//! belongs to the providing collaborator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use aquafarm_core::ServiceError;

use crate::model::ContainerKind;

/// Species-level growth reference values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesGrowthParams {
    pub species_id: String,
    /// Reference linear growth, grams per day.
    pub avg_daily_growth_g: f64,
    /// Expected survival over a full production cycle, percent.
    pub expected_survival_percent: f64,
    pub target_fcr: f64,
}

/// Physical specification of a growing container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub container_id: String,
    pub container_kind: ContainerKind,
    /// Water volume in m³. Zero means "not configured" and rejects any
    /// density-dependent operation.
    pub volume_m3: f64,
    pub max_density_kg_m3: f64,
    pub optimal_density_min: f64,
    pub optimal_density_max: f64,
}

/// Species growth-parameter lookup, keyed by species id within a tenant.
pub trait SpeciesDirectory: Send + Sync {
    fn growth_params(
        &self,
        tenant_id: &str,
        species_id: &str,
    ) -> Result<Option<SpeciesGrowthParams>, ServiceError>;
}

/// Container specification lookup, keyed by container id within a tenant.
pub trait ContainerDirectory: Send + Sync {
    fn spec(
        &self,
        tenant_id: &str,
        container_id: &str,
    ) -> Result<Option<ContainerSpec>, ServiceError>;
}

/// In-memory species directory, for tests and embedders that load
/// reference data upfront.
#[derive(Debug, Default)]
pub struct InMemorySpecies {
    entries: HashMap<(String, String), SpeciesGrowthParams>,
}

impl InMemorySpecies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tenant_id: &str, params: SpeciesGrowthParams) {
        self.entries
            .insert((tenant_id.to_string(), params.species_id.clone()), params);
    }
}

impl SpeciesDirectory for InMemorySpecies {
    fn growth_params(
        &self,
        tenant_id: &str,
        species_id: &str,
    ) -> Result<Option<SpeciesGrowthParams>, ServiceError> {
        Ok(self
            .entries
            .get(&(tenant_id.to_string(), species_id.to_string()))
            .cloned())
    }
}

/// In-memory container directory.
#[derive(Debug, Default)]
pub struct InMemoryContainers {
    entries: HashMap<(String, String), ContainerSpec>,
}

impl InMemoryContainers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tenant_id: &str, spec: ContainerSpec) {
        self.entries
            .insert((tenant_id.to_string(), spec.container_id.clone()), spec);
    }
}

impl ContainerDirectory for InMemoryContainers {
    fn spec(
        &self,
        tenant_id: &str,
        container_id: &str,
    ) -> Result<Option<ContainerSpec>, ServiceError> {
        Ok(self
            .entries
            .get(&(tenant_id.to_string(), container_id.to_string()))
            .cloned())
    }
}
