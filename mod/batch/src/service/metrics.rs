use serde::Serialize;
use tracing::info;

use aquafarm_core::{ServiceError, days_between, now_rfc3339};

use crate::metrics::{
    GrowthRating, biomass_kg, daily_growth_rate, feed_conversion_ratio, specific_growth_rate,
};
use crate::model::{Batch, WeightVariance, WeightView};
use crate::service::{BatchService, batch_update_stmt, hold, map_sql_err};

/// Forward biomass projection from the species growth model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiomassProjection {
    pub batch_id: String,
    pub days_forward: i64,
    pub current_quantity: i64,
    pub current_avg_weight_g: f64,
    pub current_biomass_kg: f64,
    pub projected_avg_weight_g: f64,
    pub projected_biomass_kg: f64,
    /// Species reference, surfaced so callers can model losses; the
    /// projection itself assumes the current population.
    pub expected_survival_percent: f64,
}

impl BatchService {
    /// Recompute the growth block and the theoretical weight view.
    ///
    /// Called whenever the actual weight view moves (sampling) and from
    /// explicit metric refreshes. Sparse data produces sentinel values,
    /// never errors.
    pub(crate) fn refresh_growth(
        &self,
        batch: &mut Batch,
        now: &str,
    ) -> Result<(), ServiceError> {
        let days = days_between(&batch.stocking_date, now).unwrap_or(0).max(0);
        batch.growth.days_in_production = days;

        let sgr = specific_growth_rate(
            batch.weight.initial.avg_weight_g,
            batch.weight.actual.avg_weight_g,
            days as f64,
        );
        batch.growth.sgr = Some(sgr);
        batch.growth.rating = Some(GrowthRating::from_sgr(sgr));
        let actual_rate = daily_growth_rate(
            batch.weight.initial.avg_weight_g,
            batch.weight.actual.avg_weight_g,
            days as f64,
        );
        batch.growth.daily_rate_actual_g = Some(actual_rate);

        if let Some(params) = self
            .species
            .growth_params(&batch.tenant_id, &batch.species_id)?
        {
            batch.growth.daily_rate_target_g = Some(params.avg_daily_growth_g);
            batch.growth.rate_variance_percent = if params.avg_daily_growth_g > 0.0 {
                Some(
                    (actual_rate - params.avg_daily_growth_g) / params.avg_daily_growth_g * 100.0,
                )
            } else {
                None
            };

            let theoretical_avg =
                batch.weight.initial.avg_weight_g + params.avg_daily_growth_g * days as f64;
            batch.weight.theoretical = WeightView::of(batch.current_quantity, theoretical_avg);
            batch.weight.variance =
                WeightVariance::between(&batch.weight.theoretical, &batch.weight.actual);
            batch.feed.theoretical_fcr = Some(params.target_fcr);
        }

        Ok(())
    }

    /// Refresh growth metrics and — given cumulative feed consumption —
    /// the actual FCR. Mortality biomass is valued at the current
    /// actual average weight.
    pub fn update_batch_metrics(
        &self,
        tenant_id: &str,
        batch_id: &str,
        feed_consumed_kg: Option<f64>,
    ) -> Result<Batch, ServiceError> {
        if let Some(feed) = feed_consumed_kg {
            if feed < 0.0 {
                return Err(ServiceError::Validation(format!(
                    "feed consumption must not be negative, got {feed}"
                )));
            }
        }

        let lock = self.keyed_lock(&format!("batch:{batch_id}"))?;
        let _guard = hold(&lock)?;

        let mut batch = self.get_batch(tenant_id, batch_id)?;
        Self::require_writable(&batch)?;

        let now = now_rfc3339();
        self.refresh_growth(&mut batch, &now)?;
        batch.recompute_rates();

        if let Some(feed) = feed_consumed_kg {
            let mortality_biomass =
                biomass_kg(batch.total_mortality, batch.weight.actual.avg_weight_g);
            batch.feed.actual_fcr = feed_conversion_ratio(
                feed,
                batch.weight.actual.biomass_kg,
                batch.weight.initial.biomass_kg,
                mortality_biomass,
            );
            batch.feed.updated_at = Some(now.clone());
        }
        batch.update_at = Some(now);

        let stmt = batch_update_stmt(&mut batch)?;
        self.sql.exec_batch(&[stmt]).map_err(map_sql_err)?;

        info!(batch = %batch.batch_number, sgr = ?batch.growth.sgr, fcr = ?batch.feed.actual_fcr, "metrics updated");
        Ok(batch)
    }

    /// Project average weight and biomass `days_forward` days out,
    /// using the species daily growth reference at the current
    /// population.
    pub fn project_biomass(
        &self,
        tenant_id: &str,
        batch_id: &str,
        days_forward: i64,
    ) -> Result<BiomassProjection, ServiceError> {
        if days_forward < 0 {
            return Err(ServiceError::Validation(format!(
                "projection days must not be negative, got {days_forward}"
            )));
        }

        let batch = self.get_batch(tenant_id, batch_id)?;
        let params = self
            .species
            .growth_params(tenant_id, &batch.species_id)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "growth parameters for species {} not found",
                    batch.species_id
                ))
            })?;

        let projected_avg =
            batch.weight.actual.avg_weight_g + params.avg_daily_growth_g * days_forward as f64;
        Ok(BiomassProjection {
            batch_id: batch.id.clone(),
            days_forward,
            current_quantity: batch.current_quantity,
            current_avg_weight_g: batch.weight.actual.avg_weight_g,
            current_biomass_kg: batch.weight.actual.biomass_kg,
            projected_avg_weight_g: projected_avg,
            projected_biomass_kg: biomass_kg(batch.current_quantity, projected_avg),
            expected_survival_percent: params.expected_survival_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AllocationType, OperationDetail};
    use crate::service::allocation::AllocateInput;
    use crate::service::operation::RecordOperationInput;
    use crate::service::testutil::{TENANT, service, stock_input};

    /// RFC 3339 timestamp a little over `days` days in the past, so
    /// whole-day arithmetic lands exactly on `days`.
    fn days_ago(days: i64) -> String {
        (chrono::Utc::now() - chrono::Duration::days(days) - chrono::Duration::hours(1))
            .to_rfc3339()
    }

    fn stocked_14_days_ago(svc: &BatchService) -> String {
        let mut input = stock_input("B-001");
        input.stocking_date = Some(days_ago(14));
        let b = svc.create_batch(input).unwrap();
        svc.allocate_to_tank(AllocateInput {
            tenant_id: TENANT.into(),
            batch_id: b.id.clone(),
            tank_id: "tank-a".into(),
            quantity: 10_000,
            avg_weight_g: 5.0,
            allocation_type: AllocationType::InitialStocking,
            source_tank_id: None,
            allocated_by: None,
        })
        .unwrap();
        b.id
    }

    #[test]
    fn sampling_drives_growth_metrics() {
        let svc = service();
        let batch_id = stocked_14_days_ago(&svc);

        let result = svc
            .record_operation(RecordOperationInput {
                tenant_id: TENANT.into(),
                batch_id: batch_id.clone(),
                tank_id: "tank-a".into(),
                quantity: 30,
                avg_weight_g: Some(250.0),
                detail: OperationDetail::Sampling {
                    sample_size: Some(30),
                    notes: None,
                },
                recorded_by: None,
            })
            .unwrap();

        let growth = &result.batch.growth;
        assert_eq!(growth.days_in_production, 14);
        // ln(250/5) / 14 * 100 ≈ 27.95
        let sgr = growth.sgr.unwrap();
        assert!((sgr - 27.95).abs() < 0.1, "got {sgr}");
        assert_eq!(growth.rating, Some(GrowthRating::Excellent));
        assert!((growth.daily_rate_actual_g.unwrap() - 17.5).abs() < 1e-9);
        assert_eq!(growth.daily_rate_target_g, Some(4.5));

        // Theoretical view follows the species model: 5 + 4.5 × 14 = 68g.
        let weight = &result.batch.weight;
        assert!((weight.theoretical.avg_weight_g - 68.0).abs() < 1e-9);
        assert!(weight.variance.significant);
    }

    #[test]
    fn update_metrics_computes_fcr() {
        let svc = service();
        let batch_id = stocked_14_days_ago(&svc);

        svc.record_operation(RecordOperationInput {
            tenant_id: TENANT.into(),
            batch_id: batch_id.clone(),
            tank_id: "tank-a".into(),
            quantity: 500,
            avg_weight_g: None,
            detail: OperationDetail::Mortality {
                reason: "disease".into(),
                notes: None,
            },
            recorded_by: None,
        })
        .unwrap();
        svc.record_operation(RecordOperationInput {
            tenant_id: TENANT.into(),
            batch_id: batch_id.clone(),
            tank_id: "tank-a".into(),
            quantity: 30,
            avg_weight_g: Some(250.0),
            detail: OperationDetail::Sampling {
                sample_size: Some(30),
                notes: None,
            },
            recorded_by: None,
        })
        .unwrap();

        let batch = svc
            .update_batch_metrics(TENANT, &batch_id, Some(3_000.0))
            .unwrap();

        // gain = 2375 - 50 + (500 × 250g = 125kg mortality) = 2450kg.
        let fcr = batch.feed.actual_fcr.unwrap();
        assert!((fcr - 3_000.0 / 2_450.0).abs() < 1e-6, "got {fcr}");
        assert!(batch.feed.updated_at.is_some());
        assert_eq!(batch.feed.theoretical_fcr, Some(1.2));
    }

    #[test]
    fn fcr_is_sentinel_without_gain() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        // No growth recorded: gain is zero, FCR stays None.
        let batch = svc
            .update_batch_metrics(TENANT, &b.id, Some(100.0))
            .unwrap();
        assert_eq!(batch.feed.actual_fcr, None);
    }

    #[test]
    fn negative_feed_rejected() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        assert!(matches!(
            svc.update_batch_metrics(TENANT, &b.id, Some(-1.0)),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn biomass_projection_follows_species_growth() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();

        let p = svc.project_biomass(TENANT, &b.id, 30).unwrap();
        // 5g + 4.5 g/day × 30 = 140g; 10,000 × 140g = 1,400kg.
        assert!((p.projected_avg_weight_g - 140.0).abs() < 1e-9);
        assert!((p.projected_biomass_kg - 1_400.0).abs() < 1e-6);
        assert_eq!(p.current_quantity, 10_000);
        assert!((p.expected_survival_percent - 92.0).abs() < 1e-9);

        let today = svc.project_biomass(TENANT, &b.id, 0).unwrap();
        assert!((today.projected_biomass_kg - today.current_biomass_kg).abs() < 1e-9);

        assert!(matches!(
            svc.project_biomass(TENANT, &b.id, -1),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn projection_requires_species_params() {
        let svc = service();
        let mut input = stock_input("B-001");
        input.species_id = "trout".into();
        let b = svc.create_batch(input).unwrap();
        assert!(matches!(
            svc.project_biomass(TENANT, &b.id, 10),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn metrics_update_rejected_on_terminal_batch() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        svc.close_batch(TENANT, &b.id, "abandoned").unwrap();
        assert!(matches!(
            svc.update_batch_metrics(TENANT, &b.id, None),
            Err(ServiceError::InvalidState(_))
        ));
    }
}
