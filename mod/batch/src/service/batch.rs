use tracing::info;

use aquafarm_core::{ListParams, ListResult, ServiceError, new_id, now_rfc3339};
use sql::Value;

use crate::model::{
    Batch, BatchStatus, FeedConversion, GrowthTracking, WeightTracking, WeightVariance, WeightView,
};
use crate::service::{BatchService, batch_update_stmt, hold, insert_stmt, map_sql_err};

/// Fields a merge-patch may never touch: identity, population counters,
/// lifecycle state, and everything the engine derives itself.
const PROTECTED_BATCH_FIELDS: &[&str] = &[
    "id",
    "tenantId",
    "batchNumber",
    "speciesId",
    "initialQuantity",
    "currentQuantity",
    "totalMortality",
    "cullCount",
    "harvestedQuantity",
    "mortalityRatePercent",
    "survivalRatePercent",
    "weight",
    "growth",
    "status",
    "statusChangedAt",
    "closedAt",
    "closeReason",
    "actualHarvestDate",
    "isActive",
    "deleted",
    "createdBy",
    "createAt",
    "version",
];

pub struct CreateBatchInput {
    pub tenant_id: String,
    pub batch_number: String,
    pub species_id: String,
    pub initial_quantity: i64,
    pub initial_avg_weight_g: f64,
    /// Defaults to now.
    pub stocking_date: Option<String>,
    /// Overrides the species target FCR.
    pub target_fcr: Option<f64>,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Default)]
pub struct BatchFilters {
    pub statuses: Vec<BatchStatus>,
    pub species_id: Option<String>,
    pub is_active: Option<bool>,
}

impl BatchService {
    // ── Create / read ──

    pub fn create_batch(&self, input: CreateBatchInput) -> Result<Batch, ServiceError> {
        if input.initial_quantity < 0 {
            return Err(ServiceError::Validation(format!(
                "initial quantity must not be negative, got {}",
                input.initial_quantity
            )));
        }
        if input.initial_avg_weight_g <= 0.0 {
            return Err(ServiceError::Validation(format!(
                "initial average weight must be positive, got {}",
                input.initial_avg_weight_g
            )));
        }

        let species_params = self
            .species
            .growth_params(&input.tenant_id, &input.species_id)?;
        let target_fcr = input
            .target_fcr
            .or_else(|| species_params.as_ref().map(|p| p.target_fcr))
            .unwrap_or(0.0);

        let id = new_id();
        let now = now_rfc3339();
        let initial = WeightView::of(input.initial_quantity, input.initial_avg_weight_g);
        let record = Batch {
            id: id.clone(),
            tenant_id: input.tenant_id.clone(),
            batch_number: input.batch_number.clone(),
            species_id: input.species_id.clone(),
            initial_quantity: input.initial_quantity,
            current_quantity: input.initial_quantity,
            total_mortality: 0,
            cull_count: 0,
            harvested_quantity: 0,
            mortality_rate_percent: 0.0,
            survival_rate_percent: if input.initial_quantity > 0 { 100.0 } else { 0.0 },
            weight: WeightTracking {
                initial,
                theoretical: initial,
                actual: initial,
                variance: WeightVariance::default(),
            },
            feed: FeedConversion {
                target_fcr,
                actual_fcr: None,
                theoretical_fcr: species_params.as_ref().map(|p| p.target_fcr),
                overridden: input.target_fcr.is_some(),
                updated_at: None,
            },
            growth: GrowthTracking::default(),
            status: BatchStatus::Quarantine,
            stocking_date: input.stocking_date.unwrap_or_else(|| now.clone()),
            status_changed_at: Some(now.clone()),
            closed_at: None,
            actual_harvest_date: None,
            close_reason: None,
            is_active: true,
            deleted: false,
            description: input.description,
            created_by: input.created_by,
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
            version: 0,
        };

        let stmt = insert_stmt("batches", &id, &record, &[
            ("tenant_id", Value::Text(record.tenant_id.clone())),
            ("batch_number", Value::Text(record.batch_number.clone())),
            ("species_id", Value::Text(record.species_id.clone())),
            ("status", Value::Text(record.status.as_str().to_string())),
            ("is_active", Value::Integer(1)),
            ("version", Value::Integer(0)),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;
        self.sql.exec(&stmt.sql, &stmt.params).map_err(|e| {
            let mapped = map_sql_err(e);
            if let ServiceError::Conflict(_) = mapped {
                ServiceError::Conflict(format!(
                    "batch number '{}' already exists",
                    record.batch_number
                ))
            } else {
                mapped
            }
        })?;

        info!(batch = %record.batch_number, quantity = record.initial_quantity, "batch stocked");
        Ok(record)
    }

    pub fn get_batch(&self, tenant_id: &str, id: &str) -> Result<Batch, ServiceError> {
        self.fetch_json(
            "SELECT data FROM batches WHERE id = ?1 AND tenant_id = ?2 AND deleted = 0",
            &[Value::Text(id.to_string()), Value::Text(tenant_id.to_string())],
        )?
        .ok_or_else(|| ServiceError::NotFound(format!("batch {id} not found")))
    }

    pub fn list_batches(
        &self,
        tenant_id: &str,
        params: &ListParams,
        filters: &BatchFilters,
    ) -> Result<ListResult<Batch>, ServiceError> {
        let mut where_clauses = vec!["tenant_id = ?1".to_string(), "deleted = 0".to_string()];
        let mut sql_params: Vec<Value> = vec![Value::Text(tenant_id.to_string())];

        if let Some(ref sp) = filters.species_id {
            sql_params.push(Value::Text(sp.clone()));
            where_clauses.push(format!("species_id = ?{}", sql_params.len()));
        }
        if let Some(active) = filters.is_active {
            sql_params.push(Value::Integer(active as i64));
            where_clauses.push(format!("is_active = ?{}", sql_params.len()));
        }
        if !filters.statuses.is_empty() {
            let mut placeholders = Vec::new();
            for status in &filters.statuses {
                sql_params.push(Value::Text(status.as_str().to_string()));
                placeholders.push(format!("?{}", sql_params.len()));
            }
            where_clauses.push(format!("status IN ({})", placeholders.join(", ")));
        }

        let where_sql = where_clauses.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) as cnt FROM batches WHERE {}", where_sql);
        let rows = self.sql.query(&count_sql, &sql_params).map_err(map_sql_err)?;
        let total = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as usize;

        let limit = params.limit.min(500);
        sql_params.push(Value::Integer(limit as i64));
        let limit_idx = sql_params.len();
        sql_params.push(Value::Integer(params.offset as i64));
        let offset_idx = sql_params.len();

        let sql = format!(
            "SELECT data FROM batches WHERE {} ORDER BY create_at DESC LIMIT ?{} OFFSET ?{}",
            where_sql, limit_idx, offset_idx,
        );
        let items = self.fetch_all_json(&sql, &sql_params)?;

        Ok(ListResult { items, total })
    }

    // ── Update / delete ──

    pub fn update_batch(
        &self,
        tenant_id: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Batch, ServiceError> {
        let lock = self.keyed_lock(&format!("batch:{id}"))?;
        let _guard = hold(&lock)?;

        let current = self.get_batch(tenant_id, id)?;
        if current.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "batch {} is {} and cannot be modified",
                current.batch_number, current.status
            )));
        }

        let mut updated: Batch =
            Self::apply_patch(&current, patch, PROTECTED_BATCH_FIELDS)?;
        if (updated.feed.target_fcr - current.feed.target_fcr).abs() > f64::EPSILON {
            updated.feed.overridden = true;
            updated.feed.updated_at = Some(now_rfc3339());
        }

        let stmt = batch_update_stmt(&mut updated)?;
        self.sql.exec_batch(&[stmt]).map_err(map_sql_err)?;
        Ok(updated)
    }

    /// Soft delete. The record stays for audit; every read path filters
    /// it out.
    pub fn delete_batch(&self, tenant_id: &str, id: &str) -> Result<(), ServiceError> {
        let lock = self.keyed_lock(&format!("batch:{id}"))?;
        let _guard = hold(&lock)?;

        let mut batch = self.get_batch(tenant_id, id)?;
        batch.deleted = true;
        let now = now_rfc3339();
        batch.update_at = Some(now.clone());
        let expected = batch.version;
        batch.version += 1;
        let json = serde_json::to_string(&batch)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        self.sql
            .exec_batch(&[sql::Statement::guarded(
                "UPDATE batches SET data = ?1, deleted = 1, update_at = ?2, version = version + 1 \
                 WHERE id = ?3 AND tenant_id = ?4 AND version = ?5",
                vec![
                    Value::Text(json),
                    Value::Text(now),
                    Value::Text(id.to_string()),
                    Value::Text(tenant_id.to_string()),
                    Value::Integer(expected),
                ],
            )])
            .map_err(map_sql_err)?;
        Ok(())
    }

    // ── Lifecycle ──

    /// Explicit status change (e.g. ACTIVE → HARVESTING). Closing takes
    /// [`BatchService::close_batch`] so a reason is always recorded;
    /// HARVESTED is reached automatically when a harvest empties the
    /// batch, but may also be set explicitly.
    pub fn update_status(
        &self,
        tenant_id: &str,
        id: &str,
        next: BatchStatus,
    ) -> Result<Batch, ServiceError> {
        if next == BatchStatus::Closed {
            return Err(ServiceError::Validation(
                "closing requires a reason; use close_batch".into(),
            ));
        }

        let lock = self.keyed_lock(&format!("batch:{id}"))?;
        let _guard = hold(&lock)?;

        let mut batch = self.get_batch(tenant_id, id)?;
        let now = now_rfc3339();
        batch.transition_to(next, &now)?;
        batch.update_at = Some(now.clone());

        let stmt = batch_update_stmt(&mut batch)?;
        self.sql.exec_batch(&[stmt]).map_err(map_sql_err)?;

        info!(batch = %batch.batch_number, status = %batch.status, "batch status changed");
        Ok(batch)
    }

    /// Close from any non-terminal status. Deactivates the batch and
    /// records why.
    pub fn close_batch(
        &self,
        tenant_id: &str,
        id: &str,
        reason: &str,
    ) -> Result<Batch, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::Validation("close reason is required".into()));
        }

        let lock = self.keyed_lock(&format!("batch:{id}"))?;
        let _guard = hold(&lock)?;

        let mut batch = self.get_batch(tenant_id, id)?;
        let now = now_rfc3339();
        batch.transition_to(BatchStatus::Closed, &now)?;
        batch.close_reason = Some(reason.to_string());
        batch.update_at = Some(now.clone());

        let stmt = batch_update_stmt(&mut batch)?;
        self.sql.exec_batch(&[stmt]).map_err(map_sql_err)?;

        info!(batch = %batch.batch_number, reason, "batch closed");
        Ok(batch)
    }

    /// Cancel a batch that never reached production (QUARANTINE or
    /// ACTIVE only, enforced by the transition table).
    pub fn cancel_batch(
        &self,
        tenant_id: &str,
        id: &str,
        reason: Option<&str>,
    ) -> Result<Batch, ServiceError> {
        let lock = self.keyed_lock(&format!("batch:{id}"))?;
        let _guard = hold(&lock)?;

        let mut batch = self.get_batch(tenant_id, id)?;
        let now = now_rfc3339();
        batch.transition_to(BatchStatus::Cancelled, &now)?;
        batch.close_reason = reason.map(str::to_string);
        batch.update_at = Some(now.clone());

        let stmt = batch_update_stmt(&mut batch)?;
        self.sql.exec_batch(&[stmt]).map_err(map_sql_err)?;

        info!(batch = %batch.batch_number, "batch cancelled");
        Ok(batch)
    }

    /// Shared write-path precondition: the batch must be mutable.
    pub(crate) fn require_writable(batch: &Batch) -> Result<(), ServiceError> {
        if batch.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "batch {} is {} and cannot be modified",
                batch.batch_number, batch.status
            )));
        }
        if !batch.is_active {
            return Err(ServiceError::NotFound(format!(
                "batch {} is inactive",
                batch.batch_number
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::{TENANT, service, stock_input};

    #[test]
    fn create_batch_initializes_views() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        assert_eq!(b.status, BatchStatus::Quarantine);
        assert_eq!(b.initial_quantity, 10_000);
        assert_eq!(b.current_quantity, 10_000);
        assert!((b.weight.initial.biomass_kg - 50.0).abs() < 1e-9);
        assert_eq!(b.weight.actual, b.weight.initial);
        assert_eq!(b.weight.theoretical, b.weight.initial);
        // Species target FCR picked up, not overridden.
        assert!((b.feed.target_fcr - 1.2).abs() < 1e-9);
        assert!(!b.feed.overridden);
        assert!(b.population_balanced());

        let fetched = svc.get_batch(TENANT, &b.id).unwrap();
        assert_eq!(fetched, b);
    }

    #[test]
    fn create_batch_rejects_bad_input() {
        let svc = service();
        let mut input = stock_input("B-001");
        input.initial_quantity = -1;
        assert!(matches!(
            svc.create_batch(input),
            Err(ServiceError::Validation(_))
        ));

        let mut input = stock_input("B-001");
        input.initial_avg_weight_g = 0.0;
        assert!(matches!(
            svc.create_batch(input),
            Err(ServiceError::Validation(_))
        ));

        // Zero quantity is allowed (only negatives are rejected).
        let mut input = stock_input("B-zero");
        input.initial_quantity = 0;
        assert!(svc.create_batch(input).is_ok());
    }

    #[test]
    fn duplicate_batch_number_conflicts() {
        let svc = service();
        svc.create_batch(stock_input("B-001")).unwrap();
        assert!(matches!(
            svc.create_batch(stock_input("B-001")),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn operator_fcr_override_wins() {
        let svc = service();
        let mut input = stock_input("B-001");
        input.target_fcr = Some(1.05);
        let b = svc.create_batch(input).unwrap();
        assert!((b.feed.target_fcr - 1.05).abs() < 1e-9);
        assert!(b.feed.overridden);
        assert_eq!(b.feed.theoretical_fcr, Some(1.2));
    }

    #[test]
    fn list_batches_filters() {
        let svc = service();
        let a = svc.create_batch(stock_input("B-001")).unwrap();
        let b = svc.create_batch(stock_input("B-002")).unwrap();
        svc.create_batch(stock_input("B-003")).unwrap();
        svc.update_status(TENANT, &a.id, BatchStatus::Active).unwrap();
        svc.cancel_batch(TENANT, &b.id, None).unwrap();

        let all = svc
            .list_batches(TENANT, &ListParams::default(), &BatchFilters::default())
            .unwrap();
        assert_eq!(all.total, 3);

        let active_only = svc
            .list_batches(TENANT, &ListParams::default(), &BatchFilters {
                statuses: vec![BatchStatus::Active],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active_only.total, 1);
        assert_eq!(active_only.items[0].id, a.id);

        let live = svc
            .list_batches(TENANT, &ListParams::default(), &BatchFilters {
                is_active: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(live.total, 2);

        // Other tenants see nothing.
        let other = svc
            .list_batches("farm2", &ListParams::default(), &BatchFilters::default())
            .unwrap();
        assert_eq!(other.total, 0);
    }

    #[test]
    fn tenant_isolation_on_get() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        assert!(matches!(
            svc.get_batch("farm2", &b.id),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn patch_protects_population_and_identity() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        let patched = svc
            .update_batch(
                TENANT,
                &b.id,
                serde_json::json!({
                    "description": "brood 7",
                    "currentQuantity": 1,
                    "initialQuantity": 1,
                    "status": "CLOSED",
                    "batchNumber": "HACKED",
                }),
            )
            .unwrap();
        assert_eq!(patched.description.as_deref(), Some("brood 7"));
        assert_eq!(patched.current_quantity, 10_000);
        assert_eq!(patched.initial_quantity, 10_000);
        assert_eq!(patched.status, BatchStatus::Quarantine);
        assert_eq!(patched.batch_number, "B-001");
        assert_eq!(patched.version, 1);
    }

    #[test]
    fn status_flow_and_terminal_rules() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();

        // Quarantine cannot start harvesting.
        assert!(matches!(
            svc.update_status(TENANT, &b.id, BatchStatus::Harvesting),
            Err(ServiceError::InvalidState(_))
        ));

        svc.update_status(TENANT, &b.id, BatchStatus::Active).unwrap();
        svc.update_status(TENANT, &b.id, BatchStatus::Harvesting).unwrap();

        // Closing needs a reason.
        assert!(matches!(
            svc.update_status(TENANT, &b.id, BatchStatus::Closed),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.close_batch(TENANT, &b.id, "  "),
            Err(ServiceError::Validation(_))
        ));

        let closed = svc.close_batch(TENANT, &b.id, "season end").unwrap();
        assert_eq!(closed.status, BatchStatus::Closed);
        assert!(!closed.is_active);
        assert_eq!(closed.close_reason.as_deref(), Some("season end"));
        assert!(closed.closed_at.is_some());

        // Terminal: no further mutation.
        assert!(matches!(
            svc.update_status(TENANT, &b.id, BatchStatus::Active),
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            svc.update_batch(TENANT, &b.id, serde_json::json!({"description": "x"})),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn cancel_only_from_early_states() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        svc.update_status(TENANT, &b.id, BatchStatus::Active).unwrap();
        svc.update_status(TENANT, &b.id, BatchStatus::Harvesting).unwrap();
        assert!(matches!(
            svc.cancel_batch(TENANT, &b.id, Some("mistake")),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn soft_delete_hides_batch() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        svc.delete_batch(TENANT, &b.id).unwrap();
        assert!(matches!(
            svc.get_batch(TENANT, &b.id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_batch(TENANT, &b.id),
            Err(ServiceError::NotFound(_))
        ));
    }
}
