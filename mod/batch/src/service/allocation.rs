use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use aquafarm_core::{ServiceError, new_id, now_rfc3339};
use sql::{Statement, Value};

use crate::metrics::{biomass_kg, density};
use crate::model::{
    AllocationType, Batch, BatchLocation, BatchShare, BatchStatus, TankAllocation, TankSnapshot,
};
use crate::refdata::ContainerSpec;
use crate::service::{BatchService, batch_update_stmt, hold, insert_stmt, map_sql_err};

pub struct AllocateInput {
    pub tenant_id: String,
    pub batch_id: String,
    pub tank_id: String,
    pub quantity: i64,
    pub avg_weight_g: f64,
    pub allocation_type: AllocationType,
    /// Originating tank for transfer-in entries.
    pub source_tank_id: Option<String>,
    pub allocated_by: Option<String>,
}

pub struct AllocationResult {
    pub allocation: TankAllocation,
    pub snapshot: TankSnapshot,
    pub batch: Batch,
    /// Advisory: set when the projected density exceeds the tank's
    /// configured maximum. The allocation itself succeeded.
    pub capacity_warning: Option<String>,
}

impl BatchService {
    /// Assign part of a batch's population to a tank.
    ///
    /// Writes one immutable ledger entry, fully recomputes the tank
    /// snapshot, maintains the batch location, and — on a batch still
    /// in quarantine — activates it; all in one transaction. Exceeding
    /// the tank's max density is a warning, never a failure.
    pub fn allocate_to_tank(&self, input: AllocateInput) -> Result<AllocationResult, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::Validation(format!(
                "allocation quantity must be positive, got {}",
                input.quantity
            )));
        }
        if input.avg_weight_g <= 0.0 {
            return Err(ServiceError::Validation(format!(
                "average weight must be positive, got {}",
                input.avg_weight_g
            )));
        }

        let batch_lock = self.keyed_lock(&format!("batch:{}", input.batch_id))?;
        let _batch_guard = hold(&batch_lock)?;
        let tank_lock = self.keyed_lock(&format!("tank:{}", input.tank_id))?;
        let _tank_guard = hold(&tank_lock)?;

        let mut batch = self.get_batch(&input.tenant_id, &input.batch_id)?;
        Self::require_writable(&batch)?;
        let spec = self.container_spec(&input.tenant_id, &input.tank_id)?;

        let now = now_rfc3339();
        let signed_quantity = input.allocation_type.signed(input.quantity);
        let signed_biomass = if signed_quantity < 0 {
            -biomass_kg(-signed_quantity, input.avg_weight_g)
        } else {
            biomass_kg(signed_quantity, input.avg_weight_g)
        };

        let mut allocation = TankAllocation {
            id: new_id(),
            tenant_id: input.tenant_id.clone(),
            batch_id: input.batch_id.clone(),
            tank_id: input.tank_id.clone(),
            allocation_type: input.allocation_type,
            quantity: signed_quantity,
            avg_weight_g: input.avg_weight_g,
            biomass_kg: signed_biomass,
            density_after: 0.0,
            source_tank_id: input.source_tank_id,
            allocated_by: input.allocated_by,
            deleted: false,
            create_at: Some(now.clone()),
        };

        let snapshot =
            self.project_snapshot(&input.tenant_id, &input.tank_id, &spec, &[&allocation], &now)?;
        allocation.density_after = snapshot.density;

        let capacity_warning = if snapshot.is_over_capacity {
            let msg = format!(
                "tank {} density {:.2}kg/m³ exceeds max {}kg/m³",
                input.tank_id, snapshot.density, spec.max_density_kg_m3
            );
            warn!(tank = %input.tank_id, density = snapshot.density, "capacity exceeded");
            Some(msg)
        } else {
            None
        };

        // First successful allocation activates a quarantined batch,
        // inside the same unit.
        if batch.status == BatchStatus::Quarantine {
            batch.transition_to(BatchStatus::Active, &now)?;
        }
        batch.update_at = Some(now.clone());

        let mut stmts = vec![
            batch_update_stmt(&mut batch)?,
            allocation_insert_stmt(&allocation)?,
            snapshot_upsert_stmt(&snapshot)?,
        ];
        let share = snapshot.batches.iter().find(|s| s.batch_id == batch.id);
        stmts.extend(self.location_stmts(&input.tenant_id, &batch.id, &spec, share, &now)?);

        self.sql.exec_batch(&stmts).map_err(map_sql_err)?;

        info!(
            batch = %batch.batch_number,
            tank = %input.tank_id,
            quantity = signed_quantity,
            kind = %input.allocation_type,
            "allocation recorded"
        );
        Ok(AllocationResult {
            allocation,
            snapshot,
            batch,
            capacity_warning,
        })
    }

    /// Void a ledger entry (administrative correction). The entry is
    /// soft-deleted and the tank snapshot fully reconverges on the
    /// remaining entries.
    pub fn void_allocation(
        &self,
        tenant_id: &str,
        allocation_id: &str,
    ) -> Result<TankSnapshot, ServiceError> {
        let target: TankAllocation = self
            .fetch_json(
                "SELECT data FROM tank_allocations WHERE id = ?1 AND tenant_id = ?2 AND deleted = 0",
                &[
                    Value::Text(allocation_id.to_string()),
                    Value::Text(tenant_id.to_string()),
                ],
            )?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("allocation {allocation_id} not found"))
            })?;

        let batch_lock = self.keyed_lock(&format!("batch:{}", target.batch_id))?;
        let _batch_guard = hold(&batch_lock)?;
        let tank_lock = self.keyed_lock(&format!("tank:{}", target.tank_id))?;
        let _tank_guard = hold(&tank_lock)?;

        let spec = self.container_spec(tenant_id, &target.tank_id)?;
        let now = now_rfc3339();

        // Project over the surviving entries: the row being voided is
        // still active in storage until this unit commits.
        let remaining: Vec<TankAllocation> = self
            .active_allocations(tenant_id, &target.tank_id)?
            .into_iter()
            .filter(|a| a.id != allocation_id)
            .collect();
        let snapshot =
            self.project_from(tenant_id, &target.tank_id, &spec, remaining.iter(), &now)?;

        let mut stmts = vec![
            Statement::guarded(
                "UPDATE tank_allocations SET deleted = 1 WHERE id = ?1 AND tenant_id = ?2 AND deleted = 0",
                vec![
                    Value::Text(allocation_id.to_string()),
                    Value::Text(tenant_id.to_string()),
                ],
            ),
            snapshot_upsert_stmt(&snapshot)?,
        ];
        let share = snapshot
            .batches
            .iter()
            .find(|s| s.batch_id == target.batch_id);
        stmts.extend(self.location_stmts(tenant_id, &target.batch_id, &spec, share, &now)?);

        self.sql.exec_batch(&stmts).map_err(map_sql_err)?;
        info!(allocation = %allocation_id, tank = %target.tank_id, "allocation voided");
        Ok(snapshot)
    }

    // ── Queries ──

    pub fn get_batch_allocations(
        &self,
        tenant_id: &str,
        batch_id: &str,
    ) -> Result<Vec<TankAllocation>, ServiceError> {
        self.fetch_all_json(
            "SELECT data FROM tank_allocations WHERE tenant_id = ?1 AND batch_id = ?2 \
             AND deleted = 0 ORDER BY create_at ASC, id ASC",
            &[
                Value::Text(tenant_id.to_string()),
                Value::Text(batch_id.to_string()),
            ],
        )
    }

    pub fn get_tank_snapshot(
        &self,
        tenant_id: &str,
        tank_id: &str,
    ) -> Result<TankSnapshot, ServiceError> {
        self.read_snapshot(tenant_id, tank_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("no snapshot for tank {tank_id}")))
    }

    pub fn get_batch_locations(
        &self,
        tenant_id: &str,
        batch_id: &str,
    ) -> Result<Vec<BatchLocation>, ServiceError> {
        self.fetch_all_json(
            "SELECT data FROM batch_locations WHERE tenant_id = ?1 AND batch_id = ?2 \
             AND deleted = 0 ORDER BY create_at ASC, id ASC",
            &[
                Value::Text(tenant_id.to_string()),
                Value::Text(batch_id.to_string()),
            ],
        )
    }

    // ── Snapshot projection ──

    pub(crate) fn read_snapshot(
        &self,
        tenant_id: &str,
        tank_id: &str,
    ) -> Result<Option<TankSnapshot>, ServiceError> {
        self.fetch_json(
            "SELECT data FROM tank_snapshots WHERE tenant_id = ?1 AND tank_id = ?2",
            &[
                Value::Text(tenant_id.to_string()),
                Value::Text(tank_id.to_string()),
            ],
        )
    }

    pub(crate) fn active_allocations(
        &self,
        tenant_id: &str,
        tank_id: &str,
    ) -> Result<Vec<TankAllocation>, ServiceError> {
        self.fetch_all_json(
            "SELECT data FROM tank_allocations WHERE tenant_id = ?1 AND tank_id = ?2 AND deleted = 0",
            &[
                Value::Text(tenant_id.to_string()),
                Value::Text(tank_id.to_string()),
            ],
        )
    }

    /// The snapshot over the tank's active ledger entries plus `extra`
    /// (entries being written in the same unit).
    pub(crate) fn project_snapshot(
        &self,
        tenant_id: &str,
        tank_id: &str,
        spec: &ContainerSpec,
        extra: &[&TankAllocation],
        now: &str,
    ) -> Result<TankSnapshot, ServiceError> {
        let stored = self.active_allocations(tenant_id, tank_id)?;
        self.project_from(
            tenant_id,
            tank_id,
            spec,
            stored.iter().chain(extra.iter().copied()),
            now,
        )
    }

    /// Full recomputation over an explicit set of ledger entries —
    /// never an incremental patch, so the snapshot converges even after
    /// corrective or voided entries.
    pub(crate) fn project_from<'a>(
        &self,
        tenant_id: &str,
        tank_id: &str,
        spec: &ContainerSpec,
        allocations: impl IntoIterator<Item = &'a TankAllocation>,
        now: &str,
    ) -> Result<TankSnapshot, ServiceError> {
        // Group by batch, summing quantity and biomass.
        let mut shares: BTreeMap<String, (i64, f64)> = BTreeMap::new();
        let mut last_allocation_at: Option<String> = None;
        for alloc in allocations {
            let entry = shares.entry(alloc.batch_id.clone()).or_insert((0, 0.0));
            entry.0 += alloc.quantity;
            entry.1 += alloc.biomass_kg;
            if alloc.create_at > last_allocation_at {
                last_allocation_at = alloc.create_at.clone();
            }
        }

        let total_quantity: i64 = shares.values().map(|(q, _)| q).sum();
        let total_biomass_kg: f64 = shares.values().map(|(_, b)| b).sum();

        let batches: Vec<BatchShare> = shares
            .into_iter()
            .filter(|(_, (q, _))| *q != 0)
            .map(|(batch_id, (quantity, biomass))| BatchShare {
                batch_id,
                quantity,
                biomass_kg: biomass,
                percent_of_tank: if total_quantity > 0 {
                    quantity as f64 / total_quantity as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        let primary_batch_id = batches
            .iter()
            .max_by_key(|s| s.quantity)
            .map(|s| s.batch_id.clone());

        let avg_weight_g = if total_quantity > 0 {
            total_biomass_kg * 1000.0 / total_quantity as f64
        } else {
            0.0
        };

        let tank_density = density(total_biomass_kg.max(0.0), spec.volume_m3)?;
        let (capacity_used_percent, is_over_capacity) = if spec.max_density_kg_m3 > 0.0 {
            (
                tank_density / spec.max_density_kg_m3 * 100.0,
                tank_density > spec.max_density_kg_m3,
            )
        } else {
            (0.0, false)
        };

        // Operation timestamps survive the rebuild.
        let last_operation_at = self
            .read_snapshot(tenant_id, tank_id)?
            .and_then(|s| s.last_operation_at);

        debug!(tank = %tank_id, total_quantity, total_biomass_kg, "snapshot rebuilt");
        Ok(TankSnapshot {
            tank_id: tank_id.to_string(),
            tenant_id: tenant_id.to_string(),
            primary_batch_id,
            total_quantity,
            total_biomass_kg,
            avg_weight_g,
            density: tank_density,
            is_mixed_batch: batches.len() > 1,
            batches,
            capacity_used_percent,
            is_over_capacity,
            last_allocation_at,
            last_operation_at,
            update_at: now.to_string(),
        })
    }

    /// Statements keeping the batch's location row in step with its
    /// share of the container: open on first stock, update while
    /// present, close when the share empties.
    pub(crate) fn location_stmts(
        &self,
        tenant_id: &str,
        batch_id: &str,
        spec: &ContainerSpec,
        share: Option<&BatchShare>,
        now: &str,
    ) -> Result<Vec<Statement>, ServiceError> {
        let existing: Option<BatchLocation> = self.fetch_json(
            "SELECT data FROM batch_locations WHERE tenant_id = ?1 AND batch_id = ?2 \
             AND container_id = ?3 AND is_current = 1 AND deleted = 0",
            &[
                Value::Text(tenant_id.to_string()),
                Value::Text(batch_id.to_string()),
                Value::Text(spec.container_id.clone()),
            ],
        )?;

        let live_share = share.filter(|s| s.quantity > 0);
        match (existing, live_share) {
            (None, Some(share)) => {
                let location = BatchLocation {
                    id: new_id(),
                    tenant_id: tenant_id.to_string(),
                    batch_id: batch_id.to_string(),
                    container_id: spec.container_id.clone(),
                    container_kind: spec.container_kind,
                    quantity: share.quantity,
                    biomass_kg: share.biomass_kg,
                    is_current_location: true,
                    entered_at: now.to_string(),
                    exited_at: None,
                    deleted: false,
                    update_at: Some(now.to_string()),
                };
                let id = location.id.clone();
                Ok(vec![insert_stmt("batch_locations", &id, &location, &[
                    ("tenant_id", Value::Text(tenant_id.to_string())),
                    ("batch_id", Value::Text(batch_id.to_string())),
                    ("container_id", Value::Text(spec.container_id.clone())),
                    ("is_current", Value::Integer(1)),
                    ("create_at", Value::Text(now.to_string())),
                ])?])
            }
            (Some(mut location), Some(share)) => {
                location.quantity = share.quantity;
                location.biomass_kg = share.biomass_kg;
                location.update_at = Some(now.to_string());
                Ok(vec![location_update_stmt(&location)?])
            }
            (Some(mut location), None) => {
                location.quantity = 0;
                location.biomass_kg = 0.0;
                location.is_current_location = false;
                location.exited_at = Some(now.to_string());
                location.update_at = Some(now.to_string());
                Ok(vec![location_update_stmt(&location)?])
            }
            (None, None) => Ok(Vec::new()),
        }
    }
}

pub(crate) fn allocation_insert_stmt(alloc: &TankAllocation) -> Result<Statement, ServiceError> {
    insert_stmt("tank_allocations", &alloc.id, alloc, &[
        ("tenant_id", Value::Text(alloc.tenant_id.clone())),
        ("batch_id", Value::Text(alloc.batch_id.clone())),
        ("tank_id", Value::Text(alloc.tank_id.clone())),
        (
            "allocation_type",
            Value::Text(alloc.allocation_type.as_str().to_string()),
        ),
        (
            "create_at",
            Value::Text(alloc.create_at.clone().unwrap_or_default()),
        ),
    ])
}

pub(crate) fn snapshot_upsert_stmt(snapshot: &TankSnapshot) -> Result<Statement, ServiceError> {
    let json = serde_json::to_string(snapshot)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok(Statement::new(
        "INSERT INTO tank_snapshots (tenant_id, tank_id, data, update_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(tenant_id, tank_id) DO UPDATE SET data = excluded.data, update_at = excluded.update_at",
        vec![
            Value::Text(snapshot.tenant_id.clone()),
            Value::Text(snapshot.tank_id.clone()),
            Value::Text(json),
            Value::Text(snapshot.update_at.clone()),
        ],
    ))
}

fn location_update_stmt(location: &BatchLocation) -> Result<Statement, ServiceError> {
    let json = serde_json::to_string(location)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok(Statement::new(
        "UPDATE batch_locations SET data = ?1, is_current = ?2 WHERE id = ?3",
        vec![
            Value::Text(json),
            Value::Integer(location.is_current_location as i64),
            Value::Text(location.id.clone()),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::{TENANT, service, stock_input};

    fn allocate(
        svc: &BatchService,
        batch_id: &str,
        tank_id: &str,
        quantity: i64,
        avg: f64,
    ) -> AllocationResult {
        svc.allocate_to_tank(AllocateInput {
            tenant_id: TENANT.into(),
            batch_id: batch_id.into(),
            tank_id: tank_id.into(),
            quantity,
            avg_weight_g: avg,
            allocation_type: AllocationType::InitialStocking,
            source_tank_id: None,
            allocated_by: None,
        })
        .unwrap()
    }

    #[test]
    fn allocate_validations() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();

        let bad_qty = svc.allocate_to_tank(AllocateInput {
            tenant_id: TENANT.into(),
            batch_id: b.id.clone(),
            tank_id: "tank-a".into(),
            quantity: 0,
            avg_weight_g: 5.0,
            allocation_type: AllocationType::InitialStocking,
            source_tank_id: None,
            allocated_by: None,
        });
        assert!(matches!(bad_qty, Err(ServiceError::Validation(_))));

        let unknown_tank = svc.allocate_to_tank(AllocateInput {
            tenant_id: TENANT.into(),
            batch_id: b.id.clone(),
            tank_id: "tank-zz".into(),
            quantity: 100,
            avg_weight_g: 5.0,
            allocation_type: AllocationType::InitialStocking,
            source_tank_id: None,
            allocated_by: None,
        });
        assert!(matches!(unknown_tank, Err(ServiceError::NotFound(_))));

        let unknown_batch = svc.allocate_to_tank(AllocateInput {
            tenant_id: TENANT.into(),
            batch_id: "nope".into(),
            tank_id: "tank-a".into(),
            quantity: 100,
            avg_weight_g: 5.0,
            allocation_type: AllocationType::InitialStocking,
            source_tank_id: None,
            allocated_by: None,
        });
        assert!(matches!(unknown_batch, Err(ServiceError::NotFound(_))));

        // No fabricated default volume: explicit rejection.
        let no_volume = svc.allocate_to_tank(AllocateInput {
            tenant_id: TENANT.into(),
            batch_id: b.id.clone(),
            tank_id: "tank-novol".into(),
            quantity: 100,
            avg_weight_g: 5.0,
            allocation_type: AllocationType::InitialStocking,
            source_tank_id: None,
            allocated_by: None,
        });
        assert!(matches!(no_volume, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn first_allocation_activates_and_builds_snapshot() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        assert_eq!(b.status, BatchStatus::Quarantine);

        let result = allocate(&svc, &b.id, "tank-a", 10_000, 5.0);
        assert_eq!(result.batch.status, BatchStatus::Active);
        assert!(result.capacity_warning.is_none());

        let snap = &result.snapshot;
        assert_eq!(snap.total_quantity, 10_000);
        assert!((snap.total_biomass_kg - 50.0).abs() < 1e-6);
        assert!((snap.avg_weight_g - 5.0).abs() < 1e-9);
        assert!((snap.density - 0.5).abs() < 1e-9);
        assert!(!snap.is_mixed_batch);
        assert_eq!(snap.primary_batch_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(snap.batches.len(), 1);
        assert!((snap.batches[0].percent_of_tank - 100.0).abs() < 1e-9);

        let stored = svc.get_tank_snapshot(TENANT, "tank-a").unwrap();
        assert_eq!(stored, result.snapshot);

        // Biomass consistency against the ledger.
        let allocations = svc.get_batch_allocations(TENANT, &b.id).unwrap();
        let ledger_biomass: f64 = allocations.iter().map(|a| a.biomass_kg).sum();
        assert!(stored.biomass_consistent_with(ledger_biomass));
        assert!(allocations.iter().all(|a| a.biomass_consistent()));

        // Location opened.
        let locations = svc.get_batch_locations(TENANT, &b.id).unwrap();
        assert_eq!(locations.len(), 1);
        assert!(locations[0].is_current_location);
        assert_eq!(locations[0].quantity, 10_000);
    }

    #[test]
    fn mixed_batch_snapshot_shares() {
        let svc = service();
        let a = svc.create_batch(stock_input("B-001")).unwrap();
        let b = svc.create_batch(stock_input("B-002")).unwrap();
        allocate(&svc, &a.id, "tank-a", 6_000, 10.0);
        let result = allocate(&svc, &b.id, "tank-a", 2_000, 10.0);

        let snap = &result.snapshot;
        assert!(snap.is_mixed_batch);
        assert_eq!(snap.total_quantity, 8_000);
        assert_eq!(snap.batches.len(), 2);
        assert_eq!(snap.primary_batch_id.as_deref(), Some(a.id.as_str()));
        let share_a = snap.batches.iter().find(|s| s.batch_id == a.id).unwrap();
        let share_b = snap.batches.iter().find(|s| s.batch_id == b.id).unwrap();
        assert!((share_a.percent_of_tank - 75.0).abs() < 1e-9);
        assert!((share_b.percent_of_tank - 25.0).abs() < 1e-9);
    }

    #[test]
    fn capacity_warning_is_advisory() {
        let svc = service();
        let mut input = stock_input("B-001");
        input.initial_quantity = 11_000;
        input.initial_avg_weight_g = 240.0;
        let b = svc.create_batch(input).unwrap();

        // 11,000 × 240g = 2640kg in 100m³ -> 26.4 kg/m³ > max 25.
        let result = allocate(&svc, &b.id, "tank-a", 11_000, 240.0);
        assert!((result.snapshot.density - 26.4).abs() < 1e-9);
        assert!(result.snapshot.is_over_capacity);
        assert!((result.snapshot.capacity_used_percent - 105.6).abs() < 1e-9);
        let warning = result.capacity_warning.expect("expected capacity warning");
        assert!(warning.contains("exceeds max"));

        // The write still landed.
        let snap = svc.get_tank_snapshot(TENANT, "tank-a").unwrap();
        assert_eq!(snap.total_quantity, 11_000);
    }

    #[test]
    fn void_allocation_reconverges_snapshot() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        allocate(&svc, &b.id, "tank-a", 6_000, 5.0);
        let second = allocate(&svc, &b.id, "tank-a", 4_000, 5.0);
        assert_eq!(second.snapshot.total_quantity, 10_000);

        let snap = svc.void_allocation(TENANT, &second.allocation.id).unwrap();
        assert_eq!(snap.total_quantity, 6_000);
        assert!((snap.total_biomass_kg - 30.0).abs() < 1e-6);

        // Ledger shows only the surviving entry.
        let allocations = svc.get_batch_allocations(TENANT, &b.id).unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].quantity, 6_000);

        // Location follows the reduced share.
        let locations = svc.get_batch_locations(TENANT, &b.id).unwrap();
        assert_eq!(locations[0].quantity, 6_000);
    }

    #[test]
    fn terminal_batch_cannot_allocate() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        svc.close_batch(TENANT, &b.id, "abandoned").unwrap();
        let result = svc.allocate_to_tank(AllocateInput {
            tenant_id: TENANT.into(),
            batch_id: b.id.clone(),
            tank_id: "tank-a".into(),
            quantity: 100,
            avg_weight_g: 5.0,
            allocation_type: AllocationType::InitialStocking,
            source_tank_id: None,
            allocated_by: None,
        });
        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }

    #[test]
    fn pond_allocation_records_container_kind() {
        let svc = service();
        let b = svc.create_batch(stock_input("B-001")).unwrap();
        svc.allocate_to_tank(AllocateInput {
            tenant_id: TENANT.into(),
            batch_id: b.id.clone(),
            tank_id: "pond-1".into(),
            quantity: 10_000,
            avg_weight_g: 5.0,
            allocation_type: AllocationType::InitialStocking,
            source_tank_id: None,
            allocated_by: None,
        })
        .unwrap();

        let locations = svc.get_batch_locations(TENANT, &b.id).unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(
            locations[0].container_kind,
            crate::model::ContainerKind::Pond
        );
    }
}
