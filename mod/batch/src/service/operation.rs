use tracing::{info, warn};

use aquafarm_core::{ServiceError, new_id, now_rfc3339};
use sql::{Statement, Value};

use crate::metrics::{biomass_kg, project_transfer};
use crate::model::{
    AllocationType, Batch, BatchStatus, OperationDetail, OperationType, TankAllocation,
    TankOperation, TankSnapshot, WeightView,
};
use crate::service::allocation::{allocation_insert_stmt, snapshot_upsert_stmt};
use crate::service::{BatchService, batch_update_stmt, hold, insert_stmt, map_sql_err};

pub struct RecordOperationInput {
    pub tenant_id: String,
    pub batch_id: String,
    pub tank_id: String,
    /// Animals affected; always positive, direction comes from the type.
    pub quantity: i64,
    /// Defaults to the batch's actual average weight.
    pub avg_weight_g: Option<f64>,
    pub detail: OperationDetail,
    pub recorded_by: Option<String>,
}

pub struct OperationResult {
    pub operation: TankOperation,
    pub batch: Batch,
    pub snapshot: TankSnapshot,
}

pub struct TransferInput {
    pub tenant_id: String,
    pub batch_id: String,
    pub source_tank_id: String,
    pub destination_tank_id: String,
    pub quantity: i64,
    pub avg_weight_g: Option<f64>,
    pub recorded_by: Option<String>,
}

pub struct TransferResult {
    pub transfer_id: String,
    pub out_operation: TankOperation,
    pub in_operation: TankOperation,
    pub batch: Batch,
    pub source_snapshot: TankSnapshot,
    pub destination_snapshot: TankSnapshot,
    /// Advisory findings (oversized transfer, critical destination
    /// density). The transfer itself committed.
    pub warnings: Vec<String>,
    pub is_valid: bool,
}

impl BatchService {
    /// Record one population-affecting event against a batch in a tank.
    ///
    /// Captures the pre-operation tank state, applies the per-type batch
    /// mutation, appends the operation with the post-operation state,
    /// and rebuilds the tank snapshot — one transaction. Stock-reducing
    /// operations that would drive the population negative are rejected
    /// with a conservation violation and leave everything untouched.
    ///
    /// Transfer legs are not accepted here: a transfer is one logical
    /// action whose two legs must commit together, via
    /// [`BatchService::transfer`].
    pub fn record_operation(
        &self,
        input: RecordOperationInput,
    ) -> Result<OperationResult, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::Validation(format!(
                "operation quantity must be positive, got {}",
                input.quantity
            )));
        }
        let op_type = input.detail.operation_type();
        if matches!(op_type, OperationType::TransferOut | OperationType::TransferIn) {
            return Err(ServiceError::Validation(
                "transfer legs must commit together; use transfer".into(),
            ));
        }

        let batch_lock = self.keyed_lock(&format!("batch:{}", input.batch_id))?;
        let _batch_guard = hold(&batch_lock)?;
        let tank_lock = self.keyed_lock(&format!("tank:{}", input.tank_id))?;
        let _tank_guard = hold(&tank_lock)?;

        let mut batch = self.get_batch(&input.tenant_id, &input.batch_id)?;
        Self::require_writable(&batch)?;
        let spec = self.container_spec(&input.tenant_id, &input.tank_id)?;

        let now = now_rfc3339();
        let pre_state = self
            .read_snapshot(&input.tenant_id, &input.tank_id)?
            .map(|s| s.container_state())
            .unwrap_or_default();

        let avg_weight_g = match op_type {
            OperationType::Sampling => match input.avg_weight_g {
                Some(avg) if avg > 0.0 => avg,
                _ => {
                    return Err(ServiceError::Validation(
                        "sampling requires a positive average weight".into(),
                    ));
                }
            },
            _ => {
                let avg = input
                    .avg_weight_g
                    .unwrap_or(batch.weight.actual.avg_weight_g);
                if avg <= 0.0 {
                    return Err(ServiceError::Validation(format!(
                        "average weight must be positive, got {avg}"
                    )));
                }
                avg
            }
        };
        let op_biomass = biomass_kg(input.quantity, avg_weight_g);

        // Per-type batch mutation. Stock moved out of the farm (harvest)
        // is mirrored into the allocation ledger so the tank snapshot —
        // a pure allocation projection — follows.
        let mut mirror: Option<TankAllocation> = None;
        match op_type {
            OperationType::Mortality => {
                batch.reduce_population(input.quantity, "mortality")?;
                batch.total_mortality += input.quantity;
                batch.recompute_rates();
                batch.refresh_biomass();
            }
            OperationType::Cull => {
                batch.reduce_population(input.quantity, "cull")?;
                batch.cull_count += input.quantity;
                batch.recompute_rates();
                batch.refresh_biomass();
            }
            OperationType::Harvest => {
                batch.reduce_population(input.quantity, "harvest")?;
                batch.harvested_quantity += input.quantity;
                batch.recompute_rates();
                batch.refresh_biomass();
                mirror = Some(TankAllocation {
                    id: new_id(),
                    tenant_id: input.tenant_id.clone(),
                    batch_id: input.batch_id.clone(),
                    tank_id: input.tank_id.clone(),
                    allocation_type: AllocationType::Harvest,
                    quantity: -input.quantity,
                    avg_weight_g,
                    biomass_kg: -op_biomass,
                    density_after: 0.0,
                    source_tank_id: None,
                    allocated_by: input.recorded_by.clone(),
                    deleted: false,
                    create_at: Some(now.clone()),
                });
                if batch.current_quantity == 0 {
                    batch.transition_to(BatchStatus::Harvested, &now)?;
                    batch.actual_harvest_date = Some(now.clone());
                }
            }
            OperationType::Sampling => {
                batch.weight.actual = WeightView::of(batch.current_quantity, avg_weight_g);
                batch.refresh_biomass();
                self.refresh_growth(&mut batch, &now)?;
            }
            OperationType::Adjustment => {
                // Population-neutral: census corrections go through
                // mortality/cull entries, adjustments carry notes only.
            }
            OperationType::TransferOut | OperationType::TransferIn => unreachable!(),
        }
        batch.update_at = Some(now.clone());

        let mut snapshot = match &mirror {
            Some(entry) => {
                self.project_snapshot(&input.tenant_id, &input.tank_id, &spec, &[entry], &now)?
            }
            None => self.project_snapshot(&input.tenant_id, &input.tank_id, &spec, &[], &now)?,
        };
        snapshot.last_operation_at = Some(now.clone());
        if let Some(entry) = mirror.as_mut() {
            entry.density_after = snapshot.density;
        }

        let operation = TankOperation {
            id: new_id(),
            tenant_id: input.tenant_id.clone(),
            batch_id: input.batch_id.clone(),
            tank_id: input.tank_id.clone(),
            quantity: input.quantity,
            avg_weight_g: Some(avg_weight_g),
            biomass_kg: op_biomass,
            detail: input.detail,
            pre_state,
            post_state: snapshot.container_state(),
            recorded_by: input.recorded_by,
            deleted: false,
            create_at: Some(now.clone()),
        };

        let mut stmts = vec![
            batch_update_stmt(&mut batch)?,
            operation_insert_stmt(&operation)?,
        ];
        if let Some(entry) = &mirror {
            stmts.push(allocation_insert_stmt(entry)?);
        }
        stmts.push(snapshot_upsert_stmt(&snapshot)?);
        if mirror.is_some() {
            let share = snapshot.batches.iter().find(|s| s.batch_id == batch.id);
            stmts.extend(self.location_stmts(&input.tenant_id, &batch.id, &spec, share, &now)?);
        }

        self.sql.exec_batch(&stmts).map_err(map_sql_err)?;

        info!(
            batch = %batch.batch_number,
            tank = %input.tank_id,
            kind = %op_type,
            quantity = input.quantity,
            "operation recorded"
        );
        Ok(OperationResult {
            operation,
            batch,
            snapshot,
        })
    }

    /// Move part of a batch between tanks: one logical action expressed
    /// as paired TRANSFER_OUT / TRANSFER_IN operations sharing a
    /// transfer id. Both legs, both ledger mirrors, and both snapshot
    /// rebuilds commit in a single transaction — a failure on either
    /// leg leaves nothing applied. Density findings are warnings only.
    pub fn transfer(&self, input: TransferInput) -> Result<TransferResult, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::Validation(format!(
                "transfer quantity must be positive, got {}",
                input.quantity
            )));
        }
        if input.source_tank_id == input.destination_tank_id {
            return Err(ServiceError::Validation(
                "source and destination tank must differ".into(),
            ));
        }

        let batch_lock = self.keyed_lock(&format!("batch:{}", input.batch_id))?;
        let _batch_guard = hold(&batch_lock)?;
        // Tank locks in sorted order so concurrent transfers on the
        // same pair cannot deadlock.
        let mut tank_keys = [
            input.source_tank_id.clone(),
            input.destination_tank_id.clone(),
        ];
        tank_keys.sort();
        let first_lock = self.keyed_lock(&format!("tank:{}", tank_keys[0]))?;
        let _first_guard = hold(&first_lock)?;
        let second_lock = self.keyed_lock(&format!("tank:{}", tank_keys[1]))?;
        let _second_guard = hold(&second_lock)?;

        let mut batch = self.get_batch(&input.tenant_id, &input.batch_id)?;
        Self::require_writable(&batch)?;
        let source_spec = self.container_spec(&input.tenant_id, &input.source_tank_id)?;
        let destination_spec = self.container_spec(&input.tenant_id, &input.destination_tank_id)?;

        let avg_weight_g = input
            .avg_weight_g
            .unwrap_or(batch.weight.actual.avg_weight_g);
        if avg_weight_g <= 0.0 {
            return Err(ServiceError::Validation(format!(
                "average weight must be positive, got {avg_weight_g}"
            )));
        }
        // Legs net to zero on the batch, but the out leg may never
        // exceed the live population.
        if input.quantity > batch.current_quantity {
            return Err(ServiceError::Conservation(format!(
                "transfer of {} exceeds current population {} of batch {}",
                input.quantity, batch.current_quantity, batch.batch_number
            )));
        }

        let now = now_rfc3339();
        let transfer_id = new_id();
        let transfer_biomass = biomass_kg(input.quantity, avg_weight_g);

        let source_prior = self.read_snapshot(&input.tenant_id, &input.source_tank_id)?;
        let destination_prior = self.read_snapshot(&input.tenant_id, &input.destination_tank_id)?;
        let source_pre = source_prior
            .as_ref()
            .map(|s| s.container_state())
            .unwrap_or_default();
        let destination_pre = destination_prior
            .as_ref()
            .map(|s| s.container_state())
            .unwrap_or_default();

        let projection = project_transfer(
            source_pre.biomass_kg,
            source_spec.volume_m3,
            destination_pre.biomass_kg,
            destination_spec.volume_m3,
            transfer_biomass,
            destination_spec.optimal_density_min,
            destination_spec.optimal_density_max,
            destination_spec.max_density_kg_m3,
        )?;
        let mut warnings = projection.warnings;

        // Advisory: moving more of this batch than the source tank holds.
        let source_share = source_prior
            .as_ref()
            .and_then(|s| s.batches.iter().find(|b| b.batch_id == batch.id))
            .map(|b| b.quantity)
            .unwrap_or(0);
        if input.quantity > source_share {
            warnings.push(format!(
                "transfer of {} exceeds the batch's {} animals in tank {}",
                input.quantity, source_share, input.source_tank_id
            ));
        }
        for w in &warnings {
            warn!(batch = %batch.batch_number, "{w}");
        }

        let out_entry = TankAllocation {
            id: new_id(),
            tenant_id: input.tenant_id.clone(),
            batch_id: input.batch_id.clone(),
            tank_id: input.source_tank_id.clone(),
            allocation_type: AllocationType::TransferOut,
            quantity: -input.quantity,
            avg_weight_g,
            biomass_kg: -transfer_biomass,
            density_after: 0.0,
            source_tank_id: None,
            allocated_by: input.recorded_by.clone(),
            deleted: false,
            create_at: Some(now.clone()),
        };
        let in_entry = TankAllocation {
            id: new_id(),
            tenant_id: input.tenant_id.clone(),
            batch_id: input.batch_id.clone(),
            tank_id: input.destination_tank_id.clone(),
            allocation_type: AllocationType::TransferIn,
            quantity: input.quantity,
            avg_weight_g,
            biomass_kg: transfer_biomass,
            density_after: 0.0,
            source_tank_id: Some(input.source_tank_id.clone()),
            allocated_by: input.recorded_by.clone(),
            deleted: false,
            create_at: Some(now.clone()),
        };

        let mut source_snapshot = self.project_snapshot(
            &input.tenant_id,
            &input.source_tank_id,
            &source_spec,
            &[&out_entry],
            &now,
        )?;
        let mut destination_snapshot = self.project_snapshot(
            &input.tenant_id,
            &input.destination_tank_id,
            &destination_spec,
            &[&in_entry],
            &now,
        )?;
        source_snapshot.last_operation_at = Some(now.clone());
        destination_snapshot.last_operation_at = Some(now.clone());

        let mut out_entry = out_entry;
        let mut in_entry = in_entry;
        out_entry.density_after = source_snapshot.density;
        in_entry.density_after = destination_snapshot.density;

        let out_operation = TankOperation {
            id: new_id(),
            tenant_id: input.tenant_id.clone(),
            batch_id: input.batch_id.clone(),
            tank_id: input.source_tank_id.clone(),
            quantity: input.quantity,
            avg_weight_g: Some(avg_weight_g),
            biomass_kg: transfer_biomass,
            detail: OperationDetail::TransferOut {
                destination_tank_id: input.destination_tank_id.clone(),
                transfer_id: transfer_id.clone(),
            },
            pre_state: source_pre,
            post_state: source_snapshot.container_state(),
            recorded_by: input.recorded_by.clone(),
            deleted: false,
            create_at: Some(now.clone()),
        };
        let in_operation = TankOperation {
            id: new_id(),
            tenant_id: input.tenant_id.clone(),
            batch_id: input.batch_id.clone(),
            tank_id: input.destination_tank_id.clone(),
            quantity: input.quantity,
            avg_weight_g: Some(avg_weight_g),
            biomass_kg: transfer_biomass,
            detail: OperationDetail::TransferIn {
                source_tank_id: input.source_tank_id.clone(),
                transfer_id: transfer_id.clone(),
            },
            pre_state: destination_pre,
            post_state: destination_snapshot.container_state(),
            recorded_by: input.recorded_by,
            deleted: false,
            create_at: Some(now.clone()),
        };

        batch.update_at = Some(now.clone());

        let mut stmts = vec![
            batch_update_stmt(&mut batch)?,
            allocation_insert_stmt(&out_entry)?,
            allocation_insert_stmt(&in_entry)?,
            operation_insert_stmt(&out_operation)?,
            operation_insert_stmt(&in_operation)?,
            snapshot_upsert_stmt(&source_snapshot)?,
            snapshot_upsert_stmt(&destination_snapshot)?,
        ];
        let source_share = source_snapshot
            .batches
            .iter()
            .find(|s| s.batch_id == batch.id);
        stmts.extend(self.location_stmts(
            &input.tenant_id,
            &batch.id,
            &source_spec,
            source_share,
            &now,
        )?);
        let destination_share = destination_snapshot
            .batches
            .iter()
            .find(|s| s.batch_id == batch.id);
        stmts.extend(self.location_stmts(
            &input.tenant_id,
            &batch.id,
            &destination_spec,
            destination_share,
            &now,
        )?);

        self.sql.exec_batch(&stmts).map_err(map_sql_err)?;

        info!(
            batch = %batch.batch_number,
            from = %input.source_tank_id,
            to = %input.destination_tank_id,
            quantity = input.quantity,
            "transfer committed"
        );
        let is_valid = warnings.is_empty();
        Ok(TransferResult {
            transfer_id,
            out_operation,
            in_operation,
            batch,
            source_snapshot,
            destination_snapshot,
            warnings,
            is_valid,
        })
    }

    pub fn get_batch_operations(
        &self,
        tenant_id: &str,
        batch_id: &str,
    ) -> Result<Vec<TankOperation>, ServiceError> {
        self.fetch_all_json(
            "SELECT data FROM tank_operations WHERE tenant_id = ?1 AND batch_id = ?2 \
             AND deleted = 0 ORDER BY create_at ASC, id ASC",
            &[
                Value::Text(tenant_id.to_string()),
                Value::Text(batch_id.to_string()),
            ],
        )
    }
}

fn operation_insert_stmt(op: &TankOperation) -> Result<Statement, ServiceError> {
    insert_stmt("tank_operations", &op.id, op, &[
        ("tenant_id", Value::Text(op.tenant_id.clone())),
        ("batch_id", Value::Text(op.batch_id.clone())),
        ("tank_id", Value::Text(op.tank_id.clone())),
        (
            "operation_type",
            Value::Text(op.operation_type().as_str().to_string()),
        ),
        (
            "create_at",
            Value::Text(op.create_at.clone().unwrap_or_default()),
        ),
    ])
}
