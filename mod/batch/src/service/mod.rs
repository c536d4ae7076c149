pub mod allocation;
pub mod batch;
pub mod metrics;
pub mod operation;
pub mod schema;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;

use aquafarm_core::{ServiceConfig, ServiceError, merge_patch, now_rfc3339};
use sql::{SQLError, SQLStore, SqliteStore, Statement, Value};

use crate::model::Batch;
use crate::refdata::{ContainerDirectory, ContainerSpec, SpeciesDirectory};

/// Batch lifecycle service — the only writer of batches, the two
/// ledgers, tank snapshots, and batch locations.
///
/// Every write path runs as one atomic unit: acquire the batch lock
/// (then tank locks, in sorted order), read current state, compute all
/// new values, then apply every write through a single transactional
/// [`SQLStore::exec_batch`]. The batch row carries an optimistic
/// version counter; a missed guard rolls the whole unit back.
pub struct BatchService {
    pub(crate) sql: Box<dyn SQLStore>,
    pub(crate) species: Box<dyn SpeciesDirectory>,
    pub(crate) containers: Box<dyn ContainerDirectory>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BatchService {
    pub fn new(
        sql: Box<dyn SQLStore>,
        species: Box<dyn SpeciesDirectory>,
        containers: Box<dyn ContainerDirectory>,
    ) -> Result<Self, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Self {
            sql,
            species,
            containers,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Open a service backed by the SQLite file the config resolves to.
    pub fn open(
        config: &ServiceConfig,
        species: Box<dyn SpeciesDirectory>,
        containers: Box<dyn ContainerDirectory>,
    ) -> Result<Self, ServiceError> {
        let store = SqliteStore::open(&config.resolve_sqlite_path())
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Self::new(Box::new(store), species, containers)
    }

    // ── Write serialization ──

    /// Named lock, created lazily. Writers hold the batch lock first,
    /// then tank locks in sorted key order, so writers on the same
    /// batch or tank never interleave and lock order is deadlock-free.
    pub(crate) fn keyed_lock(&self, key: &str) -> Result<Arc<Mutex<()>>, ServiceError> {
        let mut registry = self
            .locks
            .lock()
            .map_err(|_| ServiceError::Internal("lock registry poisoned".into()))?;
        Ok(registry
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    // ── Generic document helpers ──

    /// Fetch and deserialize the `data` column of the first result row.
    pub(crate) fn fetch_json<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<T>, ServiceError> {
        let rows = self.sql.query(sql, params).map_err(map_sql_err)?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        serde_json::from_str(data)
            .map(Some)
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    /// Fetch and deserialize the `data` column of every result row.
    pub(crate) fn fetch_all_json<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, ServiceError> {
        let rows = self.sql.query(sql, params).map_err(map_sql_err)?;
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            items.push(
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?,
            );
        }
        Ok(items)
    }

    /// Resolve a container spec, failing NotFound for unknown tanks and
    /// Validation for tanks with no configured volume.
    pub(crate) fn container_spec(
        &self,
        tenant_id: &str,
        container_id: &str,
    ) -> Result<ContainerSpec, ServiceError> {
        let spec = self
            .containers
            .spec(tenant_id, container_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("tank {container_id} not found")))?;
        if spec.volume_m3 <= 0.0 {
            return Err(ServiceError::Validation(format!(
                "tank {container_id} has no configured volume"
            )));
        }
        Ok(spec)
    }

    /// Apply a JSON merge-patch to a record, shielding protected fields
    /// and stamping `updateAt`.
    pub(crate) fn apply_patch<T: Serialize + DeserializeOwned>(
        current: &T,
        patch: serde_json::Value,
        protected: &[&str],
    ) -> Result<T, ServiceError> {
        let mut json = serde_json::to_value(current)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let mut patch_filtered = patch;
        if let Some(obj) = patch_filtered.as_object_mut() {
            for key in protected {
                obj.remove(*key);
            }
            obj.insert("updateAt".into(), serde_json::json!(now_rfc3339()));
        }

        merge_patch(&mut json, &patch_filtered);
        serde_json::from_value(json).map_err(|e| ServiceError::Internal(e.to_string()))
    }
}

/// Acquire a keyed mutex, surfacing poisoning as an internal error.
pub(crate) fn hold(lock: &Mutex<()>) -> Result<MutexGuard<'_, ()>, ServiceError> {
    lock.lock()
        .map_err(|_| ServiceError::Internal("write lock poisoned".into()))
}

/// Map storage errors into the service taxonomy.
pub(crate) fn map_sql_err(e: SQLError) -> ServiceError {
    match e {
        SQLError::Conflict(msg) => ServiceError::ConcurrentModification(msg),
        other => {
            let msg = other.to_string();
            if msg.contains("UNIQUE constraint") {
                ServiceError::Conflict(msg)
            } else {
                ServiceError::Storage(msg)
            }
        }
    }
}

/// Build an INSERT of a JSON document plus indexed columns.
pub(crate) fn insert_stmt<T: Serialize>(
    table: &str,
    id: &str,
    record: &T,
    indexes: &[(&str, Value)],
) -> Result<Statement, ServiceError> {
    let json = serde_json::to_string(record)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    let mut cols = vec!["id", "data"];
    let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
    let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];

    for (i, (col, val)) in indexes.iter().enumerate() {
        let idx = i + 3;
        cols.push(col);
        placeholders.push(format!("?{}", idx));
        params.push(val.clone());
    }

    Ok(Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        ),
        params,
    ))
}

/// Build the guarded batch-row update. Bumps the in-memory version so
/// the serialized document matches the row; the WHERE clause carries
/// the prior version and turns any out-of-band write into a rolled-back
/// conflict.
pub(crate) fn batch_update_stmt(batch: &mut Batch) -> Result<Statement, ServiceError> {
    let expected = batch.version;
    batch.version += 1;
    let json = serde_json::to_string(batch)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    Ok(Statement::guarded(
        "UPDATE batches SET data = ?1, status = ?2, is_active = ?3, update_at = ?4, \
         version = version + 1 WHERE id = ?5 AND tenant_id = ?6 AND version = ?7",
        vec![
            Value::Text(json),
            Value::Text(batch.status.as_str().to_string()),
            Value::Integer(batch.is_active as i64),
            Value::Text(batch.update_at.clone().unwrap_or_default()),
            Value::Text(batch.id.clone()),
            Value::Text(batch.tenant_id.clone()),
            Value::Integer(expected),
        ],
    ))
}
