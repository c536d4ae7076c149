use aquafarm_core::ServiceError;
use sql::SQLStore;

/// SQL DDL statements to initialize the batch-engine schema.
///
/// Each table stores the full JSON document in a `data` TEXT column,
/// with indexed columns extracted for efficient filtering and
/// uniqueness. Ledger tables are append-only; `deleted` is the only
/// flag that ever changes on them.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS batches (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        batch_number TEXT NOT NULL,
        species_id TEXT,
        status TEXT,
        is_active INTEGER,
        deleted INTEGER DEFAULT 0,
        version INTEGER NOT NULL DEFAULT 0,
        create_at TEXT,
        update_at TEXT,
        UNIQUE(tenant_id, batch_number)
    )",
    "CREATE TABLE IF NOT EXISTS tank_allocations (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        batch_id TEXT NOT NULL,
        tank_id TEXT NOT NULL,
        allocation_type TEXT,
        deleted INTEGER DEFAULT 0,
        create_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS tank_operations (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        batch_id TEXT NOT NULL,
        tank_id TEXT NOT NULL,
        operation_type TEXT,
        deleted INTEGER DEFAULT 0,
        create_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS tank_snapshots (
        tenant_id TEXT NOT NULL,
        tank_id TEXT NOT NULL,
        data TEXT NOT NULL,
        update_at TEXT,
        PRIMARY KEY (tenant_id, tank_id)
    )",
    "CREATE TABLE IF NOT EXISTS batch_locations (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        batch_id TEXT NOT NULL,
        container_id TEXT NOT NULL,
        is_current INTEGER,
        deleted INTEGER DEFAULT 0,
        create_at TEXT
    )",
    // Indexes
    "CREATE INDEX IF NOT EXISTS idx_batch_tenant ON batches(tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_batch_status ON batches(status)",
    "CREATE INDEX IF NOT EXISTS idx_batch_species ON batches(species_id)",
    "CREATE INDEX IF NOT EXISTS idx_alloc_batch ON tank_allocations(batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_alloc_tank ON tank_allocations(tenant_id, tank_id)",
    "CREATE INDEX IF NOT EXISTS idx_op_batch ON tank_operations(batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_op_tank ON tank_operations(tenant_id, tank_id)",
    "CREATE INDEX IF NOT EXISTS idx_op_type ON tank_operations(operation_type)",
    "CREATE INDEX IF NOT EXISTS idx_loc_batch ON batch_locations(tenant_id, batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_loc_container ON batch_locations(tenant_id, container_id)",
];

pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(format!("schema init failed: {}", e)))?;
    }
    Ok(())
}
