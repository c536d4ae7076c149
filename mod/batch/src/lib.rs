//! Batch lifecycle and tank-allocation engine.
//!
//! Tracks a production batch from stocking through growth to harvest or
//! closure, manages how its population and biomass are distributed
//! across tanks, records every population-affecting event in
//! append-only ledgers, and derives the growth and efficiency metrics
//! (SGR, FCR, stocking density) that drive operational decisions.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use batch::BatchService;
//! use batch::refdata::{InMemoryContainers, InMemorySpecies};
//! use batch::service::batch::CreateBatchInput;
//! use sql::SqliteStore;
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! let svc = BatchService::new(
//!     Box::new(store),
//!     Box::new(InMemorySpecies::new()),
//!     Box::new(InMemoryContainers::new()),
//! ).unwrap();
//!
//! let batch = svc.create_batch(CreateBatchInput {
//!     tenant_id: "farm1".into(),
//!     batch_number: "B-2025-001".into(),
//!     species_id: "salmon".into(),
//!     initial_quantity: 10_000,
//!     initial_avg_weight_g: 5.0,
//!     stocking_date: None,
//!     target_fcr: None,
//!     description: None,
//!     created_by: None,
//! }).unwrap();
//! println!("stocked {} ({}kg)", batch.batch_number, batch.weight.initial.biomass_kg);
//! ```
//!
//! Population conservation holds after every call:
//! `current + mortality + culls + harvested == initial`. All writes on
//! a batch are serialized and commit as one transaction; exceeding a
//! tank's density limit is a warning on a successful result, never an
//! error.

pub mod metrics;
pub mod model;
pub mod refdata;
pub mod service;

pub use model::{
    AllocationType, Batch, BatchLocation, BatchShare, BatchStatus, ContainerKind, ContainerState,
    OperationDetail, OperationType, TankAllocation, TankOperation, TankSnapshot,
};
pub use refdata::{ContainerDirectory, ContainerSpec, SpeciesDirectory, SpeciesGrowthParams};
pub use service::BatchService;
