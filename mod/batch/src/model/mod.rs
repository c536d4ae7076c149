pub mod allocation;
pub mod batch;
pub mod location;
pub mod operation;
pub mod snapshot;

pub use allocation::{AllocationType, TankAllocation};
pub use batch::{
    Batch, BatchStatus, FeedConversion, GrowthTracking, WeightTracking, WeightVariance, WeightView,
};
pub use location::{BatchLocation, ContainerKind};
pub use operation::{ContainerState, OperationDetail, OperationType, TankOperation};
pub use snapshot::{BatchShare, TankSnapshot};
