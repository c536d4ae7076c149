//! Pure numeric core: growth-rate and biomass/density calculations.
//!
//! Everything here is stateless. Non-positive inputs are treated as
//! "insufficient data" and produce sentinel values (`0.0` or `None`),
//! never errors — sparse or early-lifecycle sampling is expected. The
//! one exception is container volume: a missing volume is a
//! configuration fault and fails loudly instead of silently distorting
//! density.

pub mod biomass;
pub mod growth;

pub use biomass::{DensityBand, TransferProjection, biomass_kg, density, project_transfer};
pub use growth::{GrowthRating, daily_growth_rate, feed_conversion_ratio, specific_growth_rate};
