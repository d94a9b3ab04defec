//! Domain logic for audience filtering
//!
//! - `filters` - filter expression model, validation and save pipeline
//! - `estimate` - debounced audience estimation

pub mod estimate;
pub mod filters;

pub use estimate::{EstimateTrigger, EstimateUpdate};
