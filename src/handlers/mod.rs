//! HTTP handlers for model metadata and record operations.

pub mod data;
pub mod model;
pub use data::*;
pub use model::*;
