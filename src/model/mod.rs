//! Metadata model and the schema introspector that builds it.

mod types;
mod value;
pub mod introspect;

pub use introspect::{build_model, introspect, load_catalog, CatalogSnapshot};
pub use types::*;
pub use value::{ConvertError, FieldValue};

#[cfg(test)]
pub(crate) use types::fixtures;
