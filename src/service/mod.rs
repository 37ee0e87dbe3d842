//! Generic data manager: container resolution, key parsing, property mapping, store dispatch.

pub mod keys;
mod manager;
pub mod mapping;
mod pg;

pub use keys::{compose_key, lookup_in, parse_key, KEY_SEPARATOR};
pub use manager::{entity_not_found, resolve_entity, DataManager, ListQuery};
pub use mapping::{map_properties, WriteMode};
pub use pg::PgDataManager;
