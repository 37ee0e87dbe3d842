//! Safe SQL builder: identifiers from the introspected model only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
