// Catalog Module
//
// Schema descriptions and the table registry mapping table ids to files.

pub mod catalog;
pub mod schema;

pub use catalog::Catalog;
pub use schema::{FieldType, TupleDesc};
