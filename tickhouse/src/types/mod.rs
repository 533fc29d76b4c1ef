//! Common types used throughout the replication engine.
//!
//! Re-exports source record descriptors, field values, target column
//! declarations, and schema options.

mod column;
mod descriptor;
mod options;
mod value;

pub use column::*;
pub(crate) use column::flatten_columns;
pub use descriptor::*;
pub use options::*;
pub use value::*;
