//! Translation of source record schemas into target table declarations and
//! reconciliation against pre-existing tables.

mod merge;
mod processor;

pub use merge::*;
pub use processor::*;
