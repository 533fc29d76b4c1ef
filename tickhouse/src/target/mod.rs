//! Target store clients.

mod base;
mod clickhouse;
mod memory;

pub use base::*;
pub use clickhouse::*;
pub use memory::*;
