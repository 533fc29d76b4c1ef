mod base;
mod job;
mod replicator;
mod source;
mod target;

pub use base::*;
pub use job::*;
pub use replicator::*;
pub use source::*;
pub use target::*;
