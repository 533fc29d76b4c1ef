//! Macros for replication error handling.
//!
//! Convenience macros for creating and returning [`crate::error::TickError`] instances
//! with reduced boilerplate.

/// Creates a [`crate::error::TickError`] from an error kind and description.
#[macro_export]
macro_rules! tick_error {
    ($kind:expr, $desc:expr) => {
        TickError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        TickError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates and returns a [`crate::error::TickError`] from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::tick_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::tick_error!($kind, $desc, $detail))
    };
}
