//! Shared primitives: core value types and the crate-wide error taxonomy.

pub(crate) mod core;
pub(crate) mod error;
