//! CLI command implementations.

pub mod call;
pub mod check;
pub mod serve;
