//! Command analysis entry points.

mod aggregate;
mod analyzer;

pub use aggregate::{Aggregate, SAFE_REASON, aggregate};
pub use analyzer::analyze_command;
