//! Side-effecting adapters around the core context.

pub mod ambient;
pub mod config;
pub mod probe;
pub mod process;
