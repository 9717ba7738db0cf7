//! Deterministic, pure logic behind the execution context.
//!
//! Core modules never read ambient process state (current directory,
//! environment) and never emit log events. They operate on values handed to
//! them and return deterministic results.

pub mod context;
pub mod env;
pub mod error;
pub mod launch;
pub mod path;
pub mod tools;
