//! The single sanctioned read of process-wide state.
//!
//! A context copies the process environment once, when it is created. After
//! that nothing in this crate reads the real environment or current
//! directory on its behalf.

use tracing::debug;

use crate::core::context::{ContextBuilder, ExecutionContext};

/// Copy the process environment. Entries that are not valid UTF-8 are skipped.
pub fn capture_environment() -> Vec<(String, String)> {
    let mut skipped = 0usize;
    let vars: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();
    debug!(captured = vars.len(), skipped, "captured process environment");
    vars
}

/// Builder for a context rooted at `base` that inherits the process environment.
pub fn context_builder(base: impl Into<String>) -> ContextBuilder {
    ExecutionContext::builder(base).inherit(capture_environment())
}

/// Create a context rooted at `base` that inherits the process environment.
pub fn new_context(base: impl Into<String>) -> ExecutionContext {
    context_builder(base).build()
}
