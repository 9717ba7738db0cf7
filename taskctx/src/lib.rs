//! Per-task execution contexts for running many units of work in one process.
//!
//! Operating systems expose the current directory and environment variables
//! as process-global mutable state. Tasks running on different threads that
//! read or write that state interfere with each other. An
//! [`ExecutionContext`] replaces those ambient APIs with an owned value: each
//! unit of work resolves paths against its own base directory, reads and
//! writes its own variable snapshot, and builds process launches from both.
//!
//! - **[`core`]**: Pure logic (path resolution, environment snapshot, launch
//!   descriptors, tool lookup). Never touches ambient state.
//! - **[`io`]**: The one-time capture of the process environment, TOML
//!   context profiles, process spawning and filesystem probing.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::context::{ContextBuilder, ExecutionContext};
pub use crate::core::env::{Binding, EnvironmentSnapshot};
pub use crate::core::error::{ContextError, ContextResult};
pub use crate::core::launch::ProcessLaunchDescriptor;
pub use crate::core::path::{PathResolver, PathStyle, ResolvedPath};
pub use crate::io::ambient::new_context;
