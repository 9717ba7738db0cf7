//! Process launch descriptors built from a context's own state.
//!
//! The descriptor is fully self-contained: the working directory comes from
//! the context base and the environment is the complete variable set the
//! child should see. Spawning is left to the caller (see `io::process`).

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::core::context::ExecutionContext;
use crate::core::error::{ContextError, ContextResult};

/// Everything needed to spawn one process on behalf of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessLaunchDescriptor {
    /// Program to run. Paths containing a separator are already resolved
    /// against the context base; bare names are left for `PATH` lookup.
    pub executable: String,
    pub arguments: Vec<String>,
    /// Always the owning context's base directory.
    pub working_directory: String,
    /// Captured variables with the context overlay applied.
    pub environment: BTreeMap<String, String>,
}

impl fmt::Display for ProcessLaunchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_arg(&self.executable))?;
        for arg in &self.arguments {
            write!(f, " {}", quote_arg(arg))?;
        }
        Ok(())
    }
}

fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '"') {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}

/// Assemble a launch descriptor for `executable` from `context`.
///
/// Fails with `InvalidConfiguration` for an empty executable, for arguments
/// carrying NUL, or for a variable written through the context that a process
/// environment cannot hold. Inherited entries pass through unchanged,
/// including the hidden `=C:` style entries Windows hands down.
pub fn build_launch<I, S>(
    context: &ExecutionContext,
    executable: &str,
    arguments: I,
) -> ContextResult<ProcessLaunchDescriptor>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    if executable.trim().is_empty() {
        return Err(ContextError::InvalidConfiguration(
            "executable must not be empty".to_string(),
        ));
    }
    let executable = if executable.contains(['/', '\\']) {
        context.get_canonical_form(executable)?
    } else {
        executable.to_string()
    };

    let arguments: Vec<String> = arguments.into_iter().map(Into::into).collect();
    if let Some(bad) = arguments.iter().find(|arg| arg.contains('\0')) {
        return Err(ContextError::InvalidConfiguration(format!(
            "argument {bad:?} contains a NUL byte"
        )));
    }

    let env = context.environment();
    if let Some((name, _)) = env.written().find(|(name, value)| {
        name.is_empty() || name.contains(['=', '\0']) || value.contains('\0')
    }) {
        return Err(ContextError::InvalidConfiguration(format!(
            "environment variable {name:?} cannot be passed to a process"
        )));
    }
    let environment = env
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    Ok(ProcessLaunchDescriptor {
        executable,
        arguments,
        working_directory: context.base_directory().to_string(),
        environment,
    })
}
