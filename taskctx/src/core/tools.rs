//! Executable lookup through a context's own `PATH`, memoized per context.

use std::collections::HashMap;

use crate::core::env::EnvironmentSnapshot;
use crate::core::error::{ContextError, ContextResult};
use crate::core::path::{PathResolver, PathStyle, join};

const DEFAULT_PATHEXT: &str = ".COM;.EXE;.BAT;.CMD";

/// Answers whether a canonical path names a runnable file.
pub trait ToolProbe {
    fn is_executable(&self, path: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ToolKey {
    base: String,
    search_path: Option<String>,
    extensions: Option<String>,
    name: String,
}

/// Successful lookups keyed by everything that influenced them.
///
/// Owned by one context; changing the base, `PATH` or `PATHEXT` yields a new
/// key, so an entry can never leak into a differently configured lookup.
#[derive(Debug, Default)]
pub struct ToolCache {
    entries: HashMap<ToolKey, String>,
}

impl ToolCache {
    pub fn resolve<P: ToolProbe + ?Sized>(
        &mut self,
        resolver: &PathResolver,
        env: &EnvironmentSnapshot,
        name: &str,
        probe: &P,
    ) -> ContextResult<Option<String>> {
        let key = ToolKey {
            base: resolver.base().to_string(),
            search_path: env.get("PATH").map(str::to_string),
            extensions: env.get("PATHEXT").map(str::to_string),
            name: name.to_string(),
        };
        if let Some(hit) = self.entries.get(&key) {
            return Ok(Some(hit.clone()));
        }
        let found = search(resolver, env, name, probe)?;
        if let Some(path) = &found {
            self.entries.insert(key, path.clone());
        }
        Ok(found)
    }
}

/// Search for `name` without touching any cache.
///
/// Names containing a separator are resolved against the base directly.
/// Relative `PATH` entries resolve against the base; empty or malformed
/// entries are skipped.
pub fn search<P: ToolProbe + ?Sized>(
    resolver: &PathResolver,
    env: &EnvironmentSnapshot,
    name: &str,
    probe: &P,
) -> ContextResult<Option<String>> {
    if name.trim().is_empty() {
        return Err(ContextError::InvalidConfiguration(
            "tool name must not be empty".to_string(),
        ));
    }
    let style = resolver.style();
    let candidates = candidate_names(name, style, env);

    if name.contains(['/', '\\']) {
        for candidate in &candidates {
            let full = resolver.resolve(candidate)?.into_canonical();
            if probe.is_executable(&full) {
                return Ok(Some(full));
            }
        }
        return Ok(None);
    }

    let Some(search_path) = env.get("PATH") else {
        return Ok(None);
    };
    for entry in search_path.split(list_separator(style)) {
        if entry.is_empty() {
            continue;
        }
        let Ok(dir) = resolver.resolve(entry) else {
            continue;
        };
        for candidate in &candidates {
            let full = join(dir.canonical(), candidate, style);
            if probe.is_executable(&full) {
                return Ok(Some(full));
            }
        }
    }
    Ok(None)
}

fn list_separator(style: PathStyle) -> char {
    match style {
        PathStyle::Unix => ':',
        PathStyle::Windows => ';',
    }
}

/// On Windows, a name without an extension is tried with each `PATHEXT` entry.
fn candidate_names(name: &str, style: PathStyle, env: &EnvironmentSnapshot) -> Vec<String> {
    let mut names = vec![name.to_string()];
    if style == PathStyle::Windows && !has_extension(name) {
        let exts = env.get("PATHEXT").unwrap_or(DEFAULT_PATHEXT);
        names.extend(
            exts.split(';')
                .filter(|ext| !ext.is_empty())
                .map(|ext| format!("{name}{}", ext.to_ascii_lowercase())),
        );
    }
    names
}

fn has_extension(name: &str) -> bool {
    name.rsplit(['/', '\\'])
        .next()
        .is_some_and(|file| file.contains('.'))
}

#[cfg(test)]
impl ToolCache {
    fn len(&self) -> usize {
        self.entries.len()
    }
}
