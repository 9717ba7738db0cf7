//! Context profiles stored as TOML.
//!
//! A profile describes how to construct one execution context: its base
//! directory, path style, whether to inherit the process environment, and
//! variables to seed or clear.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::context::ExecutionContext;
use crate::core::path::PathStyle;

/// Context profile (TOML).
///
/// Missing fields default to an empty base, the native path style and an
/// inherited process environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Resolution root for relative paths and working directory for launches.
    pub base_directory: String,

    /// Path syntax; `None` selects the platform's own.
    pub path_style: Option<PathStyle>,

    /// Copy the process environment into the context at construction.
    pub inherit_environment: bool,

    /// Context-local clears applied after `variables`.
    pub unset: Vec<String>,

    /// Context-local overrides applied after the inherited set.
    pub variables: BTreeMap<String, String>,

    pub launch: LaunchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchConfig {
    /// Wall-clock limit for a spawned process, in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl LaunchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            base_directory: String::new(),
            path_style: None,
            inherit_environment: true,
            unset: Vec::new(),
            variables: BTreeMap::new(),
            launch: LaunchConfig::default(),
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> Result<()> {
        if self.launch.timeout_secs == 0 {
            return Err(anyhow!("launch.timeout_secs must be > 0"));
        }
        if self.launch.output_limit_bytes == 0 {
            return Err(anyhow!("launch.output_limit_bytes must be > 0"));
        }
        if let Some(name) = self
            .variables
            .keys()
            .chain(self.unset.iter())
            .find(|name| name.is_empty() || name.contains('='))
        {
            return Err(anyhow!("invalid variable name {name:?}"));
        }
        Ok(())
    }

    /// Build a context from this profile.
    ///
    /// `ambient` is consulted only when `inherit_environment` is set; pass the
    /// result of [`capture_environment`](crate::io::ambient::capture_environment)
    /// to inherit the real process environment.
    pub fn build_context<I>(&self, ambient: I) -> ExecutionContext
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut builder = ExecutionContext::builder(self.base_directory.clone())
            .style(self.path_style.unwrap_or_else(PathStyle::native));
        if self.inherit_environment {
            builder = builder.inherit(ambient);
        }
        for (name, value) in &self.variables {
            builder = builder.variable(name.clone(), value.clone());
        }
        for name in &self.unset {
            builder = builder.unset(name.clone());
        }
        builder.build()
    }
}

/// Load a profile from a TOML file.
///
/// If the file is missing, returns `ContextConfig::default()`.
pub fn load_config(path: &Path) -> Result<ContextConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no context profile, using defaults");
        let cfg = ContextConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ContextConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    debug!(
        path = %path.display(),
        base = %cfg.base_directory,
        variables = cfg.variables.len(),
        "loaded context profile"
    );
    Ok(cfg)
}

/// Atomically write a profile to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ContextConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ContextConfig::default());
    }

    #[test]
    fn write_then_load_preserves_profile() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("ctx.toml");
        let mut cfg = ContextConfig {
            base_directory: "/proj/x".to_string(),
            path_style: Some(PathStyle::Unix),
            ..ContextConfig::default()
        };
        cfg.variables
            .insert("NUGET_PACKAGES".to_string(), "/a".to_string());
        cfg.unset.push("HTTP_PROXY".to_string());
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn parses_partial_profile() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("ctx.toml");
        fs::write(
            &path,
            "base_directory = \"/proj/y\"\npath_style = \"windows\"\n\n[variables]\nA = \"1\"\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.base_directory, "/proj/y");
        assert_eq!(cfg.path_style, Some(PathStyle::Windows));
        assert!(cfg.inherit_environment);
        assert_eq!(cfg.launch, LaunchConfig::default());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut cfg = ContextConfig::default();
        cfg.launch.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_bad_variable_name() {
        let mut cfg = ContextConfig::default();
        cfg.variables.insert("A=B".to_string(), "v".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn build_context_applies_profile() {
        let mut cfg = ContextConfig {
            base_directory: "/proj/x".to_string(),
            path_style: Some(PathStyle::Unix),
            ..ContextConfig::default()
        };
        cfg.variables.insert("A".to_string(), "seeded".to_string());
        cfg.unset.push("B".to_string());
        let ambient = vec![
            ("A".to_string(), "ambient".to_string()),
            ("B".to_string(), "ambient".to_string()),
            ("C".to_string(), "ambient".to_string()),
        ];

        let ctx = cfg.build_context(ambient.clone());
        assert_eq!(ctx.get_environment_variable("A"), Some("seeded"));
        assert_eq!(ctx.get_environment_variable("B"), None);
        assert_eq!(ctx.get_environment_variable("C"), Some("ambient"));
        assert_eq!(
            ctx.get_absolute_path("cfg").expect("resolve"),
            "/proj/x/cfg"
        );

        cfg.inherit_environment = false;
        let isolated = cfg.build_context(ambient);
        assert_eq!(isolated.get_environment_variable("C"), None);
    }
}
