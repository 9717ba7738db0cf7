//! The per-unit-of-work execution context.
//!
//! An [`ExecutionContext`] owns a base directory, an environment snapshot and
//! a tool cache. Nothing in it is shared with another context: two contexts
//! only ever agree because they were given equal values at construction.
//!
//! Contexts are built through [`ContextBuilder`] (the constructing state) and
//! are active as soon as [`ContextBuilder::build`] returns. There is no
//! teardown; a context is dropped together with its unit of work.

use crate::core::env::EnvironmentSnapshot;
use crate::core::error::{ContextError, ContextResult};
use crate::core::launch::{ProcessLaunchDescriptor, build_launch};
use crate::core::path::{PathResolver, PathStyle, ResolvedPath};
use crate::core::tools::{ToolCache, ToolProbe};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seed {
    Set(String, String),
    Unset(String),
}

/// Collects the base directory, path style and variables for a new context.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    base: String,
    style: PathStyle,
    inherited: Vec<(String, String)>,
    seeds: Vec<Seed>,
}

impl ContextBuilder {
    pub fn style(mut self, style: PathStyle) -> Self {
        self.style = style;
        self
    }

    /// Add entries to the captured (inherited) variable set.
    pub fn inherit<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inherited
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Seed a context-local override, applied after the inherited set.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.seeds.push(Seed::Set(name.into(), value.into()));
        self
    }

    /// Seed a context-local clear, applied after the inherited set.
    pub fn unset(mut self, name: impl Into<String>) -> Self {
        self.seeds.push(Seed::Unset(name.into()));
        self
    }

    pub fn build(self) -> ExecutionContext {
        let mut environment = EnvironmentSnapshot::new(self.inherited);
        for seed in self.seeds {
            match seed {
                Seed::Set(name, value) => environment.set(name, value),
                Seed::Unset(name) => environment.unset(&name),
            }
        }
        ExecutionContext {
            resolver: PathResolver::new(self.base, self.style),
            environment,
            tools: ToolCache::default(),
        }
    }
}

/// Isolated view of current directory, environment and process launch
/// configuration for one unit of work.
///
/// Reads never consult ambient process state. A context is not internally
/// synchronized: it is meant to have one owner, and callers sharing one
/// across threads must add their own locking.
#[derive(Debug)]
pub struct ExecutionContext {
    resolver: PathResolver,
    environment: EnvironmentSnapshot,
    tools: ToolCache,
}

impl ExecutionContext {
    /// Start building a context rooted at `base`, with no inherited variables.
    pub fn builder(base: impl Into<String>) -> ContextBuilder {
        ContextBuilder {
            base: base.into(),
            style: PathStyle::native(),
            inherited: Vec::new(),
            seeds: Vec::new(),
        }
    }

    pub fn base_directory(&self) -> &str {
        self.resolver.base()
    }

    pub fn style(&self) -> PathStyle {
        self.resolver.style()
    }

    /// An owned copy of this context's resolver for deferred work.
    ///
    /// The copy keeps the base directory as it is now.
    pub fn resolver(&self) -> PathResolver {
        self.resolver.clone()
    }

    pub fn resolve(&self, path: &str) -> ContextResult<ResolvedPath> {
        self.resolver.resolve(path)
    }

    pub fn get_absolute_path(&self, path: &str) -> ContextResult<String> {
        Ok(self.resolve(path)?.absolute().to_string())
    }

    pub fn get_canonical_form(&self, path: &str) -> ContextResult<String> {
        Ok(self.resolve(path)?.into_canonical())
    }

    pub fn get_environment_variable(&self, name: &str) -> Option<&str> {
        self.environment.get(name)
    }

    /// Like [`get_environment_variable`](Self::get_environment_variable), but
    /// absent or cleared variables are an error.
    pub fn require_environment_variable(&self, name: &str) -> ContextResult<&str> {
        self.environment
            .get(name)
            .ok_or_else(|| ContextError::MissingVariable {
                name: name.to_string(),
            })
    }

    pub fn set_environment_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.environment.set(name, value);
    }

    pub fn unset_environment_variable(&mut self, name: &str) {
        self.environment.unset(name);
    }

    pub fn environment(&self) -> &EnvironmentSnapshot {
        &self.environment
    }

    pub fn build_process_launch<I, S>(
        &self,
        executable: &str,
        arguments: I,
    ) -> ContextResult<ProcessLaunchDescriptor>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        build_launch(self, executable, arguments)
    }

    /// Locate `name` through this context's `PATH`, memoizing hits.
    pub fn resolve_tool<P: ToolProbe + ?Sized>(
        &mut self,
        name: &str,
        probe: &P,
    ) -> ContextResult<Option<String>> {
        self.tools
            .resolve(&self.resolver, &self.environment, name, probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unix(base: &str) -> ExecutionContext {
        ExecutionContext::builder(base)
            .style(PathStyle::Unix)
            .inherit([("NUGET_PACKAGES", "/inherited")])
            .build()
    }

    #[test]
    fn absolute_paths_are_context_independent() {
        let a = unix("/proj/x");
        let b = unix("/proj/y");
        let p = "/etc/config.json";
        assert_eq!(a.get_absolute_path(p).expect("a"), p);
        assert_eq!(b.get_absolute_path(p).expect("b"), p);
    }

    #[test]
    fn relative_paths_follow_own_base() {
        let a = unix("/proj/x");
        let b = unix("/proj/y");
        assert_eq!(
            a.get_absolute_path("cfg/settings.json").expect("a"),
            "/proj/x/cfg/settings.json"
        );
        assert_eq!(
            b.get_absolute_path("cfg/settings.json").expect("b"),
            "/proj/y/cfg/settings.json"
        );
    }

    #[test]
    fn canonical_form_resolves_then_collapses() {
        let ctx = unix("/proj/x/sub");
        assert_eq!(
            ctx.get_canonical_form("../out/./bin").expect("canon"),
            "/proj/x/out/bin"
        );
    }

    #[test]
    fn variables_are_per_context() {
        let mut a = unix("/proj/x");
        let mut b = unix("/proj/y");
        a.set_environment_variable("NUGET_PACKAGES", "/a");
        b.set_environment_variable("NUGET_PACKAGES", "/b");
        assert_eq!(a.get_environment_variable("NUGET_PACKAGES"), Some("/a"));
        assert_eq!(b.get_environment_variable("NUGET_PACKAGES"), Some("/b"));
    }

    #[test]
    fn seeds_apply_over_inherited_values() {
        let ctx = ExecutionContext::builder("/w")
            .inherit([("A", "1"), ("B", "2")])
            .variable("A", "seeded")
            .unset("B")
            .build();
        assert_eq!(ctx.get_environment_variable("A"), Some("seeded"));
        assert_eq!(ctx.get_environment_variable("B"), None);
    }

    #[test]
    fn require_reports_missing_variables() {
        let mut ctx = unix("/proj/x");
        ctx.unset_environment_variable("NUGET_PACKAGES");
        let err = ctx
            .require_environment_variable("NUGET_PACKAGES")
            .expect_err("cleared");
        assert_eq!(
            err,
            ContextError::MissingVariable {
                name: "NUGET_PACKAGES".to_string()
            }
        );
        ctx.set_environment_variable("EMPTY", "");
        assert_eq!(ctx.require_environment_variable("EMPTY"), Ok(""));
    }

    #[test]
    fn empty_base_is_allowed() {
        let ctx = unix("");
        assert_eq!(ctx.get_absolute_path("a/b").expect("resolve"), "a/b");
    }

    #[test]
    fn captured_resolver_outlives_context() {
        let ctx = unix("/proj/x");
        let resolver = ctx.resolver();
        drop(ctx);
        let handle = std::thread::spawn(move || resolver.resolve("lib").map(ResolvedPath::into_canonical));
        let resolved = handle.join().expect("join").expect("resolve");
        assert_eq!(resolved, "/proj/x/lib");
    }

    #[test]
    fn process_launch_uses_context_state() {
        let mut ctx = unix("/proj/x");
        ctx.set_environment_variable("NUGET_PACKAGES", "/a");
        let launch = ctx.build_process_launch("dotnet", ["restore"]).expect("launch");
        assert_eq!(launch.working_directory, "/proj/x");
        assert_eq!(
            launch.environment.get("NUGET_PACKAGES").map(String::as_str),
            Some("/a")
        );
    }
}
