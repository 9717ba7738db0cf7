//! Per-context environment variables.
//!
//! A snapshot copies its initial entries once and afterwards only ever reads
//! its own maps. Writes land in an overlay that records both new values and
//! explicit clears, so "cleared by this task" stays distinct from "never set".
//!
//! Names compare case-insensitively. Every captured spelling is kept, so a
//! launched process still receives both `http_proxy` and `HTTP_PROXY` when
//! both were inherited, and a write to a captured name lands on the captured
//! spelling(s).

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct VarKey(String);

impl VarKey {
    fn of(name: &str) -> Self {
        Self(name.to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    value: String,
}

/// Captured spellings of one case-insensitive name, in capture order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Spellings(Vec<Entry>);

impl Spellings {
    fn insert(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.value = value,
            None => self.0.push(Entry { name, value }),
        }
    }

    /// The exact spelling if captured, otherwise the last one captured.
    fn lookup(&self, name: &str) -> Option<&Entry> {
        self.0
            .iter()
            .find(|entry| entry.name == name)
            .or_else(|| self.0.last())
    }

    fn names(&self) -> Vec<String> {
        self.0.iter().map(|entry| entry.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Override {
    Set { names: Vec<String>, value: String },
    Cleared,
}

/// Where the value returned for a name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    /// Captured when the snapshot was created and not overridden since.
    Captured(&'a str),
    /// Written through [`EnvironmentSnapshot::set`].
    Overridden(&'a str),
    /// Explicitly cleared through [`EnvironmentSnapshot::unset`].
    Cleared,
    /// Neither captured nor written.
    Absent,
}

impl<'a> Binding<'a> {
    pub fn value(self) -> Option<&'a str> {
        match self {
            Self::Captured(value) | Self::Overridden(value) => Some(value),
            Self::Cleared | Self::Absent => None,
        }
    }
}

/// Isolated variable mapping owned by exactly one execution context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    captured: BTreeMap<VarKey, Spellings>,
    overlay: BTreeMap<VarKey, Override>,
}

impl EnvironmentSnapshot {
    /// Copy `initial` into a new snapshot.
    ///
    /// Later duplicates of the exact same name win; names differing only in
    /// case are kept side by side.
    pub fn new<I, K, V>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut captured: BTreeMap<VarKey, Spellings> = BTreeMap::new();
        for (name, value) in initial {
            let name = name.into();
            captured
                .entry(VarKey::of(&name))
                .or_default()
                .insert(name, value.into());
        }
        Self {
            captured,
            overlay: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.binding(name).value()
    }

    pub fn binding(&self, name: &str) -> Binding<'_> {
        let key = VarKey::of(name);
        match self.overlay.get(&key) {
            Some(Override::Set { value, .. }) => Binding::Overridden(value),
            Some(Override::Cleared) => Binding::Cleared,
            None => self
                .captured
                .get(&key)
                .and_then(|spellings| spellings.lookup(name))
                .map_or(Binding::Absent, |entry| Binding::Captured(&entry.value)),
        }
    }

    /// Write `value` for this context only.
    ///
    /// A name that was captured keeps its captured spelling(s); a new name is
    /// stored as written.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = VarKey::of(&name);
        let names = match self.captured.get(&key) {
            Some(spellings) => spellings.names(),
            None => vec![name],
        };
        self.overlay.insert(
            key,
            Override::Set {
                names,
                value: value.into(),
            },
        );
    }

    /// Clear `name` for this context; reads return `None` until the next `set`.
    pub fn unset(&mut self, name: &str) {
        self.overlay.insert(VarKey::of(name), Override::Cleared);
    }

    /// Drop any override for `name` so the captured value shows through again.
    pub fn reset(&mut self, name: &str) {
        self.overlay.remove(&VarKey::of(name));
    }

    /// Effective `(name, value)` pairs: captured entries with the overlay applied.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        let captured = self
            .captured
            .iter()
            .filter(|(key, _)| !self.overlay.contains_key(*key))
            .flat_map(|(_, spellings)| spellings.0.iter())
            .map(|entry| (entry.name.as_str(), entry.value.as_str()));
        captured.chain(self.written())
    }

    /// Pairs written through [`set`](Self::set) since creation.
    pub fn written(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.overlay
            .values()
            .filter_map(|over| match over {
                Override::Set { names, value } => Some((names, value)),
                Override::Cleared => None,
            })
            .flat_map(|(names, value)| {
                names
                    .iter()
                    .map(move |name| (name.as_str(), value.as_str()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn seeded() -> EnvironmentSnapshot {
        EnvironmentSnapshot::new([("Path", "/usr/bin"), ("HOME", "/home/a")])
    }

    #[test]
    fn lookups_ignore_case() {
        let env = seeded();
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert_eq!(env.get("path"), Some("/usr/bin"));
        assert_eq!(env.get("home"), Some("/home/a"));
    }

    #[test]
    fn creation_copies_the_source() {
        let mut source = HashMap::new();
        source.insert("X".to_string(), "1".to_string());
        let env = EnvironmentSnapshot::new(source.clone());
        source.insert("X".to_string(), "2".to_string());
        source.insert("Y".to_string(), "3".to_string());
        assert_eq!(env.get("X"), Some("1"));
        assert_eq!(env.get("Y"), None);
    }

    #[test]
    fn set_overrides_captured_value() {
        let mut env = seeded();
        env.set("HOME", "/home/b");
        assert_eq!(env.binding("HOME"), Binding::Overridden("/home/b"));
        assert_eq!(env.get("home"), Some("/home/b"));
    }

    #[test]
    fn cleared_is_distinct_from_absent() {
        let mut env = seeded();
        env.unset("HOME");
        assert_eq!(env.binding("HOME"), Binding::Cleared);
        assert_eq!(env.binding("NEVER_SET"), Binding::Absent);
        assert_eq!(env.get("HOME"), None);

        env.reset("HOME");
        assert_eq!(env.binding("HOME"), Binding::Captured("/home/a"));
    }

    #[test]
    fn clones_do_not_share_writes() {
        let mut a = seeded();
        let b = a.clone();
        a.set("NUGET_PACKAGES", "/a");
        assert_eq!(a.get("NUGET_PACKAGES"), Some("/a"));
        assert_eq!(b.get("NUGET_PACKAGES"), None);
    }

    #[test]
    fn repeated_reads_are_stable() {
        let env = seeded();
        let first = env.get("PATH").map(str::to_string);
        let second = env.get("PATH").map(str::to_string);
        assert_eq!(first, second);
    }

    #[test]
    fn iter_applies_overlay() {
        let mut env = seeded();
        env.set("PATH", "/opt/bin");
        env.unset("home");
        env.set("NEW", "v");

        let mut pairs: Vec<(&str, &str)> = env.iter().collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![("NEW", "v"), ("Path", "/opt/bin")]);

        let mut written: Vec<(&str, &str)> = env.written().collect();
        written.sort_unstable();
        assert_eq!(written, vec![("NEW", "v"), ("Path", "/opt/bin")]);
    }

    #[test]
    fn names_differing_in_case_are_all_kept() {
        let env = EnvironmentSnapshot::new([
            ("http_proxy", "http://lower"),
            ("HTTP_PROXY", "http://upper"),
        ]);
        assert_eq!(env.get("http_proxy"), Some("http://lower"));
        assert_eq!(env.get("HTTP_PROXY"), Some("http://upper"));
        assert_eq!(env.get("Http_Proxy"), Some("http://upper"));

        let mut pairs: Vec<(&str, &str)> = env.iter().collect();
        pairs.sort_unstable();
        assert_eq!(
            pairs,
            vec![("HTTP_PROXY", "http://upper"), ("http_proxy", "http://lower")]
        );
    }

    #[test]
    fn set_keeps_captured_spellings() {
        let mut env = EnvironmentSnapshot::new([
            ("HOME", "/home/a"),
            ("http_proxy", "http://lower"),
            ("HTTP_PROXY", "http://upper"),
        ]);
        env.set("home", "/home/b");
        env.set("Http_Proxy", "http://new");

        let mut pairs: Vec<(&str, &str)> = env.iter().collect();
        pairs.sort_unstable();
        assert_eq!(
            pairs,
            vec![
                ("HOME", "/home/b"),
                ("HTTP_PROXY", "http://new"),
                ("http_proxy", "http://new"),
            ]
        );
        assert_eq!(env.get("http_proxy"), Some("http://new"));
    }
}
