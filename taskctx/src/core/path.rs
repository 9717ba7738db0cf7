//! Lexical path resolution against a context-owned base directory.
//!
//! Everything here is string manipulation. The filesystem is never consulted
//! and neither is the process current directory, so two resolvers with
//! different bases can never observe each other.

use serde::{Deserialize, Serialize};

use crate::core::error::{ContextError, ContextResult};

/// Path syntax rules used for rooting, joining and canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// `/`-rooted paths, canonical separator `/`.
    Unix,
    /// Drive, UNC and `\`-rooted paths, canonical separator `\`.
    Windows,
}

impl PathStyle {
    /// Style of the platform this crate was compiled for.
    pub fn native() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub fn separator(self) -> char {
        match self {
            Self::Unix => '/',
            Self::Windows => '\\',
        }
    }

    /// Both separators are accepted on input regardless of style.
    fn is_separator(c: char) -> bool {
        c == '/' || c == '\\'
    }

    /// True when `path` is rooted under this style's rules.
    ///
    /// Malformed input (see [`validate_path`]) is never considered absolute.
    pub fn is_absolute(self, path: &str) -> bool {
        matches!(parse_root(path, self), Ok((root, _)) if root != Root::Relative)
    }

    fn eq_paths(self, left: &str, right: &str) -> bool {
        match self {
            Self::Unix => left == right,
            Self::Windows => left.eq_ignore_ascii_case(right),
        }
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::native()
    }
}

/// Result of resolving one input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: String,
    canonical: String,
    style: PathStyle,
}

impl ResolvedPath {
    /// The input when it was already absolute, otherwise `join(base, input)`.
    pub fn absolute(&self) -> &str {
        &self.absolute
    }

    /// The absolute form with `.`/`..` collapsed and separators normalized.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn into_canonical(self) -> String {
        self.canonical
    }

    /// Compare canonical forms (ordinal on Unix, ASCII case-insensitive on Windows).
    pub fn same_location(&self, other: &ResolvedPath) -> bool {
        self.style == other.style && self.style.eq_paths(&self.canonical, &other.canonical)
    }
}

/// A base directory bound to a path style.
///
/// Cloning produces an independent value: a resolver handed to deferred work
/// keeps resolving against the base it was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    base: String,
    style: PathStyle,
}

impl PathResolver {
    pub fn new(base: impl Into<String>, style: PathStyle) -> Self {
        Self {
            base: base.into(),
            style,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    pub fn resolve(&self, path: &str) -> ContextResult<ResolvedPath> {
        resolve(path, &self.base, self.style)
    }
}

/// Resolve `path` against `base`.
///
/// Absolute inputs are returned unchanged and `base` is ignored. Relative
/// inputs are joined onto `base` after separator normalization; an empty base
/// leaves the input relative.
pub fn resolve(path: &str, base: &str, style: PathStyle) -> ContextResult<ResolvedPath> {
    let (root, _) = parse_root(path, style)?;
    let absolute = if root == Root::Relative {
        parse_root(base, style)?;
        join(base, path, style)
    } else {
        path.to_string()
    };
    let canonical = canonicalize(&absolute, style)?;
    Ok(ResolvedPath {
        absolute,
        canonical,
        style,
    })
}

/// Join `path` onto `base` with normalized separators.
pub fn join(base: &str, path: &str, style: PathStyle) -> String {
    let base = normalize_separators(base, style);
    let path = normalize_separators(path, style);
    if base.is_empty() {
        return path;
    }
    if path.is_empty() {
        return base;
    }
    let sep = style.separator();
    let mut joined = base.trim_end_matches(sep).to_string();
    joined.push(sep);
    joined.push_str(path.trim_start_matches(sep));
    joined
}

/// Replace every `/` or `\` with the style's canonical separator.
pub fn normalize_separators(path: &str, style: PathStyle) -> String {
    let sep = style.separator();
    path.chars()
        .map(|c| if PathStyle::is_separator(c) { sep } else { c })
        .collect()
}

/// Lexically collapse `.` and `..` segments, preserving the root prefix.
///
/// `..` pops the previously accumulated segment and is dropped when there is
/// nothing left to pop, so the result never climbs above its root. Empty
/// segments and trailing separators are removed.
pub fn canonicalize(path: &str, style: PathStyle) -> ContextResult<String> {
    let (root, rest) = parse_root(path, style)?;
    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split(PathStyle::is_separator) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let sep = style.separator();
    let mut out = root.render(style);
    let body = segments.join(&sep.to_string());
    if !body.is_empty() && !out.is_empty() && !out.ends_with(sep) {
        out.push(sep);
    }
    out.push_str(&body);
    Ok(out)
}

/// Reject characters the style cannot carry in a path.
pub fn validate_path(path: &str, style: PathStyle) -> ContextResult<()> {
    for (idx, c) in path.char_indices() {
        if c.is_control() {
            return Err(ContextError::invalid_path(
                path,
                format!("control character {c:?} at byte {idx}"),
            ));
        }
        if style == PathStyle::Windows {
            if matches!(c, '<' | '>' | '"' | '|' | '?' | '*') {
                return Err(ContextError::invalid_path(
                    path,
                    format!("reserved character {c:?} at byte {idx}"),
                ));
            }
            if c == ':' && !(idx == 1 && has_drive_letter(path)) {
                return Err(ContextError::invalid_path(
                    path,
                    format!("':' outside the drive prefix at byte {idx}"),
                ));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Root {
    Relative,
    /// Leading separator: `/` on Unix, current-drive root on Windows.
    Separator,
    Drive(char),
    Unc { server: String, share: String },
}

impl Root {
    fn render(&self, style: PathStyle) -> String {
        let sep = style.separator();
        match self {
            Self::Relative => String::new(),
            Self::Separator => sep.to_string(),
            Self::Drive(letter) => format!("{letter}:{sep}"),
            Self::Unc { server, share } => format!("{sep}{sep}{server}{sep}{share}"),
        }
    }
}

fn has_drive_letter(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

/// Split `path` into its root and the remaining (unparsed) segments.
fn parse_root(path: &str, style: PathStyle) -> ContextResult<(Root, &str)> {
    validate_path(path, style)?;
    match style {
        PathStyle::Unix => {
            if path.starts_with(PathStyle::is_separator) {
                Ok((Root::Separator, path.trim_start_matches(PathStyle::is_separator)))
            } else {
                Ok((Root::Relative, path))
            }
        }
        PathStyle::Windows => parse_windows_root(path),
    }
}

fn parse_windows_root(path: &str) -> ContextResult<(Root, &str)> {
    if has_drive_letter(path) {
        let rest = &path[2..];
        if !rest.starts_with(PathStyle::is_separator) {
            return Err(ContextError::invalid_path(
                path,
                "drive-relative paths depend on a per-drive current directory",
            ));
        }
        let letter = path.chars().next().unwrap_or_default();
        return Ok((Root::Drive(letter), rest));
    }

    let mut chars = path.chars();
    let first_two = (chars.next(), chars.next());
    match first_two {
        (Some(a), Some(b)) if PathStyle::is_separator(a) && PathStyle::is_separator(b) => {
            let mut parts = path[2..].splitn(3, PathStyle::is_separator);
            let server = parts.next().unwrap_or_default();
            let share = parts.next().unwrap_or_default();
            if server.is_empty() || share.is_empty() {
                return Err(ContextError::invalid_path(
                    path,
                    "UNC paths need both a server and a share",
                ));
            }
            let rest = parts.next().unwrap_or_default();
            Ok((
                Root::Unc {
                    server: server.to_string(),
                    share: share.to_string(),
                },
                rest,
            ))
        }
        (Some(a), _) if PathStyle::is_separator(a) => {
            Ok((Root::Separator, path.trim_start_matches(PathStyle::is_separator)))
        }
        _ => Ok((Root::Relative, path)),
    }
}
