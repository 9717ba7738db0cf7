//! Filesystem-backed [`ToolProbe`].

use std::fs;
use std::path::Path;

use crate::core::tools::ToolProbe;

/// Treats regular files (with an execute bit on Unix) as runnable.
///
/// Relative paths are never probed; they would resolve against the process
/// current directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl ToolProbe for FsProbe {
    fn is_executable(&self, path: &str) -> bool {
        let path = Path::new(path);
        if !path.is_absolute() {
            return false;
        }
        let Ok(meta) = fs::metadata(path) else {
            return false;
        };
        meta.is_file() && has_execute_bit(&meta)
    }
}

#[cfg(unix)]
fn has_execute_bit(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_bit(_meta: &fs::Metadata) -> bool {
    true
}
