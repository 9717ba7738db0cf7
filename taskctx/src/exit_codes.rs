//! Stable exit codes for `taskctx` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid arguments, configuration, path syntax or launch request.
pub const INVALID: i32 = 1;
/// `taskctx env` or `taskctx which` found nothing in the context.
pub const MISSING: i32 = 2;
/// `taskctx launch --run` child timed out.
pub const TIMED_OUT: i32 = 124;
