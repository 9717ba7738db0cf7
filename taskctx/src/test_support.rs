//! Isolation verification harness.
//!
//! Every isolation scenario has the same shape: build two contexts with
//! different bases and variables, optionally churn the real process state in
//! the background, run the same operation on both (truly concurrently, via a
//! barrier), and check each result reflects only its own context.

use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::core::context::ExecutionContext;
use crate::core::path::PathStyle;

/// Variable seeded with a different value in each context of a pair.
pub const PROBE_VAR: &str = "TASKCTX_PROBE";

/// Two contexts that must never observe each other.
#[derive(Debug)]
pub struct ContextPair {
    pub a: ExecutionContext,
    pub b: ExecutionContext,
}

/// Contexts rooted at `base_a`/`base_b`, seeding [`PROBE_VAR`] with `"a"`/`"b"`.
pub fn distinct_pair(base_a: &str, base_b: &str) -> ContextPair {
    assert_ne!(base_a, base_b, "an isolation pair needs distinct bases");
    let build = |base: &str, probe: &str| {
        ExecutionContext::builder(base)
            .style(PathStyle::native())
            .inherit([("PATH", "/usr/bin")])
            .variable(PROBE_VAR, probe)
            .build()
    };
    ContextPair {
        a: build(base_a, "a"),
        b: build(base_b, "b"),
    }
}

/// Run `op` `rounds` times on each context from two threads released together.
///
/// Returns per-context results in call order. A panic in either worker is
/// re-raised on the calling thread.
pub fn run_concurrently<T, F>(
    a: &mut ExecutionContext,
    b: &mut ExecutionContext,
    rounds: usize,
    op: F,
) -> (Vec<T>, Vec<T>)
where
    T: Send,
    F: Fn(&mut ExecutionContext) -> T + Sync,
{
    let barrier = Barrier::new(2);
    let barrier = &barrier;
    let op = &op;
    thread::scope(|scope| {
        let left = scope.spawn(move || {
            barrier.wait();
            (0..rounds).map(|_| op(a)).collect::<Vec<T>>()
        });
        let right = scope.spawn(move || {
            barrier.wait();
            (0..rounds).map(|_| op(b)).collect::<Vec<T>>()
        });
        let left = left.join().unwrap_or_else(|e| panic::resume_unwind(e));
        let right = right.join().unwrap_or_else(|e| panic::resume_unwind(e));
        (left, right)
    })
}

/// Background thread that keeps mutating process-global state.
///
/// Toggles the real current directory across `dirs` and rewrites `var` in
/// the real environment, simulating an unsafe task running next to the ones
/// under test. The original current directory is restored on stop.
///
/// This is the only way the harness writes the real environment. It assumes
/// the test binary runs no foreign code that reads the environment.
///
/// Only one churn runs at a time per test binary; a second `start` waits.
pub struct AmbientChurn {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<usize>>,
    original_cwd: Option<PathBuf>,
    _exclusive: MutexGuard<'static, ()>,
}

static CHURN_LOCK: Mutex<()> = Mutex::new(());

impl AmbientChurn {
    pub fn start(dirs: Vec<PathBuf>, var: &str) -> Self {
        assert!(!dirs.is_empty(), "churn needs at least one directory");
        let exclusive = CHURN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let original_cwd = std::env::current_dir().ok();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let var = var.to_string();
        let handle = thread::spawn(move || {
            let mut toggles = 0usize;
            loop {
                let dir = &dirs[toggles % dirs.len()];
                std::env::set_current_dir(dir).ok();
                // SAFETY: churn runs only in test binaries whose threads touch
                // the environment through `std::env` alone; no foreign code
                // reads it concurrently.
                #[allow(unsafe_code)]
                unsafe {
                    set_ambient_var(&var, &dir.to_string_lossy());
                }
                toggles += 1;
                if flag.load(Ordering::Relaxed) {
                    break;
                }
                thread::yield_now();
            }
            toggles
        });
        Self {
            stop,
            handle: Some(handle),
            original_cwd,
            _exclusive: exclusive,
        }
    }

    /// Stop churning and return how many toggles happened (always at least one).
    pub fn stop(mut self) -> usize {
        self.halt()
    }

    fn halt(&mut self) -> usize {
        self.stop.store(true, Ordering::Relaxed);
        let toggles = self
            .handle
            .take()
            .map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .unwrap_or_default();
        if let Some(cwd) = &self.original_cwd {
            std::env::set_current_dir(cwd).ok();
        }
        toggles
    }
}

impl Drop for AmbientChurn {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.halt();
        }
    }
}

/// Write a variable into the real process environment.
///
/// # Safety
///
/// No other thread may read or write the environment through anything but
/// `std::env` (which serializes its own accesses) while this runs. Foreign
/// code calling `getenv` concurrently is undefined behavior.
#[allow(unsafe_code)]
unsafe fn set_ambient_var(name: &str, value: &str) {
    // SAFETY: upheld by the caller.
    unsafe { std::env::set_var(name, value) };
}

/// Fresh scratch directories `<tmp>/1 .. <tmp>/n`.
pub fn scratch_dirs(root: &Path, n: usize) -> Vec<PathBuf> {
    (1..=n)
        .map(|idx| {
            let dir = root.join(idx.to_string());
            std::fs::create_dir_all(&dir).expect("create scratch dir");
            dir
        })
        .collect()
}

/// Temporary directory for a scenario.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}
