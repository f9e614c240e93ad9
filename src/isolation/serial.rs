//! Process-wide serial lock for tests that touch shared process state.
//!
//! `cargo test` runs tests on a thread pool, while the working directory,
//! the environment, the module registry and the standard streams are
//! process-wide. Every isolation guard holds this lock for its whole life,
//! so guarded tests run one at a time. The lock is reentrant: guards stacked
//! on one thread (and a test that locks around its own before/after checks)
//! never deadlock. `parking_lot` locks are not poisoned, so a test that
//! panics does not wedge the tests after it.

use std::sync::LazyLock;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

static SERIAL: LazyLock<ReentrantMutex<()>> = LazyLock::new(|| ReentrantMutex::new(()));

/// Proof that the current thread owns the serial lock.
pub type SerialGuard = ReentrantMutexGuard<'static, ()>;

/// Block until the current thread owns the serial lock.
pub fn lock() -> SerialGuard {
    SERIAL.lock()
}
