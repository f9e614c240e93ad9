//! Snapshot-and-restore guards, one per axis of process-wide state.
//!
//! Each guard takes its snapshot in `new` and restores in `Drop`, so the
//! rollback also runs while a failing test unwinds. Guards compose by
//! ordering: whatever is created first is dropped last.

pub mod environ;
pub mod import_path;
pub mod modules;
pub mod serial;
pub mod streams;
