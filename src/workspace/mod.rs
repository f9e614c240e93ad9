//! Temp workspaces for tests that need real files, and the per-class audit
//! of whether they needed them.

pub mod behavior;
pub mod temp_dir;
pub mod text;
