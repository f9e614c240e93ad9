//! Process-wide state shared by the harness, the measurement engine, and the
//! tool under test: module registry, module search path, standard streams.

pub mod import_path;
pub mod modules;
pub mod streams;
