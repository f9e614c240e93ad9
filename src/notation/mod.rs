//! Human-writable notations used in coverage expectations.

pub mod arcz;
