#![forbid(unsafe_code)]

//! SQLite-backed persistence for tracked jobs.

mod store;

pub use store::*;
