// ABOUTME: Library root for stevedore - exposes the pipeline and its seams for testing.
// ABOUTME: The main binary is in main.rs.

pub mod backend;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod output;
pub mod prompt;
pub mod types;
