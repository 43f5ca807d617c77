//! Golden Butterfly portfolio updater.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod browser;
pub mod config;
pub mod engine;
pub mod scrapers;
pub mod sheets;
pub mod types;
