//! Unibuild - universal source-build orchestrator
//!
//! This library downloads third-party source archives, builds them in
//! dependency order through a configure/build/install pipeline and merges
//! per-architecture builds into a single universal output tree.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic: components, resolution, composition and merging
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
