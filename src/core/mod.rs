//! Core business logic module
//!
//! This module contains the build model and orchestration logic.
//! Process spawning, network and filesystem helpers live in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`manifest`] - Build configuration (unibuild.toml) parsing
//! - [`component`] - Component definitions and dependency links
//! - [`registry`] - Component registry and lookup
//! - [`resolver`] - Dependency resolution and build ordering
//! - [`template`] - `$NAME` placeholder substitution
//! - [`build_env`] - Per-stage flag and environment composition
//! - [`pipeline`] - Unpack/patch/configure/build/install runner
//! - [`universalizer`] - File merge strategies for architecture-dependent files
//! - [`merge`] - Classification and merging of per-architecture trees
//! - [`builder`] - Build orchestration (single-pass and per-architecture)
//! - [`fetch`] - Source archive download logic

pub mod build_env;
pub mod builder;
pub mod component;
pub mod fetch;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod template;
pub mod universalizer;
