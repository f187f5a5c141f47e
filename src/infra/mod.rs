//! Infrastructure layer
//!
//! Handles all I/O operations: network, filesystem, and external processes.

pub mod archive;
pub mod dirs;
pub mod download;
pub mod filesystem;
pub mod process;
