//! CLI command implementations.

pub mod common;
pub mod init;
pub mod merge;
pub mod plan;
