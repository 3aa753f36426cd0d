//! CLI command implementations.

pub mod apply;
pub mod diff;
pub mod edit;
pub mod init;
