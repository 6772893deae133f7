//! Subcommand implementations.

pub mod analyze;
pub mod common;
pub mod monitor;
pub mod params;
pub mod response;
