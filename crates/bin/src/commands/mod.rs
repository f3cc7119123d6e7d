//! Subcommand implementations.

pub mod health;
pub mod key;
pub mod serve;
