//! Transactional orchestration of the economy operations.

pub mod commands;
pub mod manager;

pub use commands::{Command, CommandOutput};
pub use manager::EconomyManager;
