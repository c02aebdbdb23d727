//! Presentation layer for agora
//!
//! This crate contains CLI definitions and output formatters.

pub mod cli;
pub mod config;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat};
pub use config::OutputConfig;
pub use output::console::{ConsoleFormatter, TextView};
pub use output::formatter::OutputFormatter;
