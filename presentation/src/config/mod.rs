//! Presentation-level configuration
//!
//! Resolves how results are rendered from the CLI flag and the `[output]`
//! section of the config file.

use crate::cli::commands::OutputFormat as CliOutputFormat;
use agora_domain::OutputFormat;

/// Output configuration for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

impl OutputConfig {
    /// The CLI flag wins over the configured format
    pub fn resolve(
        flag: Option<CliOutputFormat>,
        configured: Option<OutputFormat>,
        color: bool,
    ) -> Self {
        let format = flag
            .map(OutputFormat::from)
            .or(configured)
            .unwrap_or_default();
        Self {
            format,
            // JSON is never colored
            color: color && format == OutputFormat::Text,
        }
    }

    /// Apply the color setting to the process-wide `colored` state
    pub fn apply(&self) {
        if !self.color {
            colored::control::set_override(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_file() {
        let config = OutputConfig::resolve(Some(CliOutputFormat::Text), Some(OutputFormat::Json), true);
        assert_eq!(config.format, OutputFormat::Text);
        assert!(config.color);
    }

    #[test]
    fn test_file_format_used_without_flag() {
        let config = OutputConfig::resolve(None, Some(OutputFormat::Json), true);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.color);
    }

    #[test]
    fn test_defaults_to_text() {
        assert_eq!(OutputConfig::resolve(None, None, false).format, OutputFormat::Text);
    }
}
