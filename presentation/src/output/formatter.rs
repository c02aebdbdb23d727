//! Output formatter trait

use agora_domain::OutputFormat;

/// Trait for formatting command results
pub trait OutputFormatter<T: ?Sized> {
    /// Format for a human reader
    fn format(&self, value: &T) -> String;

    /// Format as JSON
    fn format_json(&self, value: &T) -> String;

    /// Format in the requested output format
    fn render(&self, value: &T, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.format(value),
            OutputFormat::Json => self.format_json(value),
        }
    }
}
