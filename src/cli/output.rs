//! Output formatting for CLI commands
//!
//! Command results go to stdout; diagnostics go through `tracing` to stderr.

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data (pretty in text mode, compact in JSON mode)
    pub fn data<T: Serialize>(&self, data: &T) -> anyhow::Result<()> {
        let json = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data)?,
            OutputFormat::Json => serde_json::to_string(data)?,
        };
        println!("{}", json);
        Ok(())
    }

    /// Prints one item per line, or a JSON array
    pub fn lines(&self, items: &[&str]) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Text => {
                for item in items {
                    println!("{}", item);
                }
                Ok(())
            }
            OutputFormat::Json => self.data(&items),
        }
    }

    /// Prints a table row (text only, ignored in JSON mode)
    pub fn row(&self, columns: &[&str]) {
        if self.format == OutputFormat::Text {
            println!("{}", columns.join("\t"));
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Returns true if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}
