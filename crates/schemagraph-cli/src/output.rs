//! Output formatting and writing utilities
//!
//! Results are written to stdout in the selected format (human, JSON,
//! pretty JSON or YAML). Machine formats carry no decoration so they can be
//! piped into other tools.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use schemagraph::{ResultError, ValidationResult};
use serde::Serialize;
use std::io::{self, Write};
use tracing::trace;

/// Outcome of validating one instance document
#[derive(Debug, Clone, Serialize)]
pub struct InstanceReport {
    pub instance: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResultError>,
    /// Set when the document could not be loaded at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

impl InstanceReport {
    pub fn from_result(instance: impl Into<String>, result: ValidationResult) -> Self {
        Self {
            instance: instance.into(),
            valid: result.is_valid(),
            errors: result.into_errors(),
            load_error: None,
        }
    }

    pub fn unreadable(instance: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            valid: false,
            errors: Vec::new(),
            load_error: Some(reason.into()),
        }
    }
}

/// Everything `validate` reports for one schema
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub schema: String,
    pub valid: bool,
    pub instances: Vec<InstanceReport>,
}

impl ValidationReport {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            valid: true,
            instances: Vec::new(),
        }
    }

    pub fn push(&mut self, report: InstanceReport) {
        self.valid &= report.valid;
        self.instances.push(report);
    }

    /// Instances that loaded but violate the schema
    pub fn invalid_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|report| !report.valid && report.load_error.is_none())
            .count()
    }

    pub fn unreadable_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|report| report.load_error.is_some())
            .count()
    }
}

/// Result of `check`
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub schema: String,
    pub valid: bool,
    pub nodes: usize,
}

/// Trait for formatting output with specialized support for reports
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a validation report
    fn format_validation_report(&self, report: &ValidationReport, use_color: bool) -> Result<String>;

    /// Format a check report
    fn format_check_report(&self, report: &CheckReport, use_color: bool) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_validation_report(&self, report: &ValidationReport, use_color: bool) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_validation_report_human(report, use_color)),
            _ => self.format(report),
        }
    }

    fn format_check_report(&self, report: &CheckReport, use_color: bool) -> Result<String> {
        match self {
            OutputFormat::Human => {
                let mark = paint("✓", use_color, Paint::Good);
                Ok(format!(
                    "{} {} compiles ({} nodes)",
                    mark, report.schema, report.nodes
                ))
            }
            _ => self.format(report),
        }
    }
}

#[derive(Clone, Copy)]
enum Paint {
    Good,
    Bad,
    Dim,
}

fn paint(text: &str, use_color: bool, paint: Paint) -> String {
    if !use_color {
        return text.to_string();
    }
    match paint {
        Paint::Good => text.green().to_string(),
        Paint::Bad => text.red().to_string(),
        Paint::Dim => text.dimmed().to_string(),
    }
}

/// Format a validation report for human reading
fn format_validation_report_human(report: &ValidationReport, use_color: bool) -> String {
    let mut output = String::new();

    for instance in &report.instances {
        if let Some(reason) = &instance.load_error {
            output.push_str(&format!(
                "{} {}: could not be loaded\n",
                paint("!", use_color, Paint::Bad),
                instance.instance
            ));
            output.push_str(&format!("  {}\n", paint(reason, use_color, Paint::Dim)));
        } else if instance.valid {
            output.push_str(&format!(
                "{} {}: valid\n",
                paint("✓", use_color, Paint::Good),
                instance.instance
            ));
        } else {
            output.push_str(&format!(
                "{} {}: {} error(s)\n",
                paint("✗", use_color, Paint::Bad),
                instance.instance,
                instance.errors.len()
            ));
            for error in &instance.errors {
                output.push_str(&format!(
                    "  - {}: {} {}\n",
                    error.field(),
                    error.description(),
                    paint(&format!("[{}]", error.error_type()), use_color, Paint::Dim)
                ));
            }
        }
    }

    let total = report.instances.len();
    let passed = total - report.invalid_count() - report.unreadable_count();
    output.push_str(&format!("\n{}/{} instance(s) valid against {}", passed, total, report.schema));
    output
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer on stdout
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self::with_writer(format, use_color, quiet, Box::new(io::stdout()))
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color,
            quiet,
            writer,
        }
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message (human format only)
    pub fn info(&mut self, message: &str) -> Result<()> {
        trace!("Output info: {}", message);

        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a validation report
    ///
    /// In quiet human mode only the failing instances are listed.
    pub fn validation_report(&mut self, report: &ValidationReport) -> Result<()> {
        let formatted = if self.quiet && self.format == OutputFormat::Human {
            let failing = ValidationReport {
                instances: report
                    .instances
                    .iter()
                    .filter(|instance| !instance.valid)
                    .cloned()
                    .collect(),
                ..report.clone()
            };
            if failing.instances.is_empty() {
                return Ok(());
            }
            self.format.format_validation_report(&failing, self.use_color)?
        } else {
            self.format.format_validation_report(report, self.use_color)?
        };
        self.writeln(&formatted)
    }

    /// Write a check report
    pub fn check_report(&mut self, report: &CheckReport) -> Result<()> {
        if self.quiet && self.format == OutputFormat::Human {
            return Ok(());
        }
        let formatted = self.format.format_check_report(report, self.use_color)?;
        self.writeln(&formatted)
    }
}

#[cfg(test)]
mod tests {
    include!("output/tests.rs");
}
