//! Output formatting and writing utilities
//!
//! This module provides utilities for formatting and writing output in various
//! formats (JSON, YAML, human-readable), with dedicated human renderings for
//! invoices, anomalies and upload batches.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use costguard_core::batch::{BatchSession, BatchSummary, UploadState};
use costguard_core::{AnomalyRead, AnomalySeverity, InvoiceRead, InvoiceTimeline, InvoiceWithAnomalies};
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use tracing::trace;

/// Trait for formatting output with specialized support for API results
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format an invoice with its anomalies and vendor history
    fn format_timeline(&self, timeline: &InvoiceTimeline) -> Result<String>;

    /// Format the flagged invoices listing
    fn format_flagged(&self, invoices: &[InvoiceWithAnomalies]) -> Result<String>;

    /// Format the outcome of an upload batch
    fn format_batch(&self, session: &BatchSession) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
        }
    }

    fn format_timeline(&self, timeline: &InvoiceTimeline) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_timeline_human(timeline)),
            _ => self.format(timeline),
        }
    }

    fn format_flagged(&self, invoices: &[InvoiceWithAnomalies]) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_flagged_human(invoices)),
            _ => self.format(&invoices),
        }
    }

    fn format_batch(&self, session: &BatchSession) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_batch_human(session)),
            _ => self.format(&BatchReport::from(session)),
        }
    }
}

/// Machine-readable batch outcome
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub files: Vec<FileReport>,
}

/// Outcome of one file in a batch
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub name: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&BatchSession> for BatchReport {
    fn from(session: &BatchSession) -> Self {
        Self {
            summary: session.summary(),
            files: session
                .items()
                .iter()
                .map(|item| FileReport {
                    name: item.file().name().to_string(),
                    state: item.state().name(),
                    invoice_id: item.invoice().map(|invoice| invoice.id.clone()),
                    error: item.error_message().map(str::to_string),
                })
                .collect(),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, progress: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: progress && !quiet && format == OutputFormat::Human && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color,
            show_progress: false, // No progress bars with custom writers
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

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let formatted = self.format.format(value)?;
        trace!(len = formatted.len(), "Writing data output");
        self.writeln(formatted.trim_end())
    }

    /// Write an invoice timeline
    pub fn timeline(&mut self, timeline: &InvoiceTimeline) -> Result<()> {
        let formatted = self.format.format_timeline(timeline)?;
        self.writeln(formatted.trim_end())
    }

    /// Write the flagged invoices listing
    pub fn flagged(&mut self, invoices: &[InvoiceWithAnomalies]) -> Result<()> {
        let formatted = self.format.format_flagged(invoices)?;
        self.writeln(formatted.trim_end())
    }

    /// Write the outcome of an upload batch, coloring each file's status
    pub fn batch(&mut self, session: &BatchSession) -> Result<()> {
        if self.format != OutputFormat::Human || !self.use_color {
            let formatted = self.format.format_batch(session)?;
            return self.writeln(formatted.trim_end());
        }

        for item in session.items() {
            let line = batch_line(item.file().name(), item.state());
            let colored = match item.state() {
                UploadState::Success(_) => line.green(),
                UploadState::Error(_) => line.red(),
                _ => line.normal(),
            };
            self.writeln(&colored.to_string())?;
        }
        self.writeln(&batch_totals(&session.summary()).bold().to_string())
    }

    /// Create a progress bar for long operations
    pub fn progress_bar(&self, length: u64, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(length);
        pb.set_style(default_progress_style());
        pb.set_message(message.to_string());
        Some(pb)
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(default_spinner_style());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Helper function to create a progress bar style
pub fn default_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Helper function to create a spinner style
pub fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn severity_marker(severity: AnomalySeverity) -> &'static str {
    match severity {
        AnomalySeverity::High => "!!!",
        AnomalySeverity::Medium => "!! ",
        AnomalySeverity::Low => "!  ",
    }
}

fn invoice_line(invoice: &InvoiceRead) -> String {
    format!(
        "{}  {}  {} {}  vendor {}",
        invoice.invoice_date, invoice.id, invoice.total_amount, invoice.currency, invoice.vendor_id
    )
}

fn anomaly_line(anomaly: &AnomalyRead) -> String {
    let mut line = format!(
        "{} {} [{}] {}: {}",
        severity_marker(anomaly.severity),
        anomaly.id,
        anomaly.status,
        anomaly.anomaly_type,
        anomaly.reason_text
    );
    if let Some(note) = &anomaly.note {
        line.push_str(&format!(" (note: {})", note));
    }
    line
}

/// Format an invoice timeline for human reading
fn format_timeline_human(timeline: &InvoiceTimeline) -> String {
    let invoice = &timeline.invoice;
    let mut output = String::new();

    output.push_str(&format!("Invoice {}\n", invoice.id));
    output.push_str(&format!("  Vendor:   {}\n", invoice.vendor_id));
    output.push_str(&format!("  Date:     {}\n", invoice.invoice_date));
    output.push_str(&format!("  Total:    {} {}\n", invoice.total_amount, invoice.currency));
    if let Some(url) = &invoice.source_file_url {
        output.push_str(&format!("  Source:   {}\n", url));
    }
    output.push_str(&format!("  Received: {}\n", invoice.created_at.format("%Y-%m-%d %H:%M UTC")));

    output.push('\n');
    if timeline.anomalies.is_empty() {
        output.push_str("No anomalies detected\n");
    } else {
        output.push_str(&format!("Anomalies ({}):\n", timeline.anomalies.len()));
        for anomaly in &timeline.anomalies {
            output.push_str(&format!("  {}\n", anomaly_line(anomaly)));
        }
    }

    if !timeline.vendor_history.is_empty() {
        output.push_str(&format!("\nVendor history ({}):\n", timeline.vendor_history.len()));
        for earlier in &timeline.vendor_history {
            output.push_str(&format!("  {}\n", invoice_line(earlier)));
        }
    }

    output
}

/// Format flagged invoices for human reading
fn format_flagged_human(invoices: &[InvoiceWithAnomalies]) -> String {
    if invoices.is_empty() {
        return "No flagged invoices\n".to_string();
    }

    let mut output = String::new();
    for flagged in invoices {
        output.push_str(&invoice_line(&flagged.invoice));
        output.push('\n');
        for anomaly in &flagged.anomalies {
            output.push_str(&format!("    {}\n", anomaly_line(anomaly)));
        }
    }
    output.push_str(&format!("\n{} flagged invoice(s)\n", invoices.len()));
    output
}

fn batch_line(name: &str, state: &UploadState) -> String {
    match state {
        UploadState::Success(invoice) => format!("✓ {} -> invoice {}", name, invoice.id),
        UploadState::Error(message) => format!("✗ {}: {}", name, message),
        other => format!("• {} ({})", name, other),
    }
}

fn batch_totals(summary: &BatchSummary) -> String {
    format!(
        "{} succeeded, {} failed, {} total",
        summary.succeeded, summary.failed, summary.total
    )
}

/// Format a batch outcome for human reading
fn format_batch_human(session: &BatchSession) -> String {
    let mut output = String::new();
    for item in session.items() {
        output.push_str(&batch_line(item.file().name(), item.state()));
        output.push('\n');
    }
    output.push_str(&batch_totals(&session.summary()));
    output.push('\n');
    output
}
