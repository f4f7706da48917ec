//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// CostGuard CLI - Invoice ingestion and anomaly review
///
/// Submit invoices to the CostGuard API, upload source files in batches, and
/// review the anomalies the backend flags.
#[derive(Parser, Debug)]
#[command(
    name = "costguard",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "COSTGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the API is reachable
    Health,

    /// Show an invoice with its anomalies and vendor history
    Invoice(InvoiceArgs),

    /// List invoices with flagged anomalies
    Flagged(FlaggedArgs),

    /// Create an invoice from field values
    Create(CreateArgs),

    /// Record a review decision on an anomaly
    UpdateAnomaly(UpdateAnomalyArgs),

    /// Upload invoice source files one after another
    Upload(UploadArgs),

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the invoice command
#[derive(Parser, Debug)]
pub struct InvoiceArgs {
    /// Invoice identifier
    #[arg(value_name = "ID")]
    pub invoice_id: String,

    /// Number of earlier invoices from the same vendor to include
    #[arg(long, default_value_t = costguard_core::api::DEFAULT_HISTORY_LIMIT)]
    pub history_limit: u32,
}

/// Arguments for the flagged command
#[derive(Parser, Debug)]
pub struct FlaggedArgs {
    /// Only show anomalies in this review status
    #[arg(short, long, value_enum)]
    pub status: Option<ReviewStatus>,

    /// Maximum number of invoices to list
    #[arg(short, long)]
    pub limit: Option<u32>,
}

/// Arguments for the create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// ISO 4217 currency code (defaults to the configured currency)
    #[arg(long)]
    pub currency: Option<String>,

    /// Vendor identifier (defaults to the configured vendor)
    #[arg(long)]
    pub vendor_id: Option<String>,

    /// Vendor display name
    #[arg(long)]
    pub vendor_name: Option<String>,

    /// Invoice date (YYYY-MM-DD)
    #[arg(long)]
    pub invoice_date: Option<NaiveDate>,

    /// Invoice total as a decimal string
    #[arg(long)]
    pub total_amount: Option<String>,

    /// Location of the original invoice document
    #[arg(long)]
    pub source_file_url: Option<String>,
}

/// Arguments for the update-anomaly command
#[derive(Parser, Debug)]
pub struct UpdateAnomalyArgs {
    /// Anomaly identifier
    #[arg(value_name = "ID")]
    pub anomaly_id: String,

    /// New review status
    #[arg(short, long, value_enum)]
    pub status: ReviewStatus,

    /// Reviewer note
    #[arg(short, long)]
    pub note: Option<String>,
}

/// Arguments for the upload command
#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Source files to upload (.csv, .xlsx, .xls, .pdf)
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Upload at most this many files; the rest are skipped
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Retry transient upload failures using the configured retry policy
    #[arg(long)]
    pub retry: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show(ConfigShowArgs),

    /// Write a configuration file with default values
    Init(ConfigInitArgs),
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Arguments for config init
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Where to write the file (defaults to the user config directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Force overwrite of an existing file
    #[arg(long)]
    pub force: bool,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Anomaly review status as typed on the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReviewStatus {
    /// Not yet looked at
    Unreviewed,
    /// Reviewed and found legitimate
    Valid,
    /// Reviewed and confirmed as a problem
    Issue,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl From<ReviewStatus> for costguard_core::AnomalyStatus {
    fn from(status: ReviewStatus) -> Self {
        match status {
            ReviewStatus::Unreviewed => costguard_core::AnomalyStatus::Unreviewed,
            ReviewStatus::Valid => costguard_core::AnomalyStatus::Valid,
            ReviewStatus::Issue => costguard_core::AnomalyStatus::Issue,
        }
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_level() {
        let cli = Cli {
            verbose: 2,
            quiet: false,
            config: None,
            output: OutputFormat::Human,
            no_color: false,
            command: Commands::Health,
        };
        assert_eq!(cli.verbosity_level(), 2);

        let quiet_cli = Cli { quiet: true, ..cli };
        assert_eq!(quiet_cli.verbosity_level(), 0);
    }

    #[test]
    fn test_upload_arguments() {
        let cli = Cli::parse_from(["costguard", "upload", "a.csv", "b.pdf", "--max-files", "1", "--retry"]);
        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.files, vec![PathBuf::from("a.csv"), PathBuf::from("b.pdf")]);
                assert_eq!(args.max_files, Some(1));
                assert!(args.retry);
            }
            other => panic!("expected upload, got {:?}", other),
        }
    }

    #[test]
    fn test_upload_requires_files() {
        assert!(Cli::try_parse_from(["costguard", "upload"]).is_err());
    }

    #[test]
    fn test_update_anomaly_arguments() {
        let cli = Cli::parse_from(["costguard", "-o", "json", "update-anomaly", "an-1", "--status", "issue", "--note", "double billed"]);
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::UpdateAnomaly(args) => {
                assert_eq!(args.anomaly_id, "an-1");
                assert_eq!(args.status, ReviewStatus::Issue);
                assert_eq!(args.note.as_deref(), Some("double billed"));
                assert_eq!(
                    costguard_core::AnomalyStatus::from(args.status),
                    costguard_core::AnomalyStatus::Issue
                );
            }
            other => panic!("expected update-anomaly, got {:?}", other),
        }
    }

    #[test]
    fn test_create_parses_date() {
        let cli = Cli::parse_from(["costguard", "create", "--currency", "EUR", "--invoice-date", "2024-03-01"]);
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.currency.as_deref(), Some("EUR"));
                assert_eq!(args.invoice_date, NaiveDate::from_ymd_opt(2024, 3, 1));
            }
            other => panic!("expected create, got {:?}", other),
        }
        assert!(Cli::try_parse_from(["costguard", "create", "--invoice-date", "March"]).is_err());
    }

    #[test]
    fn test_invoice_default_history_limit() {
        let cli = Cli::parse_from(["costguard", "invoice", "inv-1"]);
        match cli.command {
            Commands::Invoice(args) => assert_eq!(args.history_limit, 10),
            other => panic!("expected invoice, got {:?}", other),
        }
    }
}
