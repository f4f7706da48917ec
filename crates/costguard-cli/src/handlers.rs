//! Command handlers for CLI subcommands
//!
//! Each handler takes its parsed arguments, the effective configuration and the
//! output writer, talks to the API through `costguard_core`, and renders the result.

mod completions;
mod config;
mod invoices;
mod upload;
mod utils;

pub use completions::handle_completions;
pub use config::handle_config;
pub use invoices::{handle_create, handle_flagged, handle_health, handle_invoice, handle_update_anomaly};
pub use upload::handle_upload;
