//! CostGuard Core - Resilient ingestion client for the invoice anomaly API
//!
//! This crate talks to the CostGuard backend: it submits invoices (as JSON or as
//! uploaded source files), fetches invoice timelines and flagged invoices, and
//! records reviewer decisions on anomalies.
//!
//! # Main Components
//!
//! - **Network layer** ([`http`]): request descriptors, a deadline-enforcing transport,
//!   error classification and opt-in retry with geometric backoff
//! - **Endpoint client** ([`api`]): one typed method per API operation
//! - **Batch upload** ([`batch`]): sequential multi-file upload with per-file outcomes
//! - **Error Handling**: classified API failures kept apart from everything else
//!
//! # Example
//!
//! ```no_run
//! use costguard_core::{ApiClient, Result};
//! use costguard_core::api::FlaggedQuery;
//! use costguard_core::types::AnomalyStatus;
//!
//! async fn example() -> Result<()> {
//!     let client = ApiClient::from_env()?;
//!     let filter = FlaggedQuery::default().with_status(AnomalyStatus::Unreviewed);
//!     for flagged in client.get_flagged_invoices("user-1", &filter).await? {
//!         println!("{} has {} anomalies", flagged.invoice.id, flagged.anomalies.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod file;
pub mod http;
pub mod types;

// Re-export main types for convenience
pub use api::{ApiClient, FlaggedQuery};
pub use batch::{BatchSession, BatchSummary, BatchUploadOrchestrator, FileSelection, FileUploader, UploadState};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use file::{FileKey, SourceFile};
pub use http::{ClassifiedError, ErrorKind, RetryPolicy};
pub use types::{
    AnomalyRead, AnomalySeverity, AnomalyStatus, AnomalyType, AnomalyUpdate, HealthCheck,
    InvoiceCreate, InvoiceRead, InvoiceTimeline, InvoiceWithAnomalies,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
