//! Batch upload of invoice source files
//!
//! - [`FileSelection`] collects the files to send, without duplicates
//! - [`BatchSession`] records each file's upload lifecycle as immutable snapshots
//! - [`BatchUploadOrchestrator`] uploads the files in order, tolerating partial failure

pub mod orchestrator;
pub mod selection;
pub mod session;

pub use orchestrator::{
    BatchUploadOrchestrator, FileUploader, UploadEndpoint, GENERIC_UPLOAD_FAILURE, INTERRUPTED_UPLOAD_FAILURE,
};
pub use selection::FileSelection;
pub use session::{BatchSession, BatchSummary, UploadItem, UploadState};
