//! Upload lifecycle state
//!
//! A [`BatchSession`] is a snapshot. Every transition produces a new session value
//! so observers can hold on to earlier snapshots without seeing them change.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::file::SourceFile;
use crate::types::InvoiceRead;

/// Lifecycle of one upload: `pending -> uploading -> success | error`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "result", rename_all = "snake_case")]
pub enum UploadState {
    Pending,
    Uploading,
    Success(InvoiceRead),
    Error(String),
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Pending => "pending",
            UploadState::Uploading => "uploading",
            UploadState::Success(_) => "success",
            UploadState::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Success(_) | UploadState::Error(_))
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One file and where it is in the upload lifecycle
#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    file: SourceFile,
    state: UploadState,
}

impl UploadItem {
    pub fn new(file: SourceFile) -> Self {
        Self {
            file,
            state: UploadState::Pending,
        }
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// The created invoice, once uploaded
    pub fn invoice(&self) -> Option<&InvoiceRead> {
        match &self.state {
            UploadState::Success(invoice) => Some(invoice),
            _ => None,
        }
    }

    /// The failure message, once failed
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            UploadState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// `pending -> uploading`
    pub fn start(&self) -> Result<Self> {
        self.transition(UploadState::Uploading)
    }

    /// `uploading -> success`
    pub fn succeed(&self, invoice: InvoiceRead) -> Result<Self> {
        self.transition(UploadState::Success(invoice))
    }

    /// `uploading -> error`
    pub fn fail(&self, message: impl Into<String>) -> Result<Self> {
        self.transition(UploadState::Error(message.into()))
    }

    fn transition(&self, next: UploadState) -> Result<Self> {
        let allowed = matches!(
            (&self.state, &next),
            (UploadState::Pending, UploadState::Uploading)
                | (UploadState::Uploading, UploadState::Success(_))
                | (UploadState::Uploading, UploadState::Error(_))
        );

        if !allowed {
            return Err(Error::InvalidTransition {
                from: self.state.name().to_string(),
                to: next.name().to_string(),
            });
        }

        Ok(Self {
            file: self.file.clone(),
            state: next,
        })
    }
}

/// Ordered upload items plus whether the batch is still running
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSession {
    items: Vec<UploadItem>,
    processing: bool,
}

impl BatchSession {
    /// Begin a batch with every file pending, in the given order
    pub fn start(files: impl IntoIterator<Item = SourceFile>) -> Self {
        Self {
            items: files.into_iter().map(UploadItem::new).collect(),
            processing: true,
        }
    }

    /// Snapshot with the item at `index` replaced
    pub fn with_item(&self, index: usize, item: UploadItem) -> Result<Self> {
        if index >= self.items.len() {
            return Err(Error::invalid_request(format!(
                "Upload item {} out of range for a batch of {}",
                index,
                self.items.len()
            )));
        }

        let mut items = self.items.clone();
        items[index] = item;
        Ok(Self {
            items,
            processing: self.processing,
        })
    }

    /// Snapshot with processing (re)started, items untouched
    pub fn resume(&self) -> Self {
        Self {
            items: self.items.clone(),
            processing: true,
        }
    }

    /// Snapshot with processing ended
    pub fn finish(&self) -> Self {
        Self {
            items: self.items.clone(),
            processing: false,
        }
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&UploadItem> {
        self.items.get(index)
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn success_count(&self) -> usize {
        self.count(|state| matches!(state, UploadState::Success(_)))
    }

    pub fn error_count(&self) -> usize {
        self.count(|state| matches!(state, UploadState::Error(_)))
    }

    pub fn pending_count(&self) -> usize {
        self.count(|state| matches!(state, UploadState::Pending))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from(self)
    }

    fn count(&self, predicate: impl Fn(&UploadState) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(item.state())).count()
    }
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.succeeded == self.total
    }
}

impl From<&BatchSession> for BatchSummary {
    fn from(session: &BatchSession) -> Self {
        Self {
            total: session.len(),
            succeeded: session.success_count(),
            failed: session.error_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn file(name: &str) -> SourceFile {
        SourceFile::new(name, 1, b"data".to_vec())
    }

    fn invoice() -> InvoiceRead {
        InvoiceRead {
            id: "inv-1".to_string(),
            user_id: "user-1".to_string(),
            vendor_id: "vendor-1".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            total_amount: "99.50".to_string(),
            currency: "USD".to_string(),
            source_file_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_forward_transitions() {
        let item = UploadItem::new(file("a.csv"));
        assert_eq!(item.state(), &UploadState::Pending);

        let uploading = item.start().unwrap();
        assert_eq!(uploading.state().name(), "uploading");

        let done = uploading.succeed(invoice()).unwrap();
        assert_eq!(done.invoice().unwrap().id, "inv-1");
        assert!(done.state().is_terminal());

        let failed = uploading.fail("503 Service Unavailable").unwrap();
        assert_eq!(failed.error_message(), Some("503 Service Unavailable"));
        // The original snapshot is untouched
        assert_eq!(item.state(), &UploadState::Pending);
    }

    #[test]
    fn test_non_monotonic_transitions_rejected() {
        let pending = UploadItem::new(file("a.csv"));
        assert!(matches!(
            pending.succeed(invoice()),
            Err(Error::InvalidTransition { ref from, ref to }) if from == "pending" && to == "success"
        ));
        assert!(pending.fail("x").is_err());

        let uploading = pending.start().unwrap();
        assert!(uploading.start().is_err());

        let done = uploading.succeed(invoice()).unwrap();
        assert!(done.start().is_err());
        assert!(done.fail("late").is_err());

        let failed = uploading.fail("boom").unwrap();
        assert!(failed.succeed(invoice()).is_err());
    }

    #[test]
    fn test_session_snapshots_and_counts() {
        let session = BatchSession::start(vec![file("a.csv"), file("b.csv"), file("c.csv")]);
        assert!(session.is_processing());
        assert_eq!(session.pending_count(), 3);

        let first = session.item(0).unwrap().start().unwrap().succeed(invoice()).unwrap();
        let second = session.item(1).unwrap().start().unwrap().fail("nope").unwrap();
        let next = session.with_item(0, first).unwrap().with_item(1, second).unwrap();

        assert_eq!(session.pending_count(), 3);
        assert_eq!(next.success_count(), 1);
        assert_eq!(next.error_count(), 1);
        assert_eq!(next.pending_count(), 1);

        let finished = next.finish();
        assert!(!finished.is_processing());
        assert!(finished.resume().is_processing());
        assert_eq!(finished.resume().items(), finished.items());
        assert_eq!(
            finished.summary(),
            BatchSummary { total: 3, succeeded: 1, failed: 1 }
        );
        assert!(!finished.summary().all_succeeded());
    }

    #[test]
    fn test_with_item_out_of_range() {
        let session = BatchSession::start(vec![file("a.csv")]);
        let item = UploadItem::new(file("b.csv"));
        assert!(matches!(session.with_item(1, item), Err(Error::InvalidRequest { .. })));
    }

    #[test]
    fn test_default_session_is_idle() {
        let session = BatchSession::default();
        assert!(session.is_empty());
        assert!(!session.is_processing());
        assert!(BatchSummary::from(&session).all_succeeded());
    }
}
