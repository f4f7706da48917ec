//! Sequential batch upload driver
//!
//! Files are uploaded strictly one after another in selection order. A failing
//! file is recorded on its item and never stops the rest of the batch.

use async_trait::async_trait;

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::file::SourceFile;
use crate::http::{ReqwestTransport, RetryPolicy, Transport};
use crate::types::{InvoiceCreate, InvoiceRead};

use super::session::{BatchSession, UploadItem, UploadState};

/// Message recorded for failures that did not go through the classifier
pub const GENERIC_UPLOAD_FAILURE: &str = "Upload failed";

/// Message recorded for items handed to a run while already uploading
pub const INTERRUPTED_UPLOAD_FAILURE: &str = "Upload interrupted";

/// Destination of a single file upload
#[async_trait]
pub trait UploadEndpoint: Send + Sync {
    async fn upload(&self, file: &SourceFile) -> Result<InvoiceRead>;
}

/// Uploads files through [`ApiClient::create_invoice_with_file`] with shared metadata
#[derive(Debug, Clone)]
pub struct FileUploader<T: Transport = ReqwestTransport> {
    client: ApiClient<T>,
    metadata: InvoiceCreate,
    retry: Option<RetryPolicy>,
}

impl<T: Transport> FileUploader<T> {
    pub fn new(client: ApiClient<T>, metadata: InvoiceCreate) -> Self {
        Self {
            client,
            metadata,
            retry: None,
        }
    }

    /// Retry each upload under `policy`
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn metadata(&self) -> &InvoiceCreate {
        &self.metadata
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }
}

#[async_trait]
impl<T: Transport> UploadEndpoint for FileUploader<T> {
    async fn upload(&self, file: &SourceFile) -> Result<InvoiceRead> {
        match &self.retry {
            Some(policy) => {
                self.client
                    .with_retry(policy, |client| client.create_invoice_with_file(&self.metadata, file))
                    .await
            }
            None => self.client.create_invoice_with_file(&self.metadata, file).await,
        }
    }
}

/// Drives a [`BatchSession`] to completion against an [`UploadEndpoint`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchUploadOrchestrator;

impl BatchUploadOrchestrator {
    /// Start a session for `files` and run it
    pub async fn upload_files<E, O>(files: Vec<SourceFile>, endpoint: &E, observer: O) -> BatchSession
    where
        E: UploadEndpoint + ?Sized,
        O: FnMut(&BatchSession),
    {
        Self::run(BatchSession::start(files), endpoint, observer).await
    }

    /// Upload every pending item of `session` in order.
    ///
    /// The session is processing from the first snapshot `observer` sees until the
    /// last one. Items already terminal are left alone. Items still `uploading`
    /// belong to a run that never reported back; they are failed with
    /// [`INTERRUPTED_UPLOAD_FAILURE`] rather than uploaded again. The returned
    /// session is never processing and every item is terminal.
    pub async fn run<E, O>(session: BatchSession, endpoint: &E, mut observer: O) -> BatchSession
    where
        E: UploadEndpoint + ?Sized,
        O: FnMut(&BatchSession),
    {
        tracing::info!(files = session.len(), "Starting batch upload");
        let mut session = session.resume();
        observer(&session);

        for index in 0..session.len() {
            let Some(item) = session.item(index).cloned() else {
                break;
            };

            let uploading = match item.state() {
                UploadState::Pending => item.start(),
                UploadState::Uploading => {
                    tracing::warn!(index, file = %item.file().name(), "Failing upload interrupted by an earlier run");
                    match item.fail(INTERRUPTED_UPLOAD_FAILURE) {
                        Ok(failed) => session = Self::apply(session, index, failed, &mut observer),
                        Err(e) => tracing::error!(index, error = %e, "Upload item rejected its terminal state"),
                    }
                    continue;
                }
                UploadState::Success(_) | UploadState::Error(_) => {
                    tracing::debug!(index, state = %item.state(), "Skipping finished item");
                    continue;
                }
            };
            let uploading = match uploading {
                Ok(uploading) => uploading,
                Err(e) => {
                    tracing::error!(index, error = %e, "Upload item rejected its start");
                    continue;
                }
            };
            session = Self::apply(session, index, uploading.clone(), &mut observer);

            let file = uploading.file();
            let finished = match endpoint.upload(file).await {
                Ok(invoice) => {
                    tracing::info!(file = %file.name(), invoice_id = %invoice.id, "File uploaded");
                    uploading.succeed(invoice)
                }
                Err(e) => {
                    let message = failure_message(&e);
                    tracing::warn!(file = %file.name(), error = %e, "File upload failed");
                    uploading.fail(message)
                }
            };

            match finished {
                Ok(item) => session = Self::apply(session, index, item, &mut observer),
                Err(e) => tracing::error!(index, error = %e, "Upload item rejected its terminal state"),
            }
        }

        let session = session.finish();
        tracing::info!(
            succeeded = session.success_count(),
            failed = session.error_count(),
            "Batch upload finished"
        );
        observer(&session);
        session
    }

    fn apply<O>(session: BatchSession, index: usize, item: UploadItem, observer: &mut O) -> BatchSession
    where
        O: FnMut(&BatchSession),
    {
        match session.with_item(index, item) {
            Ok(next) => {
                observer(&next);
                next
            }
            Err(e) => {
                tracing::error!(index, error = %e, "Failed to record upload transition");
                session
            }
        }
    }
}

/// User-facing message for a failed upload
fn failure_message(error: &Error) -> String {
    match error.classified() {
        Some(classified) => classified.message().to_string(),
        None => GENERIC_UPLOAD_FAILURE.to_string(),
    }
}
