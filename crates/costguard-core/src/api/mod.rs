//! Endpoint client for the invoice API
//!
//! [`ApiClient`] turns each domain operation into a [`Request`](crate::http::Request),
//! runs it through a [`Transport`] under a deadline and classifies the outcome.
//! Callers either get the decoded value or an [`Error::Api`](crate::Error::Api)
//! carrying the [`ClassifiedError`](crate::http::ClassifiedError).

pub mod requests;

use std::future::Future;

use serde::de::DeserializeOwned;
use tracing::Instrument;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::file::SourceFile;
use crate::http::{classify, execute, run_with_retry, Payload, Request, ReqwestTransport, RetryPolicy, Transport};
use crate::types::{
    AnomalyRead, AnomalyUpdate, HealthCheck, InvoiceCreate, InvoiceRead, InvoiceTimeline,
    InvoiceWithAnomalies,
};

pub use requests::{FlaggedQuery, DEFAULT_HISTORY_LIMIT};

/// Client for the invoice anomaly API
#[derive(Debug, Clone)]
pub struct ApiClient<T: Transport = ReqwestTransport> {
    transport: T,
    config: ClientConfig,
}

impl ApiClient<ReqwestTransport> {
    /// Create a client backed by reqwest
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self { transport, config })
    }

    /// Create a client configured from `COSTGUARD_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Create a client over an arbitrary transport
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run `call` against this client, retrying the failures `policy` allows.
    ///
    /// ```no_run
    /// # async fn example() -> costguard_core::Result<()> {
    /// use costguard_core::{ApiClient, http::RetryPolicy};
    ///
    /// let client = ApiClient::from_env()?;
    /// let health = client.with_retry(&RetryPolicy::default(), |c| c.health()).await?;
    /// println!("{}", health.status);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_retry<'a, F, Fut, R>(&'a self, policy: &RetryPolicy, mut call: F) -> Result<R>
    where
        F: FnMut(&'a Self) -> Fut,
        Fut: Future<Output = Result<R>> + 'a,
    {
        run_with_retry(|| call(self), policy).await
    }

    pub async fn health(&self) -> Result<HealthCheck> {
        self.send(requests::health()).await?.into_content()
    }

    /// Fetch an invoice with its anomalies and up to `history_limit` earlier invoices from the same vendor
    pub async fn get_invoice(
        &self,
        invoice_id: &str,
        user_id: &str,
        history_limit: u32,
    ) -> Result<InvoiceTimeline> {
        self.send(requests::get_invoice(invoice_id, user_id, history_limit))
            .await?
            .into_content()
    }

    pub async fn get_flagged_invoices(
        &self,
        user_id: &str,
        filter: &FlaggedQuery,
    ) -> Result<Vec<InvoiceWithAnomalies>> {
        // An empty listing may come back as 204
        Ok(self
            .send(requests::get_flagged_invoices(user_id, filter))
            .await?
            .into_option()
            .unwrap_or_default())
    }

    pub async fn create_invoice(&self, invoice: &InvoiceCreate) -> Result<InvoiceRead> {
        self.send(requests::create_invoice(invoice)?).await?.into_content()
    }

    /// Upload a source file with its invoice metadata under the upload deadline
    pub async fn create_invoice_with_file(
        &self,
        metadata: &InvoiceCreate,
        file: &SourceFile,
    ) -> Result<InvoiceRead> {
        let request = requests::create_invoice_with_file(metadata, file, self.config.timeouts.upload_timeout)?;
        self.send(request).await?.into_content()
    }

    pub async fn update_anomaly(
        &self,
        anomaly_id: &str,
        user_id: &str,
        update: &AnomalyUpdate,
    ) -> Result<AnomalyRead> {
        self.send(requests::update_anomaly(anomaly_id, user_id, update)?)
            .await?
            .into_content()
    }

    async fn send<R: DeserializeOwned>(&self, request: Request) -> Result<Payload<R>> {
        let span = tracing::debug_span!(
            "api_call",
            method = %request.method(),
            path = %request.path(),
        );

        async {
            let result = execute(&self.transport, &request, self.config.timeouts.request_timeout)
                .await
                .and_then(|outcome| classify(&outcome));
            match &result {
                Ok(payload) => tracing::debug!(empty = payload.is_empty(), "API call succeeded"),
                Err(e) => tracing::debug!(error = %e, "API call failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
