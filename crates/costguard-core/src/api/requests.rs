//! Request descriptors for every API operation
//!
//! One pure function per operation; nothing here touches the network.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::file::SourceFile;
use crate::http::builder::{encode_path_segment, Part, Request, RequestBuilder};
use crate::types::{AnomalyStatus, AnomalyUpdate, InvoiceCreate};

/// Default number of vendor history entries requested with an invoice
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Filters for the flagged invoices listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlaggedQuery {
    pub status: Option<AnomalyStatus>,
    pub limit: Option<u32>,
}

impl FlaggedQuery {
    pub fn with_status(mut self, status: AnomalyStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// `GET /health`
pub fn health() -> Request {
    RequestBuilder::get("/health").build()
}

/// `GET /api/invoices/{id}?user_id&history_limit`
pub fn get_invoice(invoice_id: &str, user_id: &str, history_limit: u32) -> Request {
    RequestBuilder::get(format!("/api/invoices/{}", encode_path_segment(invoice_id)))
        .query("user_id", user_id)
        .query("history_limit", history_limit)
        .build()
}

/// `GET /api/invoices/flagged?user_id[&status][&limit]`
pub fn get_flagged_invoices(user_id: &str, filter: &FlaggedQuery) -> Request {
    RequestBuilder::get("/api/invoices/flagged")
        .query("user_id", user_id)
        .query_opt("status", filter.status)
        // A zero limit means "no limit" and is not sent
        .query_opt("limit", filter.limit.filter(|l| *l > 0))
        .build()
}

/// `POST /api/invoices/` with a JSON body
pub fn create_invoice(invoice: &InvoiceCreate) -> Result<Request> {
    Ok(RequestBuilder::post("/api/invoices/").json(invoice)?.build())
}

/// `POST /api/invoices/` as multipart: `metadata` (JSON) and `file`
pub fn create_invoice_with_file(
    metadata: &InvoiceCreate,
    file: &SourceFile,
    deadline: Duration,
) -> Result<Request> {
    let metadata_json = serde_json::to_string(metadata)
        .map_err(|e| Error::invalid_request(format!("Failed to serialize invoice metadata: {}", e)))?;

    Ok(RequestBuilder::post("/api/invoices/")
        .multipart(vec![
            Part::text("metadata", metadata_json),
            Part::file("file", file.name(), file.content_type(), file.bytes().clone()),
        ])
        .timeout(deadline)
        .build())
}

/// `PATCH /api/invoices/anomalies/{id}?user_id` with `{status, note?}`
pub fn update_anomaly(anomaly_id: &str, user_id: &str, update: &AnomalyUpdate) -> Result<Request> {
    Ok(RequestBuilder::patch(format!(
        "/api/invoices/anomalies/{}",
        encode_path_segment(anomaly_id)
    ))
    .query("user_id", user_id)
    .json(update)?
    .build())
}
