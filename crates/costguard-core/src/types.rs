//! Domain types exchanged with the CostGuard invoice API
//!
//! These mirror the backend schemas: invoices, their detected anomalies, and the
//! payloads used to create invoices or review anomalies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind of anomaly detected on an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    /// Unit prices drifting upward across a vendor's invoices
    PriceCreep,
    /// Same invoice submitted more than once
    Duplicate,
    /// Total far outside the vendor's usual range
    AbnormalTotal,
}

/// How serious an anomaly is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

/// Review status of an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyStatus {
    /// Nobody has looked at it yet
    Unreviewed,
    /// Reviewed and accepted as legitimate
    Valid,
    /// Reviewed and confirmed as a problem
    Issue,
}

impl AnomalyStatus {
    /// Wire representation used in query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyStatus::Unreviewed => "UNREVIEWED",
            AnomalyStatus::Valid => "VALID",
            AnomalyStatus::Issue => "ISSUE",
        }
    }
}

impl fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNREVIEWED" => Ok(AnomalyStatus::Unreviewed),
            "VALID" => Ok(AnomalyStatus::Valid),
            "ISSUE" => Ok(AnomalyStatus::Issue),
            other => Err(format!(
                "unknown anomaly status '{}', expected one of UNREVIEWED, VALID, ISSUE",
                other
            )),
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyType::PriceCreep => write!(f, "PRICE_CREEP"),
            AnomalyType::Duplicate => write!(f, "DUPLICATE"),
            AnomalyType::AbnormalTotal => write!(f, "ABNORMAL_TOTAL"),
        }
    }
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalySeverity::Low => write!(f, "LOW"),
            AnomalySeverity::Medium => write!(f, "MEDIUM"),
            AnomalySeverity::High => write!(f, "HIGH"),
        }
    }
}

/// An anomaly as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRead {
    pub id: String,
    pub invoice_id: String,
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: AnomalySeverity,
    pub status: AnomalyStatus,
    pub reason_text: String,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review update for a single anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyUpdate {
    pub status: AnomalyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AnomalyUpdate {
    pub fn new(status: AnomalyStatus) -> Self {
        Self { status, note: None }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Payload for creating an invoice, either as JSON or as upload metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceCreate {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,
    /// Decimal amount, kept as a string to avoid float rounding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
    /// 3-letter ISO currency code
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file_url: Option<String>,
}

impl InvoiceCreate {
    /// Minimal payload: who submits it and in which currency
    pub fn new(user_id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            vendor_id: None,
            vendor_name: None,
            invoice_date: None,
            total_amount: None,
            currency: currency.into(),
            source_file_url: None,
        }
    }

    pub fn with_vendor_id(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self
    }
}

/// An invoice record as stored by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRead {
    pub id: String,
    pub user_id: String,
    pub vendor_id: String,
    pub invoice_date: NaiveDate,
    pub total_amount: String,
    pub currency: String,
    #[serde(default)]
    pub source_file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An invoice together with the anomalies flagged on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceWithAnomalies {
    #[serde(flatten)]
    pub invoice: InvoiceRead,
    #[serde(default)]
    pub anomalies: Vec<AnomalyRead>,
}

/// Invoice detail view: the invoice, its anomalies and the vendor's recent history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTimeline {
    pub invoice: InvoiceRead,
    #[serde(default)]
    pub anomalies: Vec<AnomalyRead>,
    #[serde(default)]
    pub vendor_history: Vec<InvoiceRead>,
}

/// Health endpoint response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
}
