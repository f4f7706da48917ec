//! Handlers for the single-request commands: health, invoice, flagged, create and update-anomaly
//!
//! Reads are retried with the configured policy. Writes are sent once so a
//! timed-out create never turns into a duplicate invoice.

use super::utils::api_client;
use crate::cli::{CreateArgs, FlaggedArgs, InvoiceArgs, UpdateAnomalyArgs};
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use costguard_core::{AnomalyUpdate, FlaggedQuery, InvoiceCreate};
use tracing::{info, instrument};

/// Handle the health command
#[instrument(skip_all)]
pub async fn handle_health(config: &Config, output: &mut OutputWriter) -> Result<()> {
    let client = api_client(config)?;
    let spinner = output.spinner("Contacting API...");

    let health = client.with_retry(&config.retry_policy(), |c| c.health()).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let health = health?;

    info!(status = %health.status, "API health checked");
    output.success(&format!("✓ API at {} is up", client.config().base_url))?;
    output.data(&health)
}

/// Handle the invoice command
#[instrument(skip(config, output), fields(invoice_id = %args.invoice_id))]
pub async fn handle_invoice(args: InvoiceArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let client = api_client(config)?;
    let user_id = config.identity.user_id.as_str();

    let timeline = client
        .with_retry(&config.retry_policy(), |c| {
            c.get_invoice(&args.invoice_id, user_id, args.history_limit)
        })
        .await?;

    output.timeline(&timeline)
}

/// Handle the flagged command
#[instrument(skip(config, output))]
pub async fn handle_flagged(args: FlaggedArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let client = api_client(config)?;
    let user_id = config.identity.user_id.as_str();

    let mut filter = FlaggedQuery::default();
    if let Some(status) = args.status {
        filter = filter.with_status(status.into());
    }
    if let Some(limit) = args.limit {
        filter = filter.with_limit(limit);
    }

    let flagged = client
        .with_retry(&config.retry_policy(), |c| c.get_flagged_invoices(user_id, &filter))
        .await?;

    info!(count = flagged.len(), "Fetched flagged invoices");
    output.flagged(&flagged)
}

/// Handle the create command
#[instrument(skip(config, output))]
pub async fn handle_create(args: CreateArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let client = api_client(config)?;
    let invoice = invoice_from_args(args, config);

    let created = client.create_invoice(&invoice).await?;

    info!(invoice_id = %created.id, "Invoice created");
    output.success(&format!("✓ Created invoice {}", created.id))?;
    output.data(&created)
}

/// Handle the update-anomaly command
#[instrument(skip(config, output), fields(anomaly_id = %args.anomaly_id))]
pub async fn handle_update_anomaly(
    args: UpdateAnomalyArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let client = api_client(config)?;
    let update = AnomalyUpdate {
        status: args.status.into(),
        note: args.note,
    };

    let anomaly = client
        .update_anomaly(&args.anomaly_id, &config.identity.user_id, &update)
        .await?;

    output.success(&format!("✓ Anomaly {} marked {}", anomaly.id, anomaly.status))?;
    output.data(&anomaly)
}

/// Merge command-line fields over the configured identity
fn invoice_from_args(args: CreateArgs, config: &Config) -> InvoiceCreate {
    let mut invoice = config.invoice_template(args.currency.as_deref());
    if args.vendor_id.is_some() {
        invoice.vendor_id = args.vendor_id;
    }
    invoice.vendor_name = args.vendor_name;
    invoice.invoice_date = args.invoice_date;
    invoice.total_amount = args.total_amount;
    invoice.source_file_url = args.source_file_url;
    invoice
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn args() -> CreateArgs {
        CreateArgs {
            currency: None,
            vendor_id: None,
            vendor_name: Some("Acme Supplies".to_string()),
            invoice_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            total_amount: Some("1250.00".to_string()),
            source_file_url: None,
        }
    }

    #[test]
    fn test_invoice_uses_configured_identity() {
        let mut config = Config::default();
        config.identity.vendor_id = Some("vendor-9".to_string());
        config.identity.currency = "EUR".to_string();

        let invoice = invoice_from_args(args(), &config);
        assert_eq!(invoice.user_id, config.identity.user_id);
        assert_eq!(invoice.vendor_id.as_deref(), Some("vendor-9"));
        assert_eq!(invoice.currency, "EUR");
        assert_eq!(invoice.vendor_name.as_deref(), Some("Acme Supplies"));
        assert_eq!(invoice.total_amount.as_deref(), Some("1250.00"));
    }

    #[test]
    fn test_arguments_override_identity() {
        let mut config = Config::default();
        config.identity.vendor_id = Some("vendor-9".to_string());

        let mut args = args();
        args.currency = Some("GBP".to_string());
        args.vendor_id = Some("vendor-1".to_string());

        let invoice = invoice_from_args(args, &config);
        assert_eq!(invoice.currency, "GBP");
        assert_eq!(invoice.vendor_id.as_deref(), Some("vendor-1"));
    }
}
