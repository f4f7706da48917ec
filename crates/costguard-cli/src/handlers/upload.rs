//! Upload command handler

use super::utils::api_client;
use crate::cli::UploadArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use costguard_core::{BatchSession, BatchUploadOrchestrator, FileSelection, FileUploader, SourceFile, UploadState};
use indicatif::ProgressBar;
use std::path::PathBuf;
use tracing::{debug, info, instrument, Instrument};

/// Handle the upload command
#[instrument(skip(config, output), fields(files = args.files.len()))]
pub async fn handle_upload(args: UploadArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let timer = Timer::with_details("upload_command", &format!("{} file(s)", args.files.len()));

    let selection = select_files(&args.files, args.max_files, output).await?;
    if selection.is_empty() {
        return Err(Error::invalid_args("No supported files to upload (.csv, .xlsx, .xls, .pdf)"));
    }

    let client = api_client(config)?;
    let mut uploader = FileUploader::new(client, config.invoice_template(None));
    if args.retry {
        uploader = uploader.with_retry(config.retry_policy());
    }

    output.info(&format!("Uploading {} file(s)", selection.len()))?;
    let progress = output.progress_bar(selection.len() as u64, "Uploading");

    let session = BatchUploadOrchestrator::upload_files(selection.into_files(), &uploader, |snapshot| {
        if let Some(pb) = &progress {
            report_progress(pb, snapshot);
        }
    })
    .instrument(timer.span().clone())
    .await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    output.section("Results")?;
    output.batch(&session)?;

    let summary = session.summary();
    debug!(elapsed_ms = timer.elapsed().as_millis() as u64, "Upload batch rendered");
    if summary.all_succeeded() {
        info!(total = summary.total, "All files uploaded");
        Ok(())
    } else {
        Err(Error::UploadFailed {
            failed: summary.failed,
            total: summary.total,
        })
    }
}

/// Read the given paths, skipping unsupported types, duplicates and anything past `max_files`
async fn select_files(paths: &[PathBuf], max_files: Option<usize>, output: &mut OutputWriter) -> Result<FileSelection> {
    let mut selection = match max_files {
        Some(max) => FileSelection::with_max_files(max),
        None => FileSelection::new(),
    };

    for path in paths {
        if !path.is_file() {
            return Err(Error::FileNotFound { path: path.clone() });
        }

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if !FileSelection::is_supported(&name) {
            output.warning(&format!("Skipping {}: unsupported file type", path.display()))?;
            continue;
        }

        let file = SourceFile::from_path(path).await?;
        if selection.add([file]) == 0 {
            output.warning(&format!("Skipping {}: duplicate or over the file limit", path.display()))?;
        }
    }

    Ok(selection)
}

fn report_progress(pb: &ProgressBar, snapshot: &BatchSession) {
    let done = snapshot.success_count() + snapshot.error_count();
    pb.set_position(done as u64);

    let current = snapshot
        .items()
        .iter()
        .find(|item| matches!(item.state(), UploadState::Uploading));
    if let Some(item) = current {
        pb.set_message(item.file().name().to_string());
    }
}
