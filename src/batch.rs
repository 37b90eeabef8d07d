//! Batch entry points: report list in, `Vec<ReportResult>` out.
//!
//! Reports are handled strictly one after another: each is downloaded and
//! interpreted before the next one starts. Per-report failures are recorded
//! in the result list; only setup and file I/O errors are returned as `Err`.

use crate::config::ExtractionConfig;
use crate::error::ReportError;
use crate::model::{BatchOutput, BatchStats, ReportResult};
use crate::pipeline::fetch::Fetcher;
use crate::pipeline::input::{self, LinkEntry, LoadedLinks};
use crate::pipeline::interpret::Interpreter;
use crate::pipeline::llm;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Process every usable link in the report list at `input_path`.
///
/// # Errors
/// Returns `Err(ReportError)` only for fatal errors:
/// - report list missing, unreadable or not a JSON array
/// - a malformed entry under [`crate::MalformedEntryPolicy::Abort`]
/// - no LLM provider could be configured
///
/// A report that cannot be downloaded or parsed is still `Ok`; check
/// `output.stats.failed`.
pub async fn run(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ReportError> {
    let input_path = input_path.as_ref();
    info!("Loading report list: {}", input_path.display());
    let links = input::load_report_links(input_path, config.malformed_entries).await?;

    if links.usable_count() == 0 {
        info!("No report URLs to process");
        return Ok(empty_output(&links, config));
    }

    let model = llm::resolve_completion_model(config)?;
    let fetcher = Fetcher::new(config)?;
    let interpreter = Interpreter::new(model, config);

    Ok(process_links(&links, &fetcher, &interpreter, config).await)
}

/// Process an already-loaded report list.
///
/// Usable entries are numbered from 1 in list order; empty and malformed
/// entries get no number and no result.
pub async fn process_links(
    links: &LoadedLinks,
    fetcher: &Fetcher,
    interpreter: &Interpreter,
    config: &ExtractionConfig,
) -> BatchOutput {
    let start = Instant::now();
    let total = links.usable_count();
    info!("Processing {} reports", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut results = Vec::with_capacity(total);
    let mut succeeded = 0;
    let mut failed = 0;

    for entry in &links.entries {
        let link = match entry {
            LinkEntry::Usable(link) => link,
            LinkEntry::Empty => {
                debug!("Skipping entry without URL");
                continue;
            }
            LinkEntry::Malformed { .. } => continue,
        };

        let report_number = results.len() + 1;
        info!("[{}/{}] Processing report: {}", report_number, total, link.url);
        if let Some(ref cb) = config.progress_callback {
            cb.on_report_start(report_number, &link.url);
        }

        let text = fetcher.fetch_report_text(&link.url).await;
        let parsed_output = interpreter.interpret(&text).await;

        let result = ReportResult {
            report_number,
            url: link.url.clone(),
            parsed_output,
        };
        if result.succeeded() {
            succeeded += 1;
        } else {
            failed += 1;
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_report_complete(report_number, &link.url, result.succeeded());
        }
        results.push(result);
    }

    info!("Success: {}", succeeded);
    info!("Failed: {}", failed);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(succeeded, failed);
    }

    let stats = BatchStats {
        total_entries: links.total_entries(),
        skipped_entries: links.skipped_count(),
        processed: results.len(),
        succeeded,
        failed,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    BatchOutput { results, stats }
}

/// Run the batch and write the results to `output_path`.
///
/// The file is written even when every report failed.
pub async fn run_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ReportError> {
    let output = run(input_path, config).await?;
    write_results(output_path, &output.results).await?;
    Ok(output)
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(input_path, config))
}

/// Write results as a pretty-printed JSON array.
///
/// Non-ASCII text is written as-is. Uses atomic write (temp file + rename)
/// so a crash never leaves a half-written results file; parent directories
/// are created.
pub async fn write_results(
    output_path: impl AsRef<Path>,
    results: &[ReportResult],
) -> Result<(), ReportError> {
    let path = output_path.as_ref();
    let write_err = |source: std::io::Error| ReportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(results)
        .map_err(|e| ReportError::Internal(format!("Failed to serialise results: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Wrote {} results to {}", results.len(), path.display());
    Ok(())
}

/// Read a results file written by [`write_results`].
pub async fn read_results(path: impl AsRef<Path>) -> Result<Vec<ReportResult>, ReportError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ReportError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ReportError::InputReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    serde_json::from_str(&raw).map_err(|e| ReportError::InvalidInput {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn empty_output(links: &LoadedLinks, config: &ExtractionConfig) -> BatchOutput {
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(0);
        cb.on_batch_complete(0, 0);
    }
    BatchOutput {
        results: Vec::new(),
        stats: BatchStats {
            total_entries: links.total_entries(),
            skipped_entries: links.skipped_count(),
            ..Default::default()
        },
    }
}
