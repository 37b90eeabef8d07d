//! Error types for the report2json library.
//!
//! Three error types reflect the three places a batch can go wrong:
//!
//! * [`ReportError`] — **Fatal**: the run cannot proceed at all (input list
//!   unreadable, output file unwritable, provider not configured). Returned
//!   as `Err(ReportError)` from the top-level `run*` functions.
//!
//! * [`FetchError`] — **Non-fatal**: one URL could not be turned into text
//!   (bad status, empty body, corrupt PDF). The fetcher logs it and hands the
//!   interpreter an empty string instead.
//!
//! * [`ModelError`] — **Non-fatal**: the completion call for one report
//!   failed. The interpreter folds it into
//!   [`crate::model::ParsedReport::Failed`] so the batch keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the report2json library.
///
/// Per-report failures never show up here; they are recorded inside the
/// corresponding [`crate::model::ReportResult`].
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The report list was not found at the given path.
    #[error("Report list not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// The report list exists but could not be read.
    #[error("Failed to read report list '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report list is not a JSON array of `{ "url": ... }` objects.
    #[error("Invalid report list '{path}': {detail}")]
    InvalidInput { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the results file.
    #[error("Failed to write results file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single report URL produced no usable text.
///
/// Never returned from the batch entry points: [`crate::pipeline::fetch`]
/// logs it and degrades to an empty string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with something other than 200.
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    /// 200 OK, but the body was empty.
    #[error("empty response body")]
    EmptyBody,

    /// The request exceeded the fetch timeout.
    #[error("download timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection, TLS, redirect or body-read failure.
    #[error("download failed: {reason}")]
    Download { reason: String },

    /// No pdfium library could be bound in this process.
    #[error("PDF engine unavailable: {reason}")]
    PdfiumUnavailable { reason: String },

    /// pdfium could not open the payload as a PDF.
    #[error("PDF could not be parsed: {detail}")]
    CorruptPdf { detail: String },

    /// The blocking extraction task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A failed completion call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The provider returned an error (network, auth, bad request, …).
    #[error("{message}")]
    Api { message: String },

    /// The call exceeded the configured API timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },
}
