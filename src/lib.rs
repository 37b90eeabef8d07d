//! # report2json
//!
//! Turn a list of medical report URLs into structured JSON records with an
//! LLM.
//!
//! Each report is downloaded, reduced to plain text (pdfium for PDFs, the raw
//! body for anything else), and handed to a chat model with a fixed
//! extraction prompt. The model's reply is parsed as JSON, with one repair
//! attempt for replies that wrap the object in prose or a code fence.
//!
//! ## Pipeline Overview
//!
//! ```text
//! report_link.json
//!  │
//!  ├─ 1. Input      JSON array of {"url": ...}; blank URLs skipped
//!  ├─ 2. Fetch      GET with Mozilla/5.0 UA, 60 s timeout; failures → ""
//!  ├─ 3. Extract    PDF → per-page text joined with "\n" (spawn_blocking)
//!  ├─ 4. Interpret  one completion at temperature 0.15
//!  ├─ 5. Repair     whole reply, else widest {...} span, else failure
//!  └─ 6. Output     pretty JSON array of ReportResult
//! ```
//!
//! Reports are processed one at a time, in list order. A report that fails
//! at any stage still gets a result, carrying a
//! [`ParsedReport::Failed`] instead of a record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report2json::{run_to_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENROUTER_API_KEY / OPENAI_API_KEY / ...
//!     let config = ExtractionConfig::default();
//!     let output = run_to_file("report_link.json", "extracted_reports.json", &config).await?;
//!     eprintln!("Success: {}  Failed: {}", output.stats.succeeded, output.stats.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `report2json` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! report2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_links, read_results, run, run_sync, run_to_file, write_results};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, MalformedEntryPolicy};
pub use error::{FetchError, ModelError, ReportError};
pub use model::{
    BatchOutput, BatchStats, ParsedReport, ReportLink, ReportRecord, ReportResult, TestResult,
    TestStatus,
};
pub use pipeline::fetch::Fetcher;
pub use pipeline::input::{load_report_links, LinkEntry, LoadedLinks};
pub use pipeline::interpret::Interpreter;
pub use pipeline::llm::{resolve_completion_model, CompletionModel, ProviderModel};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
