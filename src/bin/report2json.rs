//! CLI binary for report2json.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use report2json::{
    run_to_file, BatchProgressCallback, BatchStats, ExtractionConfig, MalformedEntryPolicy,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch, one log line per
/// report.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the report currently in flight.
    current_start: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} reports  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            current_start: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.current_start
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total} reports…"))
        ));
    }

    fn on_report_start(&self, report_number: usize, url: &str) {
        if let Ok(mut s) = self.current_start.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(format!("#{report_number} {}", shorten(url, 48)));
    }

    fn on_report_complete(&self, report_number: usize, url: &str, succeeded: bool) {
        let elapsed = self.elapsed_secs();
        let mark = if succeeded { green("✓") } else { red("✗") };
        self.bar.println(format!(
            "  {} Report {:>3}  {}  {}",
            mark,
            report_number,
            shorten(url, 64),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        self.bar.finish_and_clear();
        let total = succeeded + failed;
        if failed == 0 {
            eprintln!(
                "{} {} reports extracted successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} reports extracted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

/// Cut long URLs for the progress display.
fn shorten(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{head}\u{2026}")
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every report listed in report_link.json
  report2json

  # Explicit input and output paths
  report2json links.json -o out/reports.json

  # Use a specific provider and model
  report2json --provider openai --model gpt-4.1-mini links.json

  # Fail on entries that are not {"url": "<string>"} objects
  report2json --strict links.json

  # Write the file only, nothing on stdout
  report2json --quiet links.json

INPUT FORMAT:
  [
    { "url": "https://lab.example.com/reports/123.pdf" },
    { "url": "https://lab.example.com/reports/124" }
  ]
  Entries with a missing or blank "url" are skipped.

OUTPUT FORMAT:
  [
    {
      "report_number": 1,
      "url": "https://lab.example.com/reports/123.pdf",
      "parsed_output": { "Patient_Name": "...", "Test_Results": { ... } }
    }
  ]
  A failed report has "parsed_output": { "error": "...", "raw_output": "..." }.

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY      OpenRouter API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openrouter, openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory
  RUST_LOG                Override the log filter (e.g. report2json=debug)

SETUP:
  1. Set API key:     export OPENROUTER_API_KEY=sk-or-...
  2. Extract:         report2json report_link.json

  PDFium (~30 MB) is downloaded automatically on first run and cached.
  Without it, PDF reports yield no text and are recorded as failures.
"#;

/// Extract structured JSON from medical report URLs using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "report2json",
    version,
    about = "Extract structured JSON from medical report URLs using an LLM",
    long_about = "Download each report listed in a JSON file, extract its text (PDF or plain \
text), and ask an LLM to return patient name, report date, test name, key findings and \
per-parameter test results as JSON. Works with OpenRouter, OpenAI, Anthropic, Google Gemini, \
and any provider supported by edgequake-llm.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JSON file with a list of {"url": ...} entries.
    #[arg(default_value = "report_link.json", env = "REPORT2JSON_INPUT")]
    input: PathBuf,

    /// Where to write the extracted results.
    #[arg(
        short,
        long,
        env = "REPORT2JSON_OUTPUT",
        default_value = "extracted_reports.json"
    )]
    output: PathBuf,

    /// LLM model ID (e.g. google/gemini-2.5-flash, gpt-4.1-mini).
    #[arg(
        long,
        env = "REPORT2JSON_MODEL",
        long_help = "LLM model to use. Default: google/gemini-2.5-flash.\n\
          For OpenRouter, use the vendor/model form (e.g. openai/gpt-4.1-mini)."
    )]
    model: Option<String>,

    /// LLM provider: openrouter, openai, anthropic, gemini, ollama.
    #[arg(
        long,
        env = "REPORT2JSON_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set,\n\
          preferring OpenRouter when OPENROUTER_API_KEY is present."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "REPORT2JSON_TEMPERATURE", default_value_t = 0.15)]
    temperature: f32,

    /// Max LLM output tokens per report.
    #[arg(long, env = "REPORT2JSON_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Per-report LLM call timeout in seconds.
    #[arg(long, env = "REPORT2JSON_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Per-report download timeout in seconds.
    #[arg(long, env = "REPORT2JSON_FETCH_TIMEOUT", default_value_t = 60)]
    fetch_timeout: u64,

    /// User-Agent header for report downloads.
    #[arg(long, env = "REPORT2JSON_USER_AGENT", default_value = "Mozilla/5.0")]
    user_agent: String,

    /// Path to a text file with a custom prompt; must contain {report_text}.
    #[arg(long, env = "REPORT2JSON_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Abort on entries that are not {"url": "<string>"} objects.
    #[arg(long, env = "REPORT2JSON_STRICT")]
    strict: bool,

    /// Disable progress bar.
    #[arg(long, env = "REPORT2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "REPORT2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors; do not print results to stdout.
    #[arg(short, long, env = "REPORT2JSON_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar carries the per-report feedback.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ensure PDFium engine is available ───────────────────────────────────
    // Only PDF reports need it, so a failure here is a warning: text reports
    // still go through and PDF reports are recorded as failures.
    if let Err(e) = ensure_pdf_engine(cli.quiet) {
        eprintln!("{} {:#}", red("⚠ PDF engine unavailable:"), e);
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run batch ────────────────────────────────────────────────────────
    let output = run_to_file(&cli.input, &cli.output, &config)
        .await
        .context("Extraction failed")?;

    if !cli.quiet {
        print_summary(&output.stats, &cli.output, show_progress);

        let json = serde_json::to_string_pretty(&output.results)
            .context("Failed to serialise results")?;
        println!("{json}");
    }

    Ok(())
}

/// Download pdfium on first run; later runs only check the cache path.
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }

    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    let result = tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    });

    match result {
        Ok(_) => {
            dl_bar.finish_with_message("ready ✓");
            Ok(())
        }
        Err(e) => {
            dl_bar.abandon();
            Err(e).context("Failed to download PDFium engine")
        }
    }
}

fn print_summary(stats: &BatchStats, output_path: &std::path::Path, show_progress: bool) {
    // The progress callback already printed the tick line.
    if !show_progress {
        eprintln!("Success: {}", stats.succeeded);
        eprintln!("Failed: {}", stats.failed);
    }
    eprintln!(
        "{}  {}/{} reports  {}ms  →  {}",
        if stats.failed == 0 { green("✔") } else { cyan("⚠") },
        stats.succeeded,
        stats.processed,
        stats.duration_ms,
        bold(&output_path.display().to_string()),
    );
    if stats.skipped_entries > 0 {
        eprintln!(
            "   {}",
            dim(&format!("{} entries skipped (no usable URL)", stats.skipped_entries))
        );
    }
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .temperature(cli.temperature)
        .fetch_timeout_secs(cli.fetch_timeout)
        .user_agent(cli.user_agent.clone())
        .malformed_entries(if cli.strict {
            MalformedEntryPolicy::Abort
        } else {
            MalformedEntryPolicy::Skip
        });

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref path) = cli.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
