//! Report download: URL → plain text.
//!
//! The server's `Content-Type` decides how the body is read. Anything that
//! claims to be a PDF goes through pdfium ([`super::extract`]); everything
//! else is taken as text, which covers portals that serve reports as HTML or
//! plain text.
//!
//! [`Fetcher::fetch_report_text`] never fails: every [`FetchError`] is logged and
//! turned into an empty string, which the interpreter reads as "no usable
//! text". Use [`Fetcher::fetch_report`] to see the typed error.

use crate::config::ExtractionConfig;
use crate::error::{FetchError, ReportError};
use crate::pipeline::extract;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client for report downloads, built once per batch.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl Fetcher {
    /// Build the client with the configured timeout and `User-Agent`.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ReportError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout_secs,
        })
    }

    /// Download `url` and return its text, or `""` on any failure.
    ///
    /// The URL is requested exactly as given; trailing punctuation is part
    /// of it.
    pub async fn fetch_report_text(&self, url: &str) -> String {
        info!("Downloading: {}", url);
        match self.fetch_report(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Error fetching {}: {}", url, e);
                String::new()
            }
        }
    }

    /// Download `url` and return its text.
    pub async fn fetch_report(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.download_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if is_pdf_content_type(&content_type) {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| self.download_error(e))?;
            if bytes.is_empty() {
                return Err(FetchError::EmptyBody);
            }
            debug!("Fetched {} bytes ({})", bytes.len(), content_type);

            let text = extract::extract_pdf_text(bytes.to_vec()).await?;
            info!("PDF text extracted ({} chars)", text.chars().count());
            Ok(text)
        } else {
            // Decoded by the charset in Content-Type, UTF-8 when absent.
            let text = response
                .text()
                .await
                .map_err(|e| self.download_error(e))?;
            if text.is_empty() {
                return Err(FetchError::EmptyBody);
            }
            warn!(
                "Report is not a PDF (content-type {:?}); using the raw body as text",
                content_type
            );
            Ok(text)
        }
    }

    fn download_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            FetchError::Download {
                reason: e.to_string(),
            }
        }
    }
}

/// Whether a `Content-Type` value announces a PDF.
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("pdf")
}
