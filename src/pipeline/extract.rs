//! PDF text extraction via pdfium.
//!
//! pdfium is not async-safe, so the work runs inside `spawn_blocking`.
//!
//! The library never downloads pdfium itself. It binds to the copy the CLI
//! made sure of at startup (`pdfium_auto` cache or `PDFIUM_LIB_PATH`), and
//! falls back to a system-wide libpdfium.

use crate::error::FetchError;
use pdfium_render::prelude::*;
use tracing::debug;

/// Extract the text of every page of an in-memory PDF.
///
/// Pages are joined with `\n`; a page without a text layer contributes an
/// empty string, so page boundaries are kept even for scanned pages.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, FetchError> {
    tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&bytes))
        .await
        .map_err(|e| FetchError::Internal(format!("PDF extraction task panicked: {}", e)))?
}

/// Blocking implementation of [`extract_pdf_text`].
pub fn extract_pdf_text_blocking(bytes: &[u8]) -> Result<String, FetchError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| FetchError::CorruptPdf {
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    debug!("PDF loaded: {} pages", pages.len());

    let texts: Vec<String> = pages
        .iter()
        .map(|page| {
            page.text()
                .map(|text| normalise_line_endings(&text.all()))
                .unwrap_or_default()
        })
        .collect();

    Ok(texts.join("\n"))
}

/// Whether a pdfium library can be bound in this process.
pub fn pdfium_available() -> bool {
    bind_pdfium().is_ok()
}

fn bind_pdfium() -> Result<Pdfium, FetchError> {
    if let Some(path) = pdfium_auto::cached_pdfium_path() {
        return pdfium_auto::bind_pdfium_from_path(&path).map_err(|e| {
            FetchError::PdfiumUnavailable {
                reason: e.to_string(),
            }
        });
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| FetchError::PdfiumUnavailable {
            reason: format!(
                "{:?}. Set PDFIUM_LIB_PATH or run the report2json CLI once to download it.",
                e
            ),
        })
}

// pdfium reports line breaks inside a page as CRLF.
fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}
