//! Loading the report list.
//!
//! The list is a JSON array of `{ "url": "<string>" }` objects. Only the
//! top-level shape is fatal: a file that is not an array stops the run.
//! Individual entries are classified here and numbered later by the batch
//! runner:
//!
//! * `url` present and non-blank after trimming → usable.
//! * `url` missing, or a blank string → skipped silently.
//! * not an object, or `url` not a string → malformed; skipped with a
//!   warning, or fatal under [`MalformedEntryPolicy::Abort`].

use crate::config::MalformedEntryPolicy;
use crate::error::ReportError;
use crate::model::ReportLink;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// One classified input entry, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEntry {
    /// A usable link; the URL is already trimmed.
    Usable(ReportLink),
    /// No `url`, or a blank one.
    Empty,
    /// Not a `{ "url": "<string>" }` object.
    Malformed { index: usize, detail: String },
}

/// The parsed report list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedLinks {
    pub entries: Vec<LinkEntry>,
}

impl LoadedLinks {
    /// Entries in the file, usable or not.
    pub fn total_entries(&self) -> usize {
        self.entries.len()
    }

    /// Usable links in file order.
    pub fn usable(&self) -> impl Iterator<Item = &ReportLink> {
        self.entries.iter().filter_map(|e| match e {
            LinkEntry::Usable(link) => Some(link),
            _ => None,
        })
    }

    pub fn usable_count(&self) -> usize {
        self.usable().count()
    }

    /// Entries that will not be processed.
    pub fn skipped_count(&self) -> usize {
        self.total_entries() - self.usable_count()
    }
}

/// Read and classify the report list at `path`.
pub async fn load_report_links(
    path: &Path,
    policy: MalformedEntryPolicy,
) -> Result<LoadedLinks, ReportError> {
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

    let links = parse_report_links(&raw, path, policy)?;
    debug!(
        "Loaded {} entries from {} ({} usable)",
        links.total_entries(),
        path.display(),
        links.usable_count()
    );
    Ok(links)
}

/// Classify a report list already in memory. `path` is only used in errors.
pub fn parse_report_links(
    json: &str,
    path: &Path,
    policy: MalformedEntryPolicy,
) -> Result<LoadedLinks, ReportError> {
    let invalid = |detail: String| ReportError::InvalidInput {
        path: path.to_path_buf(),
        detail,
    };

    let value: Value = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(invalid(format!(
                "expected a JSON array of {{\"url\": ...}} objects, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let entry = classify(index, item);
        if let LinkEntry::Malformed { index, ref detail } = entry {
            match policy {
                MalformedEntryPolicy::Abort => {
                    return Err(invalid(format!("entry {}: {}", index, detail)));
                }
                MalformedEntryPolicy::Skip => {
                    warn!("Skipping entry {}: {}", index, detail);
                }
            }
        }
        entries.push(entry);
    }

    Ok(LoadedLinks { entries })
}

fn classify(index: usize, item: &Value) -> LinkEntry {
    let Value::Object(obj) = item else {
        return LinkEntry::Malformed {
            index,
            detail: format!("expected an object, found {}", json_kind(item)),
        };
    };

    match obj.get("url") {
        None => LinkEntry::Empty,
        Some(Value::String(url)) => {
            let url = url.trim();
            if url.is_empty() {
                LinkEntry::Empty
            } else {
                LinkEntry::Usable(ReportLink::new(url))
            }
        }
        Some(other) => LinkEntry::Malformed {
            index,
            detail: format!("\"url\" must be a string, found {}", json_kind(other)),
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
