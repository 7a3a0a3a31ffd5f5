use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::info;

use crate::record::{Status, UrlRecord};

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

const HEADERS: [&str; 11] = [
    "URL",
    "Status",
    "Framework",
    "Framework Justification",
    "Title 1",
    "Title 2",
    "Title 3",
    "Meta Description 1",
    "Meta Description 2",
    "Meta Description 3",
    "Error",
];

fn nth(values: &Option<[String; 3]>, i: usize) -> &str {
    values.as_ref().map(|v| v[i].as_str()).unwrap_or("")
}

fn row(r: &UrlRecord) -> [&str; 11] {
    let framework = r.framework.as_ref();
    [
        r.url.as_str(),
        r.status.as_str(),
        framework.map(|f| f.name()).unwrap_or(""),
        framework.map(|f| f.justification.as_str()).unwrap_or(""),
        nth(&r.titles, 0),
        nth(&r.titles, 1),
        nth(&r.titles, 2),
        nth(&r.meta_descriptions, 0),
        nth(&r.meta_descriptions, 1),
        nth(&r.meta_descriptions, 2),
        r.error.as_deref().unwrap_or(""),
    ]
}

/// Render records as CSV. Every cell is wrapped in double quotes; embedded
/// quotes are written as-is.
pub fn to_csv(records: &[UrlRecord]) -> String {
    let quote = |cells: &[&str]| {
        cells
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(",")
    };

    std::iter::once(quote(&HEADERS[..]))
        .chain(records.iter().map(|r| quote(&row(r)[..])))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `ccmeta-results-2024-05-01T12-30-00.csv`
pub fn csv_filename(now: DateTime<Utc>) -> String {
    format!("ccmeta-results-{}.csv", now.format("%Y-%m-%dT%H-%M-%S"))
}

/// Lowercased URL with each run of non-alphanumerics collapsed to `_`.
pub fn txt_filename(url: &str) -> String {
    let lower = url.to_lowercase();
    let sanitized = NON_ALNUM_RE.replace_all(&lower, "_");
    let sanitized = sanitized.trim_matches('_');
    if sanitized.is_empty() {
        "page.txt".to_string()
    } else {
        format!("{}.txt", sanitized)
    }
}

/// Write completed records to a timestamped CSV in `dir`.
/// Returns `None` without touching the filesystem when nothing is completed.
pub fn export_completed(records: &[UrlRecord], dir: &Path, now: DateTime<Utc>) -> Result<Option<PathBuf>> {
    let completed: Vec<UrlRecord> = records
        .iter()
        .filter(|r| r.status == Status::Completed)
        .cloned()
        .collect();
    if completed.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join(csv_filename(now));
    std::fs::write(&path, to_csv(&completed))
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Exported {} records to {:?}", completed.len(), path);
    Ok(Some(path))
}

/// Write one record's extracted content to `<sanitized-url>.txt` in `dir`.
pub fn save_content(record: &UrlRecord, dir: &Path) -> Result<Option<PathBuf>> {
    let Some(content) = record.content.as_deref() else {
        return Ok(None);
    };
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join(txt_filename(&record.url));
    std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(Some(path))
}
