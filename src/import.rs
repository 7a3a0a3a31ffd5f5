use std::collections::HashSet;

use tracing::debug;

use crate::error::ImportError;
use crate::validate::is_valid_url;

const DELIMITER: char = ',';
const SCHEME_PREFIX: &str = "http";
const QUOTES: [char; 2] = ['"', '\''];

/// Scan pasted text or a delimited file for URL-like cells.
///
/// Every line is split on commas, each cell trimmed of whitespace and
/// surrounding single or double quotes, and cells starting with `http` are
/// kept in first-seen order without duplicates. No validation happens here.
pub fn parse_candidates(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        for cell in line.split(DELIMITER) {
            let cell = cell.trim().trim_matches(QUOTES).trim();
            if cell.starts_with(SCHEME_PREFIX) && seen.insert(cell.to_string()) {
                urls.push(cell.to_string());
            }
        }
    }

    urls
}

/// Candidates that also pass the validator, or the reason nothing was found.
pub fn accept_urls(text: &str) -> Result<Vec<String>, ImportError> {
    let candidates = parse_candidates(text);
    if candidates.is_empty() {
        return Err(ImportError::NoUrlsFound);
    }

    let total = candidates.len();
    let valid: Vec<String> = candidates.into_iter().filter(|c| is_valid_url(c)).collect();
    debug!("Import: {} candidates, {} valid", total, valid.len());

    if valid.is_empty() {
        return Err(ImportError::NoValidUrls);
    }
    Ok(valid)
}
