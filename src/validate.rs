use url::Url;

use crate::error::ValidationError;

/// True iff `input` parses as an absolute URL with a scheme and a host.
pub fn is_valid_url(input: &str) -> bool {
    let input = input.trim();
    if input.is_empty() {
        return false;
    }
    match Url::parse(input) {
        Ok(url) => url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

pub fn validate_url(input: &str) -> Result<String, ValidationError> {
    if is_valid_url(input) {
        Ok(input.trim().to_string())
    } else {
        Err(ValidationError::InvalidUrl(input.to_string()))
    }
}
