use thiserror::Error;

/// A URL rejected before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid URL: {0:?} (expected a full URL such as https://example.com)")]
    InvalidUrl(String),
}

/// Import produced nothing usable; the store is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("no URLs found")]
    NoUrlsFound,
    #[error("no valid URLs found")]
    NoValidUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Failed to fetch URL content")]
    Simulated,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("HTTP {0} for: {1}")]
    Status(u16, String),
}

/// Per-record failure; recorded on that record only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Unknown(String),
}

impl PipelineError {
    /// Best-effort message out of a failed record task.
    pub fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            let payload = err.into_panic();
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "Unknown error".to_string());
            PipelineError::Unknown(msg)
        } else {
            PipelineError::Unknown("Unknown error".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(ImportError::NoUrlsFound.to_string(), "no URLs found");
        assert_eq!(ImportError::NoValidUrls.to_string(), "no valid URLs found");
        assert_eq!(
            PipelineError::from(FetchError::Simulated).to_string(),
            "Failed to fetch URL content"
        );
    }

    #[tokio::test]
    async fn panics_become_unknown_errors() {
        let handle = tokio::spawn(async {
            let words: Vec<&str> = Vec::new();
            if words.is_empty() {
                panic!("parser blew up");
            }
        });
        let err = handle.await.unwrap_err();
        assert_eq!(
            PipelineError::from_join(err),
            PipelineError::Unknown("parser blew up".to_string())
        );
    }
}
