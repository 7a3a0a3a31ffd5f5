use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::parser::frameworks::Framework;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Processing,
    Completed,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Status::Pending),
            "processing" => Some(Status::Processing),
            "completed" => Some(Status::Completed),
            "error" => Some(Status::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One tracked URL and its processing state/results.
///
/// Field names follow the persisted JSON layout (`metaDescriptions`,
/// `createdAt`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub id: String,
    pub url: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titles: Option<[String; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_descriptions: Option<[String; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl UrlRecord {
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            status: Status::Pending,
            framework: None,
            titles: None,
            meta_descriptions: None,
            error: None,
            content: None,
            created_at: Utc::now(),
        }
    }

    /// Same record, picked up by the orchestrator. Clears any stale results.
    pub fn into_processing(self) -> Self {
        Self {
            status: Status::Processing,
            framework: None,
            titles: None,
            meta_descriptions: None,
            error: None,
            content: None,
            ..self
        }
    }

    pub fn into_completed(
        self,
        framework: Framework,
        titles: [String; 3],
        meta_descriptions: [String; 3],
        content: String,
    ) -> Self {
        Self {
            status: Status::Completed,
            framework: Some(framework),
            titles: Some(titles),
            meta_descriptions: Some(meta_descriptions),
            error: None,
            content: Some(content),
            ..self
        }
    }

    pub fn into_failed(self, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            framework: None,
            titles: None,
            meta_descriptions: None,
            error: Some(message.into()),
            content: None,
            ..self
        }
    }

    /// Whether the result fields agree with the lifecycle status.
    pub fn is_consistent(&self) -> bool {
        let has_results =
            self.framework.is_some() && self.titles.is_some() && self.meta_descriptions.is_some();
        match self.status {
            Status::Completed => has_results,
            Status::Error => self.error.is_some(),
            Status::Pending | Status::Processing => {
                self.framework.is_none()
                    && self.titles.is_none()
                    && self.meta_descriptions.is_none()
                    && self.error.is_none()
            }
        }
    }
}

/// Accepts an RFC 3339 string; anything else (null, number, garbage) becomes "now".
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now))
}
