use serde::{Deserialize, Deserializer, Serialize};

/// Body for a trigger request. One collection input per call.
#[derive(Debug, Clone, Serialize)]
pub struct UrlInput {
    pub url: String,
}

impl UrlInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Query options appended to the trigger endpoint.
#[derive(Debug, Clone, Default)]
pub struct TriggerOptions {
    pub include_errors: bool,
    /// `type=discover_new` collections discover new records instead of
    /// refreshing the given input.
    pub discover_new: bool,
    pub discover_by: Option<String>,
}

impl TriggerOptions {
    /// Plain collection of the given inputs, errors included in the snapshot.
    pub fn collect() -> Self {
        Self {
            include_errors: true,
            ..Default::default()
        }
    }

    /// Discovery of new records starting from a URL.
    pub fn discover_by_url() -> Self {
        Self {
            include_errors: true,
            discover_new: true,
            discover_by: Some("url".to_string()),
        }
    }

    pub(crate) fn query_pairs(&self, dataset_id: &str) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("dataset_id", dataset_id.to_string())];
        if self.include_errors {
            pairs.push(("include_errors", "true".to_string()));
        }
        if self.discover_new {
            pairs.push(("type", "discover_new".to_string()));
        }
        if let Some(by) = &self.discover_by {
            pairs.push(("discover_by", by.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerResponse {
    pub snapshot_id: Option<String>,
}

/// Result of a single snapshot fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotStatus<T> {
    /// Collection still running; poll again later.
    Pending,
    Ready(Vec<T>),
}

impl<T> SnapshotStatus<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, SnapshotStatus::Ready(_))
    }
}

/// A company profile record from the LinkedIn company dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyProfileRecord {
    pub name: Option<String>,
    /// Numeric in some snapshots, string in others.
    #[serde(default, deserialize_with = "string_or_number")]
    pub company_id: Option<String>,
    pub url: Option<String>,
    /// Present instead of the fields above when `include_errors` reported
    /// a failed input.
    pub error: Option<String>,
}

/// A job listing record from the LinkedIn jobs dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListingRecord {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub url: Option<String>,
    pub job_summary: Option<String>,
    pub error: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
