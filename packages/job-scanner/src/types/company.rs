use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A job accepted into a company's roster.
///
/// `id` and `found` are minted once, when the posting is first discovered,
/// and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedJob {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Classification verdict or scraped detail text. May be empty.
    #[serde(default)]
    pub description: String,
    pub link: String,
    pub found: DateTime<Utc>,
}

impl TrackedJob {
    pub fn source(&self) -> ScanType {
        ScanType::of_link(&self.link)
    }
}

/// A tracked company as stored in an account's roster document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub last_scan_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Scan cadence such as `"12h"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default)]
    pub jobs: Vec<TrackedJob>,
    /// Fields owned by other parts of the product, carried through untouched
    /// because the roster is written back as a whole.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Company {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            website: None,
            linkedin: None,
            last_scan_date: None,
            notes: None,
            period: None,
            jobs: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_website(mut self, url: impl Into<String>) -> Self {
        self.website = Some(url.into());
        self
    }

    pub fn with_linkedin(mut self, url: impl Into<String>) -> Self {
        self.linkedin = Some(url.into());
        self
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn with_jobs(mut self, jobs: Vec<TrackedJob>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Known links belonging to one source.
    pub fn known_links(&self, source: ScanType) -> Vec<String> {
        self.jobs
            .iter()
            .filter(|job| job.source() == source)
            .map(|job| job.link.clone())
            .collect()
    }

    /// The configured URL for a source, if any.
    pub fn source_url(&self, source: ScanType) -> Option<&str> {
        let url = match source {
            ScanType::Website => self.website.as_deref(),
            ScanType::Linkedin => self.linkedin.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Older roster documents store an unscanned company as `""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Which sub-source a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Website,
    Linkedin,
}

impl ScanType {
    pub const ALL: [ScanType; 2] = [ScanType::Website, ScanType::Linkedin];

    /// Classify a stored link by the source that produced it.
    pub fn of_link(link: &str) -> Self {
        if link.to_ascii_lowercase().contains("linkedin.com") {
            ScanType::Linkedin
        } else {
            ScanType::Website
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Website => "website",
            ScanType::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "website" => Ok(ScanType::Website),
            "linkedin" => Ok(ScanType::Linkedin),
            other => Err(format!("unknown scan type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkedin_links_are_classified_by_host() {
        assert_eq!(
            ScanType::of_link("https://www.LinkedIn.com/jobs/view/123"),
            ScanType::Linkedin
        );
        assert_eq!(
            ScanType::of_link("https://acme.com/careers/1"),
            ScanType::Website
        );
    }

    #[test]
    fn unknown_company_fields_survive_a_round_trip() {
        let raw = r#"{
            "id": "c1",
            "name": "Acme",
            "website": "https://acme.com",
            "last_scan_date": null,
            "jobs": [],
            "pages": [{"link": "https://acme.com"}]
        }"#;
        let company: Company = serde_json::from_str(raw).unwrap();
        assert!(company.extra.contains_key("pages"));

        let back = serde_json::to_value(&company).unwrap();
        assert_eq!(back["pages"][0]["link"], "https://acme.com");
    }

    #[test]
    fn blank_last_scan_date_reads_as_unscanned() {
        let company: Company =
            serde_json::from_str(r#"{"id":"c1","name":"Acme","last_scan_date":"","jobs":[]}"#)
                .unwrap();
        assert!(company.last_scan_date.is_none());

        let company: Company = serde_json::from_str(
            r#"{"id":"c1","name":"Acme","last_scan_date":"2025-03-01T10:00:00.000Z"}"#,
        )
        .unwrap();
        assert!(company.last_scan_date.is_some());
    }

    #[test]
    fn empty_source_urls_are_treated_as_missing() {
        let company = Company::new("c1", "Acme").with_website("   ");
        assert!(company.source_url(ScanType::Website).is_none());
    }

    #[test]
    fn scan_type_parses_case_insensitively() {
        assert_eq!("LinkedIn".parse::<ScanType>().unwrap(), ScanType::Linkedin);
        assert!("email".parse::<ScanType>().is_err());
    }
}
