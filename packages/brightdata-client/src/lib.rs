//! Pure Bright Data dataset REST API client.
//!
//! A minimal client for the Bright Data datasets API. Supports triggering a
//! collection and fetching its snapshot once it is ready. Polling policy is
//! left to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use brightdata_client::{BrightDataClient, JobListingRecord, SnapshotStatus};
//!
//! let client = BrightDataClient::new("your-api-token".into());
//!
//! let snapshot_id = client.discover_jobs("https://www.linkedin.com/jobs/...").await?;
//! if let SnapshotStatus::Ready(jobs) = client.fetch_snapshot::<JobListingRecord>(&snapshot_id).await? {
//!     println!("{} jobs", jobs.len());
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{BrightDataError, Result};
pub use types::{
    CompanyProfileRecord, JobListingRecord, SnapshotStatus, TriggerOptions, TriggerResponse,
    UrlInput,
};

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

const BASE_URL: &str = "https://api.brightdata.com/datasets/v3";

/// Dataset for LinkedIn company profiles.
pub const COMPANY_PROFILE_DATASET: &str = "gd_l1vikfnt1wgvvqz95w";

/// Dataset for LinkedIn job listings.
pub const JOB_LISTING_DATASET: &str = "gd_lpfll7v5hcqtkxl6l";

const SNAPSHOT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct BrightDataClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl BrightDataClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Trigger a dataset collection. Returns the snapshot id to poll.
    pub async fn trigger<I: Serialize + ?Sized>(
        &self,
        dataset_id: &str,
        input: &I,
        options: &TriggerOptions,
    ) -> Result<String> {
        let url = format!("{}/trigger", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&options.query_pairs(dataset_id))
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BrightDataError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let trigger: TriggerResponse = resp.json().await?;
        let snapshot_id = trigger
            .snapshot_id
            .filter(|id| !id.is_empty())
            .ok_or(BrightDataError::MissingSnapshotId)?;

        tracing::debug!(dataset_id, snapshot_id = %snapshot_id, "Collection triggered");
        Ok(snapshot_id)
    }

    /// Fetch a snapshot once. `200` means the data is ready; any other
    /// success status means the collection is still running.
    pub async fn fetch_snapshot<T: DeserializeOwned>(
        &self,
        snapshot_id: &str,
    ) -> Result<SnapshotStatus<T>> {
        let url = format!("{}/snapshot/{}", self.base_url, snapshot_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("format", "json")])
            .timeout(SNAPSHOT_REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BrightDataError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        if status != StatusCode::OK {
            tracing::debug!(snapshot_id, status = status.as_u16(), "Snapshot not ready");
            return Ok(SnapshotStatus::Pending);
        }

        let body = resp.text().await?;
        let records: Vec<T> = serde_json::from_str(&body)?;
        Ok(SnapshotStatus::Ready(records))
    }

    /// Trigger a company profile collection for a LinkedIn company URL.
    pub async fn collect_company_profile(&self, profile_url: &str) -> Result<String> {
        tracing::info!(profile_url, "Triggering company profile collection");
        self.trigger(
            COMPANY_PROFILE_DATASET,
            &UrlInput::new(profile_url),
            &TriggerOptions::collect(),
        )
        .await
    }

    /// Trigger discovery of job listings reachable from a jobs search URL.
    pub async fn discover_jobs(&self, jobs_url: &str) -> Result<String> {
        tracing::info!(jobs_url, "Triggering job listing discovery");
        self.trigger(
            JOB_LISTING_DATASET,
            &UrlInput::new(jobs_url),
            &TriggerOptions::discover_by_url(),
        )
        .await
    }
}
