//! LinkedIn source backed by the Bright Data datasets API.
//!
//! LinkedIn is not scraped directly. The company's jobs search URL is
//! derived once from its profile snapshot and cached per slug; every scan
//! then runs a job discovery collection against that URL and polls for the
//! snapshot.

use async_trait::async_trait;
use brightdata_client::{
    BrightDataClient, CompanyProfileRecord, JobListingRecord, SnapshotStatus,
};
use std::future::Future;
use std::sync::Arc;
use url::Url;

use super::LinkedInJobs;
use crate::cache::KvCache;
use crate::clock::Sleeper;
use crate::error::{SourceError, SourceResult};
use crate::links;
use crate::poll::{poll_until, Attempt, PollError, PollPolicy};
use crate::types::{Posting, ScanResult};

/// The dataset calls the LinkedIn source needs.
#[async_trait]
pub trait SnapshotApi: Send + Sync {
    async fn collect_company_profile(&self, profile_url: &str) -> brightdata_client::Result<String>;

    async fn discover_jobs(&self, jobs_url: &str) -> brightdata_client::Result<String>;

    async fn company_profiles(
        &self,
        snapshot_id: &str,
    ) -> brightdata_client::Result<SnapshotStatus<CompanyProfileRecord>>;

    async fn job_listings(
        &self,
        snapshot_id: &str,
    ) -> brightdata_client::Result<SnapshotStatus<JobListingRecord>>;
}

#[async_trait]
impl SnapshotApi for BrightDataClient {
    async fn collect_company_profile(&self, profile_url: &str) -> brightdata_client::Result<String> {
        BrightDataClient::collect_company_profile(self, profile_url).await
    }

    async fn discover_jobs(&self, jobs_url: &str) -> brightdata_client::Result<String> {
        BrightDataClient::discover_jobs(self, jobs_url).await
    }

    async fn company_profiles(
        &self,
        snapshot_id: &str,
    ) -> brightdata_client::Result<SnapshotStatus<CompanyProfileRecord>> {
        self.fetch_snapshot(snapshot_id).await
    }

    async fn job_listings(
        &self,
        snapshot_id: &str,
    ) -> brightdata_client::Result<SnapshotStatus<JobListingRecord>> {
        self.fetch_snapshot(snapshot_id).await
    }
}

/// Slug and canonical profile URL of a LinkedIn company URL.
///
/// `https://www.linkedin.com/company/moonee/jobs/` gives
/// `("moonee", "https://www.linkedin.com/company/moonee/")`.
pub fn company_profile(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    let idx = segments.iter().position(|s| *s == "company")?;
    let slug = segments.get(idx + 1)?.to_string();

    let profile_url = format!("{}://{}/company/{}/", parsed.scheme(), host, slug);
    Some((slug, profile_url))
}

/// Worldwide jobs search URL for a company.
pub fn jobs_url(company_name: &str, company_id: &str) -> String {
    let name: String = company_name.chars().filter(|c| !c.is_whitespace()).collect();
    format!("https://www.linkedin.com/jobs/{name}-jobs-worldwide?f_C={company_id}")
}

pub struct LinkedInSource {
    api: Arc<dyn SnapshotApi>,
    cache: Arc<dyn KvCache>,
    poll: PollPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl LinkedInSource {
    pub fn new(
        api: Arc<dyn SnapshotApi>,
        cache: Arc<dyn KvCache>,
        poll: PollPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            api,
            cache,
            poll,
            sleeper,
        }
    }

    /// The cached or freshly derived jobs URL for `slug`. `None` when the
    /// profile snapshot could not produce one.
    async fn jobs_url_for(&self, slug: &str, profile_url: &str) -> Option<String> {
        match self.cache.get(slug).await {
            Ok(Some(url)) => return Some(url),
            Ok(None) => {}
            Err(e) => tracing::warn!(slug, error = %e, "LinkedIn cache read failed"),
        }

        let snapshot_id = match self.api.collect_company_profile(profile_url).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(slug, error = %e, "Company profile collection failed");
                return None;
            }
        };

        let profiles = match self
            .await_snapshot(&snapshot_id, || self.api.company_profiles(&snapshot_id))
            .await
        {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::warn!(slug, error = %e, "Company profile snapshot unavailable");
                return None;
            }
        };

        let url = profiles.iter().find_map(|record| {
            if record.error.is_some() {
                return None;
            }
            let name = record.name.as_deref().filter(|n| !n.trim().is_empty())?;
            let id = record.company_id.as_deref()?;
            Some(jobs_url(name, id))
        });

        match url {
            Some(url) => {
                tracing::info!(slug, jobs_url = %url, "Derived LinkedIn jobs URL");
                if let Err(e) = self.cache.put(slug, &url).await {
                    tracing::warn!(slug, error = %e, "LinkedIn cache write failed");
                }
                Some(url)
            }
            None => {
                tracing::warn!(slug, records = profiles.len(), "Profile snapshot had no usable company");
                None
            }
        }
    }

    async fn await_snapshot<T, F, Fut>(&self, snapshot_id: &str, fetch: F) -> SourceResult<Vec<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = brightdata_client::Result<SnapshotStatus<T>>>,
    {
        let result = poll_until(self.poll, self.sleeper.as_ref(), |attempt| {
            let pending = fetch();
            async move {
                tracing::debug!(snapshot_id, attempt, "Fetching snapshot");
                match pending.await {
                    Ok(SnapshotStatus::Ready(records)) => Ok(Attempt::Ready(records)),
                    Ok(SnapshotStatus::Pending) => Ok(Attempt::Pending),
                    Err(e) => Err(e),
                }
            }
        })
        .await;

        match result {
            Ok(records) => Ok(records),
            Err(PollError::Exhausted { attempts }) => Err(SourceError::SnapshotTimeout {
                snapshot_id: snapshot_id.to_string(),
                attempts,
            }),
            Err(PollError::Failed { attempt, error }) => {
                tracing::warn!(snapshot_id, attempt, error = %error, "Snapshot fetch failed");
                Err(SourceError::Snapshot(error))
            }
        }
    }
}

#[async_trait]
impl LinkedInJobs for LinkedInSource {
    async fn scan(&self, linkedin_url: &str, known: &[String]) -> SourceResult<ScanResult> {
        let Some((slug, profile_url)) = company_profile(linkedin_url) else {
            tracing::warn!(linkedin_url, "No company slug in LinkedIn URL");
            return Ok(ScanResult::empty());
        };

        let Some(jobs_url) = self.jobs_url_for(&slug, &profile_url).await else {
            return Ok(ScanResult::empty());
        };

        let snapshot_id = self.api.discover_jobs(&jobs_url).await?;
        let records = self
            .await_snapshot(&snapshot_id, || self.api.job_listings(&snapshot_id))
            .await?;

        let fresh: Vec<Posting> = records
            .into_iter()
            .filter(|r| r.error.is_none())
            .filter_map(|r| {
                let link = r.url.filter(|u| !u.trim().is_empty())?;
                let mut posting = Posting::new(r.job_title.unwrap_or_default(), link)
                    .with_company(r.company_name.unwrap_or_default());
                posting.detail = r.job_summary;
                Some(posting)
            })
            .collect();

        let removed = links::removed_links(known, fresh.iter().map(|p| p.link.as_str()));
        let jobs: Vec<Posting> = fresh
            .into_iter()
            .filter(|p| !links::is_known(known, &p.link))
            .collect();

        tracing::info!(
            slug = %slug,
            jobs = jobs.len(),
            removed = removed.len(),
            "LinkedIn scan complete"
        );
        Ok(ScanResult::new(jobs, removed))
    }
}
