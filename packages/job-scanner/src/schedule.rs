//! Scheduled scans and new-posting digests using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler
//!     ├─► scan job (SCAN_CRON)
//!     │       └─► for each account, each company that is due → scan_company
//!     └─► digest job (DIGEST_CRON)
//!             └─► jobs found in the last window → render → Notifier
//! ```

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::StoreResult;
use crate::notify::{send_digest, CompanyDigest, Digest, Notifier};
use crate::orchestrator::Scanner;
use crate::stores::RosterStore;
use crate::types::{Company, ScanType};

/// Hours in a period such as `"12h"`. Other units are not scheduled.
pub fn parse_period_hours(period: &str) -> Option<i64> {
    let hours = period.trim().strip_suffix('h')?.trim().parse::<i64>().ok()?;
    (hours > 0).then_some(hours)
}

/// Whether a company should be scanned at `now`. Companies without an
/// hourly period are never due; unscanned ones always are.
pub fn is_due(company: &Company, now: DateTime<Utc>) -> bool {
    let Some(hours) = company.period.as_deref().and_then(parse_period_hours) else {
        return false;
    };
    match company.last_scan_date {
        None => true,
        Some(last) => now - last >= Duration::hours(hours),
    }
}

/// Companies of an account that are due at `now`.
pub async fn due_companies(
    store: &dyn RosterStore,
    account_id: &str,
    now: DateTime<Utc>,
) -> StoreResult<Vec<Company>> {
    Ok(store
        .get_roster(account_id)
        .await?
        .into_iter()
        .filter(|c| is_due(c, now))
        .collect())
}

/// Scan every due company of every account, one at a time. Returns how
/// many scans succeeded; failures are logged and skipped.
pub async fn run_due_scans(scanner: &Scanner, now: DateTime<Utc>) -> Result<usize> {
    tracing::info!("Running periodic scan task");
    let store = scanner.store().clone();
    let mut scanned = 0;

    for account_id in store.account_ids().await? {
        let due = match due_companies(store.as_ref(), &account_id, now).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(account_id = %account_id, error = %e, "Could not load roster");
                continue;
            }
        };

        for company in due {
            match scanner
                .scan_company(&account_id, Some(&company.id), &ScanType::ALL)
                .await
            {
                Ok(_) => scanned += 1,
                Err(e) => {
                    tracing::error!(
                        account_id = %account_id,
                        company_id = %company.id,
                        error = %e,
                        "Scheduled scan failed"
                    );
                }
            }
        }
    }

    tracing::info!(scanned, "Periodic scan task completed");
    Ok(scanned)
}

/// Jobs whose `found` lies within `window` of `now`, per company, split
/// into website and LinkedIn postings.
pub async fn collect_new_postings(
    store: &dyn RosterStore,
    now: DateTime<Utc>,
    window: Duration,
) -> StoreResult<Digest> {
    let mut digest = Digest::default();

    for account_id in store.account_ids().await? {
        for company in store.get_roster(&account_id).await? {
            let (linkedin_jobs, website_jobs): (Vec<_>, Vec<_>) = company
                .jobs
                .into_iter()
                .filter(|job| (now - job.found).num_seconds().abs() <= window.num_seconds())
                .partition(|job| job.source() == ScanType::Linkedin);

            let entry = CompanyDigest {
                name: company.name,
                website_jobs,
                linkedin_jobs,
            };
            if entry.total() > 0 {
                digest.companies.push(entry);
            }
        }
    }

    Ok(digest)
}

/// Start the scan and digest jobs.
pub async fn start_scheduler(
    scanner: Arc<Scanner>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: &Config,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let scan_scanner = scanner.clone();
    let scan_clock = clock.clone();
    let scan_job = Job::new_async(config.scan_cron.as_str(), move |_uuid, _lock| {
        let scanner = scan_scanner.clone();
        let clock = scan_clock.clone();
        Box::pin(async move {
            if let Err(e) = run_due_scans(&scanner, clock.now()).await {
                tracing::error!("Periodic scan task failed: {}", e);
            }
        })
    })?;

    scheduler.add(scan_job).await?;

    let digest_store = scanner.store().clone();
    let recipients = config.digest_recipients.clone();
    let window = Duration::hours(config.digest_window_hours);
    let digest_job = Job::new_async(config.digest_cron.as_str(), move |_uuid, _lock| {
        let store = digest_store.clone();
        let notifier = notifier.clone();
        let clock = clock.clone();
        let recipients = recipients.clone();
        Box::pin(async move {
            tracing::info!("Collecting new postings");
            match collect_new_postings(store.as_ref(), clock.now(), window).await {
                Ok(digest) => {
                    send_digest(notifier.as_ref(), &recipients, &digest).await;
                }
                Err(e) => tracing::error!("Digest task failed: {}", e),
            }
        })
    })?;

    scheduler.add(digest_job).await?;
    scheduler.start().await?;

    tracing::info!(
        scan_cron = %config.scan_cron,
        digest_cron = %config.digest_cron,
        "Scheduled tasks started"
    );
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_hour_periods_only() {
        assert_eq!(parse_period_hours("12h"), Some(12));
        assert_eq!(parse_period_hours(" 24h "), Some(24));
        assert_eq!(parse_period_hours("7d"), None);
        assert_eq!(parse_period_hours("0h"), None);
        assert_eq!(parse_period_hours(""), None);
    }

    #[test]
    fn due_after_period_elapses() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut company = Company::new("c1", "Acme").with_period("12h");
        assert!(is_due(&company, now));

        company.last_scan_date = Some(now - Duration::hours(11));
        assert!(!is_due(&company, now));

        company.last_scan_date = Some(now - Duration::hours(12));
        assert!(is_due(&company, now));
    }

    #[test]
    fn companies_without_period_are_never_due() {
        let now = Utc::now();
        assert!(!is_due(&Company::new("c1", "Acme"), now));
        assert!(!is_due(&Company::new("c2", "Acme").with_period("weekly"), now));
    }
}
