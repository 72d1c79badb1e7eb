//! Integration tests for periodic scans and new-posting digests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use job_scanner::notify::{render_digest, send_digest};
use job_scanner::schedule::{collect_new_postings, run_due_scans};
use job_scanner::testing::{FixedClock, RecordingNotifier, ScriptedWebsite};
use job_scanner::{Company, MemoryStore, Posting, ScanResult, Scanner, TrackedJob};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn job(id: &str, link: &str, found: DateTime<Utc>) -> TrackedJob {
    TrackedJob {
        id: id.to_string(),
        title: format!("Role {id}"),
        description: String::new(),
        link: link.to_string(),
        found,
    }
}

#[tokio::test]
async fn test_only_due_companies_are_scanned() {
    let store = Arc::new(
        MemoryStore::new()
            .with_roster(
                "account-1",
                vec![
                    // Never scanned
                    Company::new("new", "New Co")
                        .with_website("https://new.io/jobs")
                        .with_period("12h"),
                    // Scanned 2 hours ago on a 12h period
                    Company {
                        last_scan_date: Some(now() - Duration::hours(2)),
                        ..Company::new("fresh", "Fresh Co")
                            .with_website("https://fresh.io/jobs")
                            .with_period("12h")
                    },
                    // No period, never scheduled
                    Company::new("manual", "Manual Co").with_website("https://manual.io/jobs"),
                ],
            )
            .with_roster(
                "account-2",
                vec![Company {
                    last_scan_date: Some(now() - Duration::hours(30)),
                    ..Company::new("stale", "Stale Co")
                        .with_website("https://stale.io/jobs")
                        .with_period("24h")
                }],
            ),
    );
    let website = Arc::new(
        ScriptedWebsite::new()
            .with_listing(
                "https://new.io/jobs",
                ScanResult::new(vec![Posting::new("Dev", "https://new.io/jobs/1")], Vec::new()),
            )
            .with_listing("https://stale.io/jobs", ScanResult::empty()),
    );
    let scanner = Scanner::new(store.clone())
        .with_website(website.clone())
        .with_clock(Arc::new(FixedClock::new(now())));

    let scanned = run_due_scans(&scanner, now()).await.unwrap();

    assert_eq!(scanned, 2);
    let urls: Vec<String> = website.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(urls, vec!["https://new.io/jobs", "https://stale.io/jobs"]);

    let roster = store.roster("account-1");
    assert_eq!(roster[0].last_scan_date, Some(now()));
    assert_eq!(roster[0].jobs.len(), 1);
    assert_eq!(roster[1].last_scan_date, Some(now() - Duration::hours(2)));
    assert_eq!(roster[2].last_scan_date, None);
    assert_eq!(store.roster("account-2")[0].last_scan_date, Some(now()));
}

#[tokio::test]
async fn test_digest_covers_recent_jobs_split_by_source() {
    let store = MemoryStore::new()
        .with_roster(
            "account-1",
            vec![
                Company::new("acme", "Acme").with_jobs(vec![
                    job("w1", "https://acme.io/jobs/1", now() - Duration::hours(1)),
                    job("li", "https://www.linkedin.com/jobs/view/5", now() - Duration::hours(2)),
                    job("old", "https://acme.io/jobs/old", now() - Duration::hours(10)),
                ]),
                Company::new("quiet", "Quiet").with_jobs(vec![job(
                    "q1",
                    "https://quiet.io/1",
                    now() - Duration::days(5),
                )]),
            ],
        )
        .with_roster(
            "account-2",
            vec![Company::new("beta", "Beta").with_jobs(vec![job(
                "b1",
                "https://beta.io/1",
                now() - Duration::minutes(5),
            )])],
        );

    let digest = collect_new_postings(&store, now(), Duration::hours(3))
        .await
        .unwrap();

    assert_eq!(digest.total(), 3);
    let names: Vec<&str> = digest.companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Acme", "Beta"]);
    assert_eq!(digest.companies[0].website_jobs[0].id, "w1");
    assert_eq!(digest.companies[0].linkedin_jobs[0].id, "li");

    let html = render_digest(&digest);
    assert!(html.contains("Acme - 2 new positions"));
    assert!(html.contains("Beta - 1 new position<"));
    assert!(!html.contains("Quiet"));
}

#[tokio::test]
async fn test_digest_is_delivered_to_recipients() {
    let store = MemoryStore::new().with_roster(
        "account-1",
        vec![Company::new("acme", "Acme").with_jobs(vec![job(
            "w1",
            "https://acme.io/jobs/1",
            now() - Duration::minutes(30),
        )])],
    );
    let notifier = RecordingNotifier::new();
    let recipients = vec!["ops@example.com".to_string(), "sales@example.com".to_string()];

    let digest = collect_new_postings(&store, now(), Duration::hours(3))
        .await
        .unwrap();
    assert!(send_digest(&notifier, &recipients, &digest).await);

    let deliveries = notifier.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].recipients, recipients);
    assert_eq!(deliveries[0].subject, "New position found for monitored customers");
    assert!(deliveries[0].html.contains("https://acme.io/jobs/1"));
}

#[tokio::test]
async fn test_quiet_window_sends_nothing() {
    let store = MemoryStore::new().with_roster(
        "account-1",
        vec![Company::new("acme", "Acme").with_jobs(vec![job(
            "w1",
            "https://acme.io/jobs/1",
            now() - Duration::days(1),
        )])],
    );
    let notifier = RecordingNotifier::new();

    let digest = collect_new_postings(&store, now(), Duration::hours(3))
        .await
        .unwrap();

    assert!(digest.is_empty());
    assert!(!send_digest(&notifier, &["ops@example.com".to_string()], &digest).await);
    assert!(notifier.deliveries().is_empty());
}
