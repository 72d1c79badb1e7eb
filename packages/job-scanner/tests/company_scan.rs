//! Integration tests for company scans: sources, merge, and persistence.
//!
//! Sources are scripted so each test controls exactly what a scan finds;
//! one test drives the real website source end to end to check that two
//! back-to-back scans leave the roster untouched.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use job_scanner::browser::Candidate;
use job_scanner::links::{canonical, element_link};
use job_scanner::testing::{
    FakeBrowser, FakePage, FakeSite, FixedClock, FlakyStore, MockAI, MockRelevance,
    ScriptedLinkedIn, ScriptedWebsite,
};
use job_scanner::{
    Company, HarvestConfig, Harvester, MemoryStore, Phase, Posting, PostingExtractor,
    ScanError, ScanReport, ScanResult, ScanType, Scanner, StructureClassifier,
    TrackedJob, WebsiteSource,
};

const ACCOUNT: &str = "account-1";
const SITE: &str = "https://a.com/careers";
const LINKEDIN: &str = "https://www.linkedin.com/company/acme";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn earlier() -> DateTime<Utc> {
    now() - Duration::days(3)
}

fn tracked(id: &str, link: &str) -> TrackedJob {
    TrackedJob {
        id: id.to_string(),
        title: format!("Job {id}"),
        description: String::new(),
        link: link.to_string(),
        found: earlier(),
    }
}

fn acme(jobs: Vec<TrackedJob>) -> Company {
    Company::new("acme", "Acme")
        .with_website(SITE)
        .with_linkedin(LINKEDIN)
        .with_jobs(jobs)
}

fn store_with(companies: Vec<Company>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new().with_roster(ACCOUNT, companies))
}

fn scanner(store: Arc<MemoryStore>) -> Scanner {
    Scanner::new(store).with_clock(Arc::new(FixedClock::new(now())))
}

fn one(report: ScanReport) -> Company {
    match report {
        ScanReport::One(company) => company,
        ScanReport::All(companies) => panic!("expected one company, got {}", companies.len()),
    }
}

#[tokio::test]
async fn test_existing_job_keeps_identity_and_new_job_is_minted() {
    let store = store_with(vec![acme(vec![tracked("j1", "https://a.com/job/1")])]);
    let website = ScriptedWebsite::new().with_listing(
        SITE,
        ScanResult::new(
            vec![
                Posting::new("Job 1", "https://a.com/job/1"),
                Posting::new("Job 2", "https://a.com/job/2"),
            ],
            Vec::new(),
        ),
    );

    let company = one(
        scanner(store.clone())
            .with_website(Arc::new(website))
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Website])
            .await
            .unwrap(),
    );

    assert_eq!(company.jobs.len(), 2);
    assert_eq!(company.jobs[0], tracked("j1", "https://a.com/job/1"));
    assert_ne!(company.jobs[1].id, "j1");
    assert_eq!(company.jobs[1].link, "https://a.com/job/2");
    assert_eq!(company.jobs[1].found, now());
    assert_eq!(company.last_scan_date, Some(now()));
    assert_eq!(store.roster(ACCOUNT)[0], company);
}

#[tokio::test]
async fn test_removed_job_leaves_an_empty_roster() {
    let store = store_with(vec![acme(vec![tracked("j1", "https://a.com/job/1")])]);
    let website = ScriptedWebsite::new().with_listing(
        SITE,
        ScanResult::new(Vec::new(), vec!["https://a.com/job/1".to_string()]),
    );

    let company = one(
        scanner(store)
            .with_website(Arc::new(website))
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Website])
            .await
            .unwrap(),
    );

    assert!(company.jobs.is_empty());
    assert_eq!(company.last_scan_date, Some(now()));
}

#[tokio::test]
async fn test_website_only_scan_leaves_linkedin_jobs_alone() {
    let linkedin_job = tracked("li", "https://www.linkedin.com/jobs/view/42");
    let store = store_with(vec![acme(vec![
        tracked("w1", "https://a.com/job/1"),
        linkedin_job.clone(),
    ])]);
    // Even a removal list naming the LinkedIn job must not touch it.
    let website = ScriptedWebsite::new().with_listing(
        SITE,
        ScanResult::new(
            Vec::new(),
            vec![
                "https://a.com/job/1".to_string(),
                linkedin_job.link.clone(),
            ],
        ),
    );
    let linkedin = Arc::new(ScriptedLinkedIn::returning(ScanResult::empty()));

    let company = one(
        scanner(store)
            .with_website(Arc::new(website))
            .with_linkedin(linkedin.clone())
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Website])
            .await
            .unwrap(),
    );

    assert_eq!(company.jobs, vec![linkedin_job]);
    assert!(linkedin.calls().is_empty());
}

#[tokio::test]
async fn test_linkedin_failure_still_merges_website_postings() {
    let store = store_with(vec![acme(vec![tracked(
        "li",
        "https://www.linkedin.com/jobs/view/42",
    )])]);
    let website = ScriptedWebsite::new().with_listing(
        SITE,
        ScanResult::new(vec![Posting::new("Dev", "https://a.com/job/9")], Vec::new()),
    );

    let company = one(
        scanner(store.clone())
            .with_website(Arc::new(website))
            .with_linkedin(Arc::new(ScriptedLinkedIn::failing()))
            .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
            .await
            .unwrap(),
    );

    let links: Vec<&str> = company.jobs.iter().map(|j| j.link.as_str()).collect();
    assert_eq!(
        links,
        vec!["https://www.linkedin.com/jobs/view/42", "https://a.com/job/9"]
    );
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_website_failure_still_merges_linkedin_postings() {
    let store = store_with(vec![acme(vec![tracked("w1", "https://a.com/job/1")])]);
    let linkedin = Arc::new(ScriptedLinkedIn::returning(ScanResult::new(
        vec![Posting::new("QA", "https://www.linkedin.com/jobs/view/7").with_company("Acme")],
        Vec::new(),
    )));

    let company = one(
        scanner(store)
            .with_website(Arc::new(ScriptedWebsite::new().failing(SITE)))
            .with_linkedin(linkedin.clone())
            .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
            .await
            .unwrap(),
    );

    assert_eq!(company.jobs.len(), 2);
    assert_eq!(company.jobs[0].id, "w1");
    assert_eq!(
        linkedin.calls(),
        vec![(LINKEDIN.to_string(), Vec::<String>::new())]
    );
}

#[tokio::test]
async fn test_hub_pages_are_merged_and_removal_needs_every_hub() {
    let store = store_with(vec![acme(vec![
        tracked("x", "https://a.com/job/x"),
        tracked("y", "https://a.com/job/y"),
    ])]);
    let website = Arc::new(
        ScriptedWebsite::new()
            .with_hubs(
                SITE,
                vec![
                    "https://a.com/teams/eng".to_string(),
                    "https://a.com/teams/ops".to_string(),
                ],
            )
            .with_listing(
                "https://a.com/teams/eng",
                ScanResult::new(
                    vec![
                        Posting::new("A", "https://a.com/job/a"),
                        Posting::new("B", "https://a.com/job/b"),
                    ],
                    vec![
                        "https://a.com/job/x".to_string(),
                        "https://a.com/job/y".to_string(),
                    ],
                ),
            )
            .with_listing(
                "https://a.com/teams/ops",
                ScanResult::new(
                    vec![
                        Posting::new("B again", "https://a.com/job/b/"),
                        Posting::new("C", "https://a.com/job/c"),
                    ],
                    vec!["https://a.com/job/y".to_string()],
                ),
            ),
    );

    let company = one(
        scanner(store)
            .with_website(website.clone())
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Website])
            .await
            .unwrap(),
    );

    let links: Vec<&str> = company.jobs.iter().map(|j| j.link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://a.com/job/x",
            "https://a.com/job/a",
            "https://a.com/job/b",
            "https://a.com/job/c",
        ]
    );

    let phases: Vec<Phase> = website.requests().iter().map(|r| r.phase).collect();
    assert_eq!(phases, vec![Phase::Index, Phase::Detail, Phase::Detail]);
}

#[tokio::test]
async fn test_failed_hub_page_blocks_removal() {
    let store = store_with(vec![acme(vec![tracked("x", "https://a.com/job/x")])]);
    let website = ScriptedWebsite::new()
        .with_hubs(
            SITE,
            vec![
                "https://a.com/teams/eng".to_string(),
                "https://a.com/teams/down".to_string(),
            ],
        )
        .with_listing(
            "https://a.com/teams/eng",
            ScanResult::new(Vec::new(), vec!["https://a.com/job/x".to_string()]),
        )
        .failing("https://a.com/teams/down");

    let company = one(
        scanner(store)
            .with_website(Arc::new(website))
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Website])
            .await
            .unwrap(),
    );

    assert_eq!(company.jobs.len(), 1);
}

#[tokio::test]
async fn test_description_without_classifier_is_scraped_detail() {
    let store = store_with(vec![acme(Vec::new())]);
    let linkedin = ScriptedLinkedIn::returning(ScanResult::new(
        vec![Posting::new("Dev", "https://www.linkedin.com/jobs/view/1")
            .with_detail("Build the platform")],
        Vec::new(),
    ));

    let company = one(
        scanner(store)
            .with_linkedin(Arc::new(linkedin))
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Linkedin])
            .await
            .unwrap(),
    );

    assert_eq!(company.jobs[0].description, "Build the platform");
}

#[tokio::test]
async fn test_description_is_verdict_or_empty_when_classifier_configured() {
    let linkedin = || {
        Arc::new(ScriptedLinkedIn::returning(ScanResult::new(
            vec![Posting::new("Dev", "https://www.linkedin.com/jobs/view/1")
                .with_detail("Build the platform")],
            Vec::new(),
        )))
    };

    let relevance = Arc::new(MockRelevance::verdict("Backend role"));
    let company = one(
        scanner(store_with(vec![acme(Vec::new())]))
            .with_linkedin(linkedin())
            .with_relevance(relevance.clone())
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Linkedin])
            .await
            .unwrap(),
    );
    assert_eq!(company.jobs[0].description, "Backend role");
    assert_eq!(relevance.classified()[0].title, "Dev");

    let company = one(
        scanner(store_with(vec![acme(Vec::new())]))
            .with_linkedin(linkedin())
            .with_relevance(Arc::new(MockRelevance::failing()))
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Linkedin])
            .await
            .unwrap(),
    );
    assert_eq!(company.jobs.len(), 1);
    assert_eq!(company.jobs[0].description, "");
}

#[tokio::test]
async fn test_postings_without_links_and_duplicates_are_dropped() {
    let store = store_with(vec![acme(vec![
        tracked("j1", "https://a.com/job/1"),
        tracked("dup", "https://a.com/job/1/"),
    ])]);
    let website = ScriptedWebsite::new().with_listing(
        SITE,
        ScanResult::new(
            vec![
                Posting::new("No link", "  "),
                Posting::new("Two", "https://a.com/job/2"),
                Posting::new("Two again", "https://a.com/job/2#apply"),
            ],
            Vec::new(),
        ),
    );

    let company = one(
        scanner(store)
            .with_website(Arc::new(website))
            .scan_company(ACCOUNT, Some("acme"), &[ScanType::Website])
            .await
            .unwrap(),
    );

    let keys: Vec<String> = company.jobs.iter().map(|j| canonical(&j.link)).collect();
    let unique: HashSet<&String> = keys.iter().collect();
    assert_eq!(keys.len(), unique.len());
    assert_eq!(
        keys,
        vec!["https://a.com/job/1".to_string(), "https://a.com/job/2".to_string()]
    );
}

#[tokio::test]
async fn test_scan_all_updates_every_company() {
    let store = store_with(vec![
        acme(Vec::new()),
        Company::new("beta", "Beta").with_website("https://b.com/jobs"),
        Company::new("gamma", "Gamma"),
    ]);
    let website = ScriptedWebsite::new()
        .with_listing(
            SITE,
            ScanResult::new(vec![Posting::new("A", "https://a.com/job/1")], Vec::new()),
        )
        .with_listing(
            "https://b.com/jobs",
            ScanResult::new(vec![Posting::new("B", "https://b.com/jobs/1")], Vec::new()),
        );

    let report = scanner(store.clone())
        .with_website(Arc::new(website))
        .scan_company(ACCOUNT, None, &[ScanType::Website])
        .await
        .unwrap();

    let companies = report.into_companies();
    assert_eq!(companies.len(), 3);
    assert_eq!(companies[0].jobs.len(), 1);
    assert_eq!(companies[1].jobs.len(), 1);
    assert!(companies[2].jobs.is_empty());
    assert!(companies.iter().all(|c| c.last_scan_date == Some(now())));
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_unknown_company_is_an_error() {
    let store = store_with(vec![acme(Vec::new())]);

    let result = scanner(store.clone())
        .scan_company(ACCOUNT, Some("missing"), &ScanType::ALL)
        .await;

    assert!(matches!(
        result,
        Err(ScanError::CompanyNotFound { company_id }) if company_id == "missing"
    ));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_store_failures_abort_the_scan() {
    let read_failure = Scanner::new(Arc::new(
        FlakyStore::new(MemoryStore::new().with_roster(ACCOUNT, vec![acme(Vec::new())]))
            .failing_reads(),
    ));
    assert!(matches!(
        read_failure
            .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
            .await,
        Err(ScanError::Store(_))
    ));

    let write_failure = Scanner::new(Arc::new(
        FlakyStore::new(MemoryStore::new().with_roster(ACCOUNT, vec![acme(Vec::new())]))
            .failing_writes(),
    ));
    assert!(matches!(
        write_failure
            .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
            .await,
        Err(ScanError::Store(_))
    ));
}

#[tokio::test]
async fn test_unknown_roster_fields_survive_a_scan() {
    let mut company = acme(Vec::new());
    company
        .extra
        .insert("owner".to_string(), serde_json::json!("sales-team"));
    let store = store_with(vec![company]);

    scanner(store.clone())
        .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
        .await
        .unwrap();

    assert_eq!(
        store.roster(ACCOUNT)[0].extra["owner"],
        serde_json::json!("sales-team")
    );
}

#[tokio::test]
async fn test_delete_records_by_source() {
    let store = store_with(vec![Company {
        last_scan_date: Some(earlier()),
        ..acme(vec![
            tracked("w1", "https://a.com/job/1"),
            tracked("li", "https://www.linkedin.com/jobs/view/42"),
        ])
    }]);
    let scanner = scanner(store.clone());

    scanner
        .delete_records(ACCOUNT, Some("acme"), Some(ScanType::Linkedin))
        .await
        .unwrap();
    let company = &store.roster(ACCOUNT)[0];
    assert_eq!(company.jobs.len(), 1);
    assert_eq!(company.jobs[0].id, "w1");
    assert_eq!(company.last_scan_date, Some(earlier()));

    scanner
        .delete_records(ACCOUNT, Some("acme"), Some(ScanType::Website))
        .await
        .unwrap();
    let company = &store.roster(ACCOUNT)[0];
    assert!(company.jobs.is_empty());
    assert_eq!(company.last_scan_date, None);
}

#[tokio::test]
async fn test_delete_all_records_for_account() {
    let store = store_with(vec![
        acme(vec![tracked("w1", "https://a.com/job/1")]),
        Company::new("beta", "Beta").with_jobs(vec![tracked("b1", "https://b.com/1")]),
    ]);

    scanner(store.clone())
        .delete_records(ACCOUNT, None, None)
        .await
        .unwrap();

    assert!(store.roster(ACCOUNT).iter().all(|c| c.jobs.is_empty()));
}

#[tokio::test]
async fn test_delete_records_for_unknown_company_fails() {
    let store = store_with(vec![acme(Vec::new())]);

    let result = scanner(store.clone())
        .delete_records(ACCOUNT, Some("missing"), None)
        .await;

    assert!(matches!(result, Err(ScanError::CompanyNotFound { .. })));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_rescanning_an_unchanged_site_changes_nothing() {
    let site = Arc::new(
        FakeSite::new().with_page(
            SITE,
            FakePage::new()
                .with_group("li.opening > a", &["Dev", "Ops"])
                .with_candidates(
                    "li.opening > a",
                    vec![
                        Candidate::new("Dev").with_href("https://a.com/job/dev"),
                        Candidate::new("Ops").with_href("https://a.com/job/ops"),
                    ],
                ),
        ),
    );
    let ai = Arc::new(
        MockAI::new()
            .with_response("mostly like job titles", r#"["li.opening > a"]"#)
            .with_response(
                "Extract all job postings",
                r#"[{"title":"Dev","company":"","link":"https://a.com/job/dev"},
                    {"title":"Ops","company":"","link":"https://a.com/job/ops"}]"#,
            ),
    );
    let website = Arc::new(WebsiteSource::new(
        Harvester::new(Arc::new(FakeBrowser::new(site)), HarvestConfig::instant()),
        StructureClassifier::new(ai.clone(), "gpt-4"),
        PostingExtractor::new(ai.clone(), "gpt-4o"),
    ));
    let store = store_with(vec![Company::new("acme", "Acme").with_website(SITE)]);
    let clock = Arc::new(FixedClock::new(now()));
    let scanner = Scanner::new(store.clone())
        .with_website(website)
        .with_clock(clock.clone());

    let first = one(
        scanner
            .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
            .await
            .unwrap(),
    );
    assert_eq!(first.jobs.len(), 2);

    clock.advance(Duration::hours(12));
    let second = one(
        scanner
            .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
            .await
            .unwrap(),
    );

    assert_eq!(second.jobs, first.jobs);
    assert_eq!(second.last_scan_date, Some(now() + Duration::hours(12)));
    // The second pass found nothing fresh, so only the classifier ran.
    assert_eq!(ai.call_count(), 3);
    assert_eq!(store.roster(ACCOUNT).len(), 1);
}

#[tokio::test]
async fn test_titles_without_links_survive_repeated_scans() {
    let site = Arc::new(
        FakeSite::new().with_page(
            SITE,
            FakePage::new()
                .with_group("div.role > h3", &["Backend Engineer", "QA Engineer"])
                .with_candidates(
                    "div.role > h3",
                    vec![Candidate::new("Backend Engineer"), Candidate::new("QA Engineer")],
                ),
        ),
    );
    let backend = element_link(SITE, "Backend Engineer", 0);
    let qa = element_link(SITE, "QA Engineer", 1);
    let ai = Arc::new(
        MockAI::new()
            .with_response("mostly like job titles", r#"["div.role > h3"]"#)
            .with_response(
                "Extract all job postings",
                &format!(
                    r#"[{{"title":"Backend Engineer","company":"","link":"{backend}"}},
                        {{"title":"QA Engineer","company":"","link":"{qa}"}}]"#
                ),
            ),
    );
    let website = Arc::new(WebsiteSource::new(
        Harvester::new(Arc::new(FakeBrowser::new(site)), HarvestConfig::instant()),
        StructureClassifier::new(ai.clone(), "gpt-4"),
        PostingExtractor::new(ai.clone(), "gpt-4o"),
    ));
    let store = store_with(vec![Company::new("acme", "Acme").with_website(SITE)]);
    let clock = Arc::new(FixedClock::new(now()));
    let scanner = Scanner::new(store.clone())
        .with_website(website)
        .with_clock(clock.clone());

    let first = one(
        scanner
            .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
            .await
            .unwrap(),
    );
    let links: Vec<&str> = first.jobs.iter().map(|j| j.link.as_str()).collect();
    assert_eq!(links, vec![backend.as_str(), qa.as_str()]);

    for _ in 0..2 {
        clock.advance(Duration::hours(12));
        let again = one(
            scanner
                .scan_company(ACCOUNT, Some("acme"), &ScanType::ALL)
                .await
                .unwrap(),
        );
        assert_eq!(again.jobs, first.jobs);
    }
    // Only the first scan needed an extraction call.
    assert_eq!(ai.call_count(), 4);
}
