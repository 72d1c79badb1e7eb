//! Company scans: load the roster, run the sources, merge, persist.
//!
//! Only store failures (and asking for a company that does not exist) fail
//! a scan. A source that errors out contributes nothing, and the other
//! source and the merge still go ahead.

use std::collections::HashSet;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ScanError};
use crate::links::canonical;
use crate::reconcile;
use crate::relevance::RelevanceClassifier;
use crate::sources::{LinkedInJobs, PageRequest, WebsitePages};
use crate::stores::RosterStore;
use crate::types::{Company, PageOutcome, Posting, ScanResult, ScanState, ScanType};

/// Updated roster entries returned by [`Scanner::scan_company`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScanReport {
    One(Company),
    All(Vec<Company>),
}

impl ScanReport {
    pub fn into_companies(self) -> Vec<Company> {
        match self {
            ScanReport::One(company) => vec![company],
            ScanReport::All(companies) => companies,
        }
    }
}

pub struct Scanner {
    store: Arc<dyn RosterStore>,
    website: Option<Arc<dyn WebsitePages>>,
    linkedin: Option<Arc<dyn LinkedInJobs>>,
    relevance: Option<Arc<dyn RelevanceClassifier>>,
    clock: Arc<dyn Clock>,
}

impl Scanner {
    pub fn new(store: Arc<dyn RosterStore>) -> Self {
        Self {
            store,
            website: None,
            linkedin: None,
            relevance: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_website(mut self, source: Arc<dyn WebsitePages>) -> Self {
        self.website = Some(source);
        self
    }

    pub fn with_linkedin(mut self, source: Arc<dyn LinkedInJobs>) -> Self {
        self.linkedin = Some(source);
        self
    }

    /// Annotate new postings with a verdict instead of their scraped detail.
    pub fn with_relevance(mut self, classifier: Arc<dyn RelevanceClassifier>) -> Self {
        self.relevance = Some(classifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn RosterStore> {
        &self.store
    }

    /// Scan one company, or every company of the account when `company_id`
    /// is `None`, and persist the updated roster.
    ///
    /// Callers must not run two scans of the same company at once: the
    /// roster is read-modify-written as a whole.
    pub async fn scan_company(
        &self,
        account_id: &str,
        company_id: Option<&str>,
        scan_types: &[ScanType],
    ) -> Result<ScanReport> {
        let scope = company_id.unwrap_or("*");
        transition(scope, ScanState::Idle);
        transition(scope, ScanState::LoadingPrior);

        let mut roster = match self.store.get_roster(account_id).await {
            Ok(roster) => roster,
            Err(e) => {
                transition(scope, ScanState::Error);
                return Err(e.into());
            }
        };

        let report = match company_id {
            Some(id) => {
                let Some(idx) = roster.iter().position(|c| c.id == id) else {
                    transition(scope, ScanState::Error);
                    return Err(ScanError::CompanyNotFound {
                        company_id: id.to_string(),
                    });
                };
                self.scan_one(&mut roster[idx], scan_types).await;
                self.persist(account_id, scope, &roster).await?;
                ScanReport::One(roster[idx].clone())
            }
            None => {
                for company in roster.iter_mut() {
                    self.scan_one(company, scan_types).await;
                }
                self.persist(account_id, scope, &roster).await?;
                ScanReport::All(roster)
            }
        };

        transition(scope, ScanState::Done);
        Ok(report)
    }

    /// Clear jobs for one company (or all), optionally only those of one
    /// source. `last_scan_date` is cleared only when no jobs remain.
    pub async fn delete_records(
        &self,
        account_id: &str,
        company_id: Option<&str>,
        source: Option<ScanType>,
    ) -> Result<()> {
        let mut roster = self.store.get_roster(account_id).await?;

        if let Some(id) = company_id {
            if !roster.iter().any(|c| c.id == id) {
                return Err(ScanError::CompanyNotFound {
                    company_id: id.to_string(),
                });
            }
        }

        for company in roster
            .iter_mut()
            .filter(|c| company_id.map_or(true, |id| c.id == id))
        {
            let before = company.jobs.len();
            match source {
                Some(source) => company.jobs.retain(|job| job.source() != source),
                None => company.jobs.clear(),
            }
            if company.jobs.is_empty() {
                company.last_scan_date = None;
            }
            tracing::info!(
                company_id = %company.id,
                source = ?source,
                deleted = before - company.jobs.len(),
                "Deleted job records"
            );
        }

        self.store.put_roster(account_id, &roster).await?;
        Ok(())
    }

    async fn scan_one(&self, company: &mut Company, scan_types: &[ScanType]) {
        let mut scanned: Vec<ScanType> = Vec::new();
        let mut fresh: Vec<Posting> = Vec::new();
        let mut removed: Vec<String> = Vec::new();

        if scan_types.contains(&ScanType::Website) {
            transition(&company.id, ScanState::ScanningWebsite);
            match (company.source_url(ScanType::Website), &self.website) {
                (Some(url), Some(source)) => {
                    let known = company.known_links(ScanType::Website);
                    let result = self.scan_website(source.as_ref(), url, known).await;
                    scanned.push(ScanType::Website);
                    fresh.extend(result.jobs);
                    removed.extend(result.removed);
                }
                (None, _) => tracing::debug!(company_id = %company.id, "No website configured"),
                (Some(_), None) => {
                    tracing::warn!(company_id = %company.id, "Website scanning is not enabled")
                }
            }
        }

        if scan_types.contains(&ScanType::Linkedin) {
            transition(&company.id, ScanState::ScanningLinkedin);
            match (company.source_url(ScanType::Linkedin), &self.linkedin) {
                (Some(url), Some(source)) => {
                    let known = company.known_links(ScanType::Linkedin);
                    let result = match source.scan(url, &known).await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::warn!(company_id = %company.id, error = %e, "LinkedIn scan failed");
                            ScanResult::empty()
                        }
                    };
                    scanned.push(ScanType::Linkedin);
                    fresh.extend(result.jobs);
                    removed.extend(result.removed);
                }
                (None, _) => tracing::debug!(company_id = %company.id, "No LinkedIn page configured"),
                (Some(_), None) => {
                    tracing::warn!(company_id = %company.id, "LinkedIn scanning is not enabled")
                }
            }
        }

        transition(&company.id, ScanState::Merging);
        let plan = reconcile::plan(&company.jobs, &scanned, &removed, fresh);

        let mut described = Vec::with_capacity(plan.additions.len());
        for posting in &plan.additions {
            described.push(self.describe(posting).await);
        }

        let now = self.clock.now();
        let minted = plan
            .additions
            .iter()
            .cloned()
            .zip(described)
            .map(|(posting, description)| reconcile::mint(posting, description, now))
            .collect();

        tracing::info!(
            company_id = %company.id,
            added = plan.additions.len(),
            removed = plan.removed.len(),
            kept = plan.kept.len(),
            "Merged scan results"
        );

        company.jobs = plan.finish(minted);
        company.last_scan_date = Some(now);
    }

    /// Index page first; if it turns out to be a hub, every hub page is
    /// scanned as a detail page. A known link counts as removed only when
    /// every hub page agrees.
    async fn scan_website(
        &self,
        source: &dyn WebsitePages,
        url: &str,
        known: Vec<String>,
    ) -> ScanResult {
        let hubs = match source.scan_page(PageRequest::index(url, known.clone())).await {
            Ok(PageOutcome::Listing(result)) => return result,
            Ok(PageOutcome::Hubs(hubs)) => hubs,
            Err(e) => {
                tracing::warn!(url, error = %e, "Website scan failed");
                return ScanResult::empty();
            }
        };

        tracing::info!(url, hubs = hubs.len(), "Scanning hub pages");
        let mut jobs: Vec<Posting> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut removed: Option<Vec<String>> = None;

        for hub in hubs {
            let result = match source
                .scan_page(PageRequest::detail(hub.as_str(), known.clone()))
                .await
            {
                Ok(PageOutcome::Listing(result)) => result,
                Ok(PageOutcome::Hubs(_)) => {
                    tracing::debug!(hub = %hub, "Hub page links to more hubs, ignoring");
                    ScanResult::empty()
                }
                Err(e) => {
                    tracing::warn!(hub = %hub, error = %e, "Hub page scan failed");
                    ScanResult::empty()
                }
            };

            for job in result.jobs {
                if job.has_link() && seen.insert(canonical(&job.link)) {
                    jobs.push(job);
                }
            }

            removed = Some(match removed {
                None => result.removed,
                Some(prev) => prev
                    .into_iter()
                    .filter(|link| result.removed.contains(link))
                    .collect(),
            });
        }

        ScanResult::new(jobs, removed.unwrap_or_default())
    }

    /// Description for a new posting: the classifier's verdict when one is
    /// configured (empty if the call fails), the scraped detail otherwise.
    async fn describe(&self, posting: &Posting) -> String {
        match &self.relevance {
            Some(classifier) => match classifier.classify(posting).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    tracing::warn!(link = %posting.link, error = %e, "Relevance classification failed");
                    String::new()
                }
            },
            None => posting.detail.clone().unwrap_or_default(),
        }
    }

    async fn persist(&self, account_id: &str, scope: &str, roster: &[Company]) -> Result<()> {
        transition(scope, ScanState::Persisting);
        if let Err(e) = self.store.put_roster(account_id, roster).await {
            transition(scope, ScanState::Error);
            return Err(e.into());
        }
        Ok(())
    }
}

fn transition(company_id: &str, state: ScanState) {
    tracing::debug!(company_id, state = %state, "Scan state");
}
