//! Website source: one careers page, end to end.
//!
//! Load the page, look for hub links, work out which elements are job
//! titles, collect them with their links, and have the extractor turn the
//! unknown ones into postings.

use async_trait::async_trait;

use super::{CareersUrlResolver, PageRequest, WebsitePages};
use crate::classifier::{selector_for, StructureClassifier};
use crate::error::SourceResult;
use crate::extractor::{Extraction, LinkMode, PostingExtractor};
use crate::harvester::{Anchor, HarvestSession, Harvester};
use crate::links;
use crate::profiles::SiteProfiles;
use crate::types::{PageOutcome, Phase, ScanResult};

pub struct WebsiteSource {
    harvester: Harvester,
    classifier: StructureClassifier,
    extractor: PostingExtractor,
    profiles: SiteProfiles,
    careers: Option<CareersUrlResolver>,
}

impl WebsiteSource {
    pub fn new(
        harvester: Harvester,
        classifier: StructureClassifier,
        extractor: PostingExtractor,
    ) -> Self {
        Self {
            harvester,
            classifier,
            extractor,
            profiles: SiteProfiles::builtin(),
            careers: None,
        }
    }

    pub fn with_profiles(mut self, profiles: SiteProfiles) -> Self {
        self.profiles = profiles;
        self
    }

    /// Resolve company home pages to their careers page before index scans.
    pub fn with_careers_resolver(mut self, resolver: CareersUrlResolver) -> Self {
        self.careers = Some(resolver);
        self
    }

    async fn scan_session(
        &self,
        session: &mut HarvestSession,
        url: &str,
        known: &[String],
        phase: Phase,
    ) -> PageOutcome {
        let current = session.current_url().await;
        let profile = self.profiles.resolve(url, &current, phase);
        tracing::debug!(url, ?profile, "Scanning page");

        if profile.finds_hubs() {
            let hubs = session.find_hubs().await;
            if !hubs.is_empty() {
                return PageOutcome::Hubs(hubs);
            }
        }

        if let Some(selector) = profile.direct_titles() {
            let titles = session.direct_titles(selector).await;
            let removed = links::removed_links(known, titles.iter().map(|p| p.link.as_str()));
            let jobs = titles
                .into_iter()
                .filter(|p| !links::is_known(known, &p.link))
                .collect();
            return PageOutcome::Listing(ScanResult::new(jobs, removed));
        }

        let selector = match profile.fixed_selector() {
            Some(selector) => selector.to_string(),
            None => {
                let groups = session.survey(profile.expands()).await;
                let keys = self.classifier.classify(&groups).await;
                if keys.is_empty() {
                    tracing::info!(url, "No job title group found");
                    return PageOutcome::Listing(ScanResult::empty());
                }
                selector_for(&keys)
            }
        };

        let anchors = session.collect(&selector).await;
        let removed = links::removed_links(known, anchors.iter().map(|a| a.href.as_str()));
        let fresh: Vec<Anchor> = anchors
            .iter()
            .filter(|a| !links::is_known(known, &a.href))
            .cloned()
            .collect();
        tracing::info!(
            url,
            candidates = anchors.len(),
            fresh = fresh.len(),
            removed = removed.len(),
            "Collected candidates"
        );

        let mode = LinkMode::for_anchors(&anchors);
        match self.extractor.extract(&fresh, mode, url).await {
            Extraction::Postings(postings) => {
                let jobs = postings
                    .into_iter()
                    .filter(|p| !links::is_known(known, &p.link))
                    .collect();
                PageOutcome::Listing(ScanResult::new(jobs, removed))
            }
            Extraction::Unparseable => PageOutcome::Listing(ScanResult::empty()),
        }
    }
}

#[async_trait]
impl WebsitePages for WebsiteSource {
    async fn scan_page(&self, request: PageRequest) -> SourceResult<PageOutcome> {
        let url = match (&self.careers, request.phase) {
            (Some(resolver), Phase::Index) => resolver.resolve(&request.url).await,
            _ => request.url.clone(),
        };

        let mut session = self.harvester.open(&url).await?;
        let outcome = self
            .scan_session(&mut session, &url, &request.known, request.phase)
            .await;
        session.close().await;

        Ok(outcome)
    }
}
