//! Sub-sources a company scan draws from.
//!
//! The orchestrator only sees the two traits below, so each source can be
//! replaced by a scripted fake in tests.

pub mod careers;
pub mod linkedin;
pub mod website;

pub use careers::{CareersUrlResolver, SerpApiSearch, WebSearch};
pub use linkedin::{LinkedInSource, SnapshotApi};
pub use website::WebsiteSource;

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::types::{PageOutcome, Phase, ScanResult};

/// One page of a website scan.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub url: String,
    /// Links already in the roster for this source.
    pub known: Vec<String>,
    pub phase: Phase,
}

impl PageRequest {
    pub fn index(url: impl Into<String>, known: Vec<String>) -> Self {
        Self {
            url: url.into(),
            known,
            phase: Phase::Index,
        }
    }

    pub fn detail(url: impl Into<String>, known: Vec<String>) -> Self {
        Self {
            url: url.into(),
            known,
            phase: Phase::Detail,
        }
    }
}

/// Scans a single careers page.
///
/// An error means the page could not be loaded at all. Anything that goes
/// wrong after that is reported as an empty listing.
#[async_trait]
pub trait WebsitePages: Send + Sync {
    async fn scan_page(&self, request: PageRequest) -> SourceResult<PageOutcome>;
}

/// Scans a company's LinkedIn job listings.
#[async_trait]
pub trait LinkedInJobs: Send + Sync {
    async fn scan(&self, linkedin_url: &str, known: &[String]) -> SourceResult<ScanResult>;
}
