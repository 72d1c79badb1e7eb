use std::fmt;

use super::Posting;

/// Which pass of a website scan is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// First load of the company's careers page. May detect hub links.
    Index,
    /// Re-scan of a hub link found during the index pass.
    Detail,
}

/// Terminal result of one sub-source scan.
///
/// `jobs` excludes postings already known to the caller. `removed` lists
/// known links that are absent from the fresh result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub jobs: Vec<Posting>,
    pub removed: Vec<String>,
}

impl ScanResult {
    pub fn new(jobs: Vec<Posting>, removed: Vec<String>) -> Self {
        Self { jobs, removed }
    }

    /// Soft-empty result: no new jobs and nothing removed.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Outcome of scanning one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// The page is a hub; re-scan these URLs as detail pages.
    Hubs(Vec<String>),
    Listing(ScanResult),
}

/// Lifecycle of a company scan, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    LoadingPrior,
    ScanningWebsite,
    ScanningLinkedin,
    Merging,
    Persisting,
    Done,
    Error,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::LoadingPrior => "loading_prior",
            ScanState::ScanningWebsite => "scanning_website",
            ScanState::ScanningLinkedin => "scanning_linkedin",
            ScanState::Merging => "merging",
            ScanState::Persisting => "persisting",
            ScanState::Done => "done",
            ScanState::Error => "error",
        };
        f.write_str(name)
    }
}
