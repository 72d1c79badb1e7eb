//! Testing utilities including mock implementations.
//!
//! These let the scan engine run end to end without a browser, an LLM, the
//! dataset API, a database, or real sleeps.

use async_trait::async_trait;
use brightdata_client::{BrightDataError, CompanyProfileRecord, JobListingRecord, SnapshotStatus};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::ai::{BaseAI, CompletionRequest};
use crate::browser::{
    BrowserDriver, Candidate, Control, ElementPath, FrameInfo, Page, ProbeLevel, Scope, TextGroup,
};
use crate::clock::{Clock, Sleeper};
use crate::error::{AiError, AiResult, BrowserError, BrowserResult, NotifyError, SourceError, SourceResult, StoreError, StoreResult};
use crate::notify::Notifier;
use crate::relevance::RelevanceClassifier;
use crate::sources::careers::{SearchHit, WebSearch};
use crate::sources::{LinkedInJobs, PageRequest, SnapshotApi, WebsitePages};
use crate::stores::{MemoryStore, RosterStore};
use crate::types::{Company, PageOutcome, Posting, ScanResult};

// ============================================================================
// AI
// ============================================================================

/// A mock LLM.
///
/// Responses are picked by the first registered substring found in the
/// prompt, falling back to the default response.
#[derive(Default)]
pub struct MockAI {
    responses: Arc<RwLock<Vec<(String, String)>>>,
    default_response: Arc<RwLock<Option<String>>>,
    failure: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl MockAI {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `needle` with `response`.
    pub fn with_response(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .push((needle.into(), response.into()));
        self
    }

    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.default_response.write().unwrap() = Some(response.into());
        self
    }

    /// Fail every call.
    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.failure.write().unwrap() = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, request: &CompletionRequest) -> AiResult<String> {
        self.calls.write().unwrap().push(request.clone());

        if let Some(message) = self.failure.read().unwrap().clone() {
            return Err(AiError::Api {
                status: 500,
                message,
            });
        }

        let scripted = self
            .responses
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone());

        match scripted.or_else(|| self.default_response.read().unwrap().clone()) {
            Some(response) => Ok(response),
            None => Err(AiError::EmptyResponse),
        }
    }
}

/// Relevance classifier with a fixed verdict, or failing every call.
pub struct MockRelevance {
    verdict: Option<String>,
    calls: RwLock<Vec<Posting>>,
}

impl MockRelevance {
    pub fn verdict(verdict: impl Into<String>) -> Self {
        Self {
            verdict: Some(verdict.into()),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            verdict: None,
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn classified(&self) -> Vec<Posting> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl RelevanceClassifier for MockRelevance {
    async fn classify(&self, posting: &Posting) -> AiResult<String> {
        self.calls.write().unwrap().push(posting.clone());
        self.verdict
            .clone()
            .ok_or_else(|| AiError::Config("classifier unavailable".to_string()))
    }
}

/// Web search returning the same hits for every query.
pub struct StaticSearch {
    hits: Vec<SearchHit>,
    queries: RwLock<Vec<String>>,
}

impl StaticSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            queries: RwLock::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.read().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for StaticSearch {
    async fn search(&self, query: &str, _limit: usize) -> SourceResult<Vec<SearchHit>> {
        self.queries.write().unwrap().push(query.to_string());
        Ok(self.hits.clone())
    }
}

// ============================================================================
// Time
// ============================================================================

/// A clock that only moves when told to.
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap() = now;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.write().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Default)]
pub struct InstantSleeper {
    slept: RwLock<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time that would have been slept.
    pub fn total(&self) -> Duration {
        self.slept.read().unwrap().iter().sum()
    }

    /// Number of sleeps.
    pub fn sleeps(&self) -> usize {
        self.slept.read().unwrap().len()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.write().unwrap().push(duration);
    }
}

// ============================================================================
// Snapshot API
// ============================================================================

/// Record of a call made to the mock snapshot API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotCall {
    CollectProfile { url: String },
    DiscoverJobs { url: String },
    FetchProfiles { snapshot_id: String },
    FetchJobs { snapshot_id: String },
}

/// Scripted dataset API.
///
/// Each fetch pops the next scripted status; once the script runs out the
/// snapshot stays pending forever.
#[derive(Default)]
pub struct MockSnapshotApi {
    profile_statuses: RwLock<VecDeque<SnapshotStatus<CompanyProfileRecord>>>,
    job_statuses: RwLock<VecDeque<SnapshotStatus<JobListingRecord>>>,
    fail_profile_trigger: bool,
    fail_jobs_trigger: bool,
    calls: RwLock<Vec<SnapshotCall>>,
}

impl MockSnapshotApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile snapshot pending `pending` times, then ready with `records`.
    pub fn with_profiles(self, pending: usize, records: Vec<CompanyProfileRecord>) -> Self {
        {
            let mut statuses = self.profile_statuses.write().unwrap();
            statuses.extend((0..pending).map(|_| SnapshotStatus::Pending));
            statuses.push_back(SnapshotStatus::Ready(records));
        }
        self
    }

    /// Jobs snapshot pending `pending` times, then ready with `records`.
    pub fn with_jobs(self, pending: usize, records: Vec<JobListingRecord>) -> Self {
        {
            let mut statuses = self.job_statuses.write().unwrap();
            statuses.extend((0..pending).map(|_| SnapshotStatus::Pending));
            statuses.push_back(SnapshotStatus::Ready(records));
        }
        self
    }

    pub fn failing_profile_trigger(mut self) -> Self {
        self.fail_profile_trigger = true;
        self
    }

    pub fn failing_jobs_trigger(mut self) -> Self {
        self.fail_jobs_trigger = true;
        self
    }

    pub fn calls(&self) -> Vec<SnapshotCall> {
        self.calls.read().unwrap().clone()
    }

    fn api_error() -> BrightDataError {
        BrightDataError::Api {
            status: 500,
            message: "scripted failure".to_string(),
        }
    }
}

/// A company profile record.
pub fn profile_record(name: &str, company_id: &str) -> CompanyProfileRecord {
    CompanyProfileRecord {
        name: Some(name.to_string()),
        company_id: Some(company_id.to_string()),
        ..Default::default()
    }
}

/// A job listing record.
pub fn job_record(title: &str, url: &str) -> JobListingRecord {
    JobListingRecord {
        job_title: Some(title.to_string()),
        company_name: Some("Acme".to_string()),
        url: Some(url.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl SnapshotApi for MockSnapshotApi {
    async fn collect_company_profile(&self, profile_url: &str) -> brightdata_client::Result<String> {
        self.calls.write().unwrap().push(SnapshotCall::CollectProfile {
            url: profile_url.to_string(),
        });
        if self.fail_profile_trigger {
            return Err(Self::api_error());
        }
        Ok("snap-profile".to_string())
    }

    async fn discover_jobs(&self, jobs_url: &str) -> brightdata_client::Result<String> {
        self.calls.write().unwrap().push(SnapshotCall::DiscoverJobs {
            url: jobs_url.to_string(),
        });
        if self.fail_jobs_trigger {
            return Err(Self::api_error());
        }
        Ok("snap-jobs".to_string())
    }

    async fn company_profiles(
        &self,
        snapshot_id: &str,
    ) -> brightdata_client::Result<SnapshotStatus<CompanyProfileRecord>> {
        self.calls.write().unwrap().push(SnapshotCall::FetchProfiles {
            snapshot_id: snapshot_id.to_string(),
        });
        Ok(self
            .profile_statuses
            .write()
            .unwrap()
            .pop_front()
            .unwrap_or(SnapshotStatus::Pending))
    }

    async fn job_listings(
        &self,
        snapshot_id: &str,
    ) -> brightdata_client::Result<SnapshotStatus<JobListingRecord>> {
        self.calls.write().unwrap().push(SnapshotCall::FetchJobs {
            snapshot_id: snapshot_id.to_string(),
        });
        Ok(self
            .job_statuses
            .write()
            .unwrap()
            .pop_front()
            .unwrap_or(SnapshotStatus::Pending))
    }
}

// ============================================================================
// Sources
// ============================================================================

enum ScriptedPage {
    Outcome(PageOutcome),
    Failure,
}

/// Website source with a fixed outcome per URL. Unscripted URLs fail to
/// load.
#[derive(Default)]
pub struct ScriptedWebsite {
    pages: RwLock<HashMap<String, ScriptedPage>>,
    requests: RwLock<Vec<PageRequest>>,
}

impl ScriptedWebsite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(self, url: impl Into<String>, result: ScanResult) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(url.into(), ScriptedPage::Outcome(PageOutcome::Listing(result)));
        self
    }

    pub fn with_hubs(self, url: impl Into<String>, hubs: Vec<String>) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(url.into(), ScriptedPage::Outcome(PageOutcome::Hubs(hubs)));
        self
    }

    pub fn failing(self, url: impl Into<String>) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(url.into(), ScriptedPage::Failure);
        self
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.read().unwrap().clone()
    }
}

#[async_trait]
impl WebsitePages for ScriptedWebsite {
    async fn scan_page(&self, request: PageRequest) -> SourceResult<PageOutcome> {
        self.requests.write().unwrap().push(request.clone());
        match self.pages.read().unwrap().get(&request.url) {
            Some(ScriptedPage::Outcome(outcome)) => Ok(outcome.clone()),
            Some(ScriptedPage::Failure) | None => Err(SourceError::Browser(BrowserError::Navigation {
                url: request.url.clone(),
                message: "scripted failure".to_string(),
            })),
        }
    }
}

/// LinkedIn source with one fixed result, or failing every scan.
pub struct ScriptedLinkedIn {
    result: Option<ScanResult>,
    calls: RwLock<Vec<(String, Vec<String>)>>,
}

impl ScriptedLinkedIn {
    pub fn returning(result: ScanResult) -> Self {
        Self {
            result: Some(result),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            calls: RwLock::new(Vec::new()),
        }
    }

    /// `(linkedin_url, known links)` per scan.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl LinkedInJobs for ScriptedLinkedIn {
    async fn scan(&self, linkedin_url: &str, known: &[String]) -> SourceResult<ScanResult> {
        self.calls
            .write()
            .unwrap()
            .push((linkedin_url.to_string(), known.to_vec()));
        self.result.clone().ok_or_else(|| SourceError::SnapshotTimeout {
            snapshot_id: "snap-jobs".to_string(),
            attempts: 200,
        })
    }
}

// ============================================================================
// Storage and notification
// ============================================================================

/// A [`MemoryStore`] whose reads or writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: bool,
    fail_writes: bool,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl RosterStore for FlakyStore {
    async fn get_roster(&self, account_id: &str) -> StoreResult<Vec<Company>> {
        if self.fail_reads {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.get_roster(account_id).await
    }

    async fn put_roster(&self, account_id: &str, companies: &[Company]) -> StoreResult<()> {
        if self.fail_writes {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.put_roster(account_id, companies).await
    }

    async fn account_ids(&self) -> StoreResult<Vec<String>> {
        if self.fail_reads {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.account_ids().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Notifier that records every delivery attempt.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    deliveries: RwLock<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.read().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(
        &self,
        recipients: &[String],
        subject: &str,
        html: &str,
    ) -> Result<(), NotifyError> {
        self.deliveries.write().unwrap().push(Delivery {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        if self.fail {
            return Err(NotifyError::Delivery("smtp unavailable".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Browser
// ============================================================================

/// A frame of a [`FakePage`].
#[derive(Debug, Clone, Default)]
pub struct FakeFrame {
    pub url: String,
    /// Cross-origin frames refuse in-place reads.
    pub same_origin: bool,
    pub controls: Vec<Control>,
    pub groups: Vec<TextGroup>,
    pub candidates: HashMap<String, Vec<Candidate>>,
}

impl FakeFrame {
    pub fn same_origin(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            same_origin: true,
            ..Default::default()
        }
    }

    pub fn cross_origin(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            same_origin: false,
            ..Default::default()
        }
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    pub fn with_group(mut self, key: &str, texts: &[&str]) -> Self {
        self.groups.push(TextGroup::new(key, texts));
        self
    }

    pub fn with_candidates(mut self, selector: &str, candidates: Vec<Candidate>) -> Self {
        self.candidates.insert(selector.to_string(), candidates);
        self
    }
}

/// Scripted DOM of one URL.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub controls: Vec<Control>,
    pub groups: Vec<TextGroup>,
    pub candidates: HashMap<String, Vec<Candidate>>,
    pub frames: Vec<FakeFrame>,
    pub cookie_banner: bool,
    /// Control index → URL its click navigates to.
    pub navigations: HashMap<usize, String>,
    /// `(selector, element index)` → probe levels.
    pub probes: HashMap<(String, usize), Vec<ProbeLevel>>,
    /// `(selector, element index, depth, position)` → URL the click opens.
    pub probe_navigations: HashMap<(String, usize, usize, usize), String>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a control; its index is set to its position.
    pub fn with_control(mut self, mut control: Control) -> Self {
        control.index = self.controls.len();
        self.controls.push(control);
        self
    }

    pub fn with_group(mut self, key: &str, texts: &[&str]) -> Self {
        self.groups.push(TextGroup::new(key, texts));
        self
    }

    pub fn with_candidates(mut self, selector: &str, candidates: Vec<Candidate>) -> Self {
        self.candidates.insert(selector.to_string(), candidates);
        self
    }

    pub fn with_frame(mut self, frame: FakeFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn with_cookie_banner(mut self) -> Self {
        self.cookie_banner = true;
        self
    }

    /// Clicking the control at `index` navigates to `url`.
    pub fn navigating(mut self, index: usize, url: impl Into<String>) -> Self {
        self.navigations.insert(index, url.into());
        self
    }

    pub fn with_probe(mut self, selector: &str, index: usize, levels: Vec<ProbeLevel>) -> Self {
        self.probes.insert((selector.to_string(), index), levels);
        self
    }

    pub fn probe_navigating(
        mut self,
        selector: &str,
        index: usize,
        depth: usize,
        position: usize,
        url: impl Into<String>,
    ) -> Self {
        self.probe_navigations
            .insert((selector.to_string(), index, depth, position), url.into());
        self
    }
}

/// What happened in the fake browser, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    Opened,
    Goto(String),
    CookiesAccepted(String),
    Click { url: String, text: String },
    ProbeClick { url: String, depth: usize, position: usize },
    Back { from: String },
    Closed,
}

/// A scripted website: pages by URL plus an event log.
#[derive(Default)]
pub struct FakeSite {
    pages: RwLock<HashMap<String, FakePage>>,
    unreachable: RwLock<HashSet<String>>,
    events: RwLock<Vec<BrowserEvent>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, page: FakePage) -> Self {
        self.pages.write().unwrap().insert(url.into(), page);
        self
    }

    /// Navigation to `url` fails.
    pub fn unreachable(self, url: impl Into<String>) -> Self {
        self.unreachable.write().unwrap().insert(url.into());
        self
    }

    pub fn events(&self) -> Vec<BrowserEvent> {
        self.events.read().unwrap().clone()
    }

    /// URLs loaded with `goto`, in order.
    pub fn visited(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BrowserEvent::Goto(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Pages opened and not yet closed.
    pub fn open_pages(&self) -> usize {
        let events = self.events();
        let opened = events.iter().filter(|e| **e == BrowserEvent::Opened).count();
        let closed = events.iter().filter(|e| **e == BrowserEvent::Closed).count();
        opened.saturating_sub(closed)
    }

    fn record(&self, event: BrowserEvent) {
        self.events.write().unwrap().push(event);
    }

    fn page(&self, url: &str) -> FakePage {
        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }
}

/// [`BrowserDriver`] over a [`FakeSite`].
pub struct FakeBrowser {
    site: Arc<FakeSite>,
}

impl FakeBrowser {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self { site }
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        self.site.record(BrowserEvent::Opened);
        Ok(Box::new(FakeTab {
            site: self.site.clone(),
            history: Vec::new(),
        }))
    }
}

struct FakeTab {
    site: Arc<FakeSite>,
    history: Vec<String>,
}

impl FakeTab {
    fn url(&self) -> String {
        self.history
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string())
    }

    fn current(&self) -> FakePage {
        self.site.page(&self.url())
    }

    fn frame(&self, index: usize) -> BrowserResult<FakeFrame> {
        match self.current().frames.get(index) {
            Some(frame) if frame.same_origin => Ok(frame.clone()),
            _ => Err(BrowserError::FrameInaccessible { index }),
        }
    }
}

#[async_trait]
impl Page for FakeTab {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> BrowserResult<()> {
        if self.site.unreachable.read().unwrap().contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        self.site.record(BrowserEvent::Goto(url.to_string()));
        self.history.push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.url())
    }

    async fn go_back(&mut self) -> BrowserResult<()> {
        self.site.record(BrowserEvent::Back { from: self.url() });
        if self.history.len() > 1 {
            self.history.pop();
        }
        Ok(())
    }

    async fn accept_cookies(&mut self) -> BrowserResult<bool> {
        let accepted = self.current().cookie_banner;
        if accepted {
            self.site.record(BrowserEvent::CookiesAccepted(self.url()));
        }
        Ok(accepted)
    }

    async fn scroll_by(&mut self, _delta_y: i64) -> BrowserResult<()> {
        Ok(())
    }

    async fn frames(&self) -> BrowserResult<Vec<FrameInfo>> {
        Ok(self
            .current()
            .frames
            .iter()
            .enumerate()
            .map(|(index, f)| FrameInfo {
                index,
                url: f.url.clone(),
            })
            .collect())
    }

    async fn controls(&self, scope: Scope) -> BrowserResult<Vec<Control>> {
        match scope {
            Scope::Main => Ok(self.current().controls),
            Scope::Frame(index) => Ok(self.frame(index)?.controls),
        }
    }

    async fn click_control(
        &mut self,
        scope: Scope,
        index: usize,
        expected_text: &str,
    ) -> BrowserResult<bool> {
        let page = self.current();
        let controls = match scope {
            Scope::Main => page.controls.clone(),
            Scope::Frame(i) => self.frame(i)?.controls,
        };
        let Some(control) = controls.iter().find(|c| c.index == index) else {
            return Ok(false);
        };
        if control.text != expected_text {
            return Ok(false);
        }

        self.site.record(BrowserEvent::Click {
            url: self.url(),
            text: control.text.clone(),
        });
        if scope == Scope::Main {
            if let Some(target) = page.navigations.get(&index) {
                self.history.push(target.clone());
            }
        }
        Ok(true)
    }

    async fn text_groups(&self, scope: Scope) -> BrowserResult<Vec<TextGroup>> {
        match scope {
            Scope::Main => Ok(self.current().groups),
            Scope::Frame(index) => Ok(self.frame(index)?.groups),
        }
    }

    async fn select(&self, scope: Scope, selector: &str) -> BrowserResult<Vec<Candidate>> {
        let candidates = match scope {
            Scope::Main => self.current().candidates,
            Scope::Frame(index) => self.frame(index)?.candidates,
        };
        Ok(candidates.get(selector).cloned().unwrap_or_default())
    }

    async fn probe_levels(
        &self,
        target: &ElementPath,
        max_depth: usize,
    ) -> BrowserResult<Vec<ProbeLevel>> {
        if target.scope != Scope::Main {
            return Ok(Vec::new());
        }
        Ok(self
            .current()
            .probes
            .get(&(target.selector.clone(), target.index))
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|level| level.depth <= max_depth)
            .collect())
    }

    async fn click_probe(
        &mut self,
        target: &ElementPath,
        depth: usize,
        position: usize,
    ) -> BrowserResult<()> {
        self.site.record(BrowserEvent::ProbeClick {
            url: self.url(),
            depth,
            position,
        });
        let key = (target.selector.clone(), target.index, depth, position);
        if let Some(url) = self.current().probe_navigations.get(&key) {
            self.history.push(url.clone());
        }
        Ok(())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.site.record(BrowserEvent::Closed);
        Ok(())
    }
}
