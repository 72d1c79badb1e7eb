//! Job Posting Scan-and-Reconcile Engine
//!
//! Keeps a per-account roster of monitored companies and their open job
//! postings current. A scan reads a company's careers page and LinkedIn
//! listings, works out which postings are new and which have gone away,
//! and writes the merged roster back.
//!
//! # Pipeline
//!
//! ```text
//! Scanner::scan_company
//!     ├─► WebsiteSource (careers page)
//!     │       ├─► Harvester: load, scroll, hubs, survey, collect
//!     │       ├─► StructureClassifier: which groups are job titles
//!     │       └─► PostingExtractor: titles + links from fresh anchors
//!     ├─► LinkedInSource (remote snapshot datasets)
//!     └─► reconcile::plan → mint → RosterStore::put_roster
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_scanner::{MemoryStore, Scanner, ScanType};
//! use std::sync::Arc;
//!
//! let scanner = Scanner::new(Arc::new(MemoryStore::new()))
//!     .with_website(website)
//!     .with_linkedin(linkedin);
//!
//! let report = scanner.scan_company("account-1", Some("acme"), &ScanType::ALL).await?;
//! ```
//!
//! # Modules
//!
//! - [`browser`] - Browser seam and the headless Chrome driver
//! - [`harvester`] - Page loading, hub detection, group survey, title collection
//! - [`sources`] - Website and LinkedIn sub-sources
//! - [`reconcile`] - Merge of prior jobs with a scan's findings
//! - [`orchestrator`] - Company scans and record deletion
//! - [`stores`] - Roster storage (MemoryStore, PostgresStore)
//! - [`schedule`] - Periodic scans and new-posting digests
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod browser;
pub mod cache;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod extractor;
pub mod harvester;
pub mod links;
pub mod notify;
pub mod orchestrator;
pub mod poll;
pub mod profiles;
pub mod reconcile;
pub mod relevance;
pub mod schedule;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use error::{
    AiError, BrowserError, CacheError, NotifyError, Result, ScanError, SourceError, StoreError,
};
pub use types::{Company, PageOutcome, Phase, Posting, ScanResult, ScanState, ScanType, TrackedJob};

pub use config::{Config, HarvestConfig, ModelConfig, ScanPolicy};
pub use orchestrator::{ScanReport, Scanner};

// Re-export components
pub use ai::{BaseAI, CompletionRequest, OpenAI};
pub use cache::{FileCache, KvCache, MemoryCache};
pub use classifier::StructureClassifier;
pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};
pub use extractor::{Extraction, LinkMode, PostingExtractor};
pub use harvester::{Anchor, GroupMap, HarvestSession, Harvester};
pub use notify::{Digest, LogNotifier, Notifier};
pub use poll::PollPolicy;
pub use profiles::{OverrideRule, SiteProfile, SiteProfiles};
pub use relevance::{LlmRelevanceClassifier, RelevanceClassifier};
pub use sources::{
    CareersUrlResolver, LinkedInJobs, LinkedInSource, PageRequest, SerpApiSearch, WebSearch,
    WebsitePages, WebsiteSource,
};

// Re-export stores
pub use stores::{MemoryStore, PostgresStore, RosterStore};
