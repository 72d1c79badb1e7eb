use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::poll::PollPolicy;

/// Settle delays and bounds for driving a careers page.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Timeout for the top-level page load
    pub navigation_timeout: Duration,
    /// Timeout for loading a frame in its own page
    pub frame_navigation_timeout: Duration,
    /// Wait after the first load, before cookie banners and scrolling
    pub initial_settle: Duration,
    pub scroll_steps: u32,
    pub scroll_distance: i64,
    pub scroll_settle: Duration,
    /// Wait after clicking a "view jobs" control while surveying
    pub expand_settle: Duration,
    /// Wait after going back from a surveyed control
    pub expand_back_settle: Duration,
    /// Wait after clicking a pagination control
    pub page_settle: Duration,
    /// Wait after going back from a pagination click
    pub page_back_settle: Duration,
    /// Wait after loading a frame in its own page
    pub frame_settle: Duration,
    /// Wait for a navigation to start after clicking a probed button
    pub probe_click_wait: Duration,
    /// Wait after backing out of an ancestor-probe navigation
    pub probe_settle: Duration,
    /// How many ancestors above a title element are probed
    pub probe_depth: usize,
    /// Upper bound on pagination clicks per page
    pub max_page_clicks: usize,
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(300),
            frame_navigation_timeout: Duration::from_secs(10),
            initial_settle: Duration::from_secs(6),
            scroll_steps: 5,
            scroll_distance: 3000,
            scroll_settle: Duration::from_secs(2),
            expand_settle: Duration::from_secs(7),
            expand_back_settle: Duration::from_secs(8),
            page_settle: Duration::from_secs(8),
            page_back_settle: Duration::from_secs(4),
            frame_settle: Duration::from_secs(7),
            probe_click_wait: Duration::from_secs(5),
            probe_settle: Duration::from_secs(10),
            probe_depth: 10,
            max_page_clicks: 100,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl HarvestConfig {
    /// Same bounds with every settle delay set to zero.
    pub fn instant() -> Self {
        Self {
            initial_settle: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            expand_settle: Duration::ZERO,
            expand_back_settle: Duration::ZERO,
            page_settle: Duration::ZERO,
            page_back_settle: Duration::ZERO,
            frame_settle: Duration::ZERO,
            probe_click_wait: Duration::ZERO,
            probe_settle: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_probe_depth(mut self, depth: usize) -> Self {
        self.probe_depth = depth;
        self
    }

    pub fn with_max_page_clicks(mut self, max: usize) -> Self {
        self.max_page_clicks = max;
        self
    }

    pub fn with_scroll_steps(mut self, steps: u32) -> Self {
        self.scroll_steps = steps;
        self
    }
}

/// Model names per LLM call site.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub structure: String,
    pub extraction: String,
    pub careers: String,
    pub relevance: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            structure: "gpt-4".to_string(),
            extraction: "gpt-4o".to_string(),
            careers: "gpt-4-turbo".to_string(),
            relevance: "gpt-4o".to_string(),
        }
    }
}

/// Size limits for what is sent to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Cap on the serialized group listing sent to the structure classifier
    pub structure_budget_chars: usize,
    /// Sample texts shown per group
    pub samples_per_group: usize,
    /// Cap on the candidate lines sent to the extractor
    pub extraction_budget_chars: usize,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            structure_budget_chars: 40_000,
            samples_per_group: 2,
            extraction_budget_chars: 60_000,
        }
    }
}

impl ScanPolicy {
    pub fn with_structure_budget(mut self, chars: usize) -> Self {
        self.structure_budget_chars = chars;
        self
    }

    pub fn with_extraction_budget(mut self, chars: usize) -> Self {
        self.extraction_budget_chars = chars;
        self
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: Option<String>,
    pub brightdata_api_key: Option<String>,
    pub serpapi_key: Option<String>,
    pub cache_dir: PathBuf,
    pub site_profiles_path: Option<PathBuf>,
    pub classify_postings: bool,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub snapshot_poll: PollPolicy,
    pub scan_cron: String,
    pub digest_cron: String,
    pub digest_window_hours: i64,
    pub digest_recipients: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            openai_api_key: non_empty("OPENAI_API_KEY"),
            brightdata_api_key: non_empty("BRIGHTDATA_API_KEY"),
            serpapi_key: non_empty("SERPAPI_KEY"),
            cache_dir: env::var("SCANNER_CACHE_DIR")
                .unwrap_or_else(|_| ".cache".to_string())
                .into(),
            site_profiles_path: non_empty("SITE_PROFILES_PATH").map(PathBuf::from),
            classify_postings: parse_bool("CLASSIFY_POSTINGS", false)?,
            chrome_path: non_empty("CHROME_PATH").map(PathBuf::from),
            headless: parse_bool("HEADLESS", true)?,
            snapshot_poll: PollPolicy::new(
                env::var("SNAPSHOT_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "200".to_string())
                    .parse()
                    .context("SNAPSHOT_MAX_ATTEMPTS must be a valid number")?,
                Duration::from_secs(
                    env::var("SNAPSHOT_POLL_INTERVAL_SECS")
                        .unwrap_or_else(|_| "10".to_string())
                        .parse()
                        .context("SNAPSHOT_POLL_INTERVAL_SECS must be a valid number")?,
                ),
            ),
            scan_cron: env::var("SCAN_CRON").unwrap_or_else(|_| "0 0 */12 * * *".to_string()),
            digest_cron: env::var("DIGEST_CRON")
                .unwrap_or_else(|_| "0 0 2-23/3 * * *".to_string()),
            digest_window_hours: env::var("DIGEST_WINDOW_HOURS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("DIGEST_WINDOW_HOURS must be a valid number")?,
            digest_recipients: env::var("DIGEST_RECIPIENTS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn careers_cache_path(&self) -> PathBuf {
        self.cache_dir.join("careers_urls.json")
    }

    pub fn linkedin_cache_path(&self) -> PathBuf {
        self.cache_dir.join("linkedin_urls.json")
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &str, default: bool) -> Result<bool> {
    match non_empty(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{name} must be a boolean, got {other:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_harvest_keeps_bounds() {
        let config = HarvestConfig::instant().with_max_page_clicks(3);

        assert_eq!(config.initial_settle, Duration::ZERO);
        assert_eq!(config.probe_settle, Duration::ZERO);
        assert_eq!(config.navigation_timeout, Duration::from_secs(300));
        assert_eq!(config.scroll_steps, 5);
        assert_eq!(config.max_page_clicks, 3);
    }

    #[test]
    fn cache_files_live_under_cache_dir() {
        let config = Config {
            database_url: "postgres://localhost/jobs".to_string(),
            openai_api_key: None,
            brightdata_api_key: None,
            serpapi_key: None,
            cache_dir: PathBuf::from("/tmp/scanner"),
            site_profiles_path: None,
            classify_postings: false,
            chrome_path: None,
            headless: true,
            snapshot_poll: PollPolicy::new(200, Duration::from_secs(10)),
            scan_cron: "0 0 */12 * * *".to_string(),
            digest_cron: "0 0 2-23/3 * * *".to_string(),
            digest_window_hours: 3,
            digest_recipients: Vec::new(),
        };

        assert_eq!(
            config.careers_cache_path(),
            PathBuf::from("/tmp/scanner/careers_urls.json")
        );
        assert_eq!(
            config.linkedin_cache_path(),
            PathBuf::from("/tmp/scanner/linkedin_urls.json")
        );
    }
}
