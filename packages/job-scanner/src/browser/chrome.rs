//! Headless Chrome implementation of the browser seam.
//!
//! `headless_chrome` is synchronous, so every DevTools call runs on the
//! blocking pool. Each [`ChromePage`] owns one tab and closes it when
//! dropped, which covers early returns and errors in the harvester.

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{
    scripts, BrowserDriver, Candidate, Control, ElementPath, FrameInfo, Page, ProbeLevel, Scope,
    TextGroup,
};
use crate::error::{BrowserError, BrowserResult};

pub struct ChromeDriver {
    browser: Browser,
    user_agent: String,
}

impl ChromeDriver {
    pub fn launch(
        headless: bool,
        chrome_path: Option<PathBuf>,
        user_agent: impl Into<String>,
    ) -> BrowserResult<Self> {
        let options = LaunchOptions {
            headless,
            sandbox: false,
            window_size: Some((1280, 800)),
            path: chrome_path,
            idle_browser_timeout: Duration::from_secs(900),
            args: vec![
                OsStr::new("--disable-setuid-sandbox"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--lang=en-US"),
            ],
            ..Default::default()
        };

        let browser = Browser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))?;
        tracing::info!(headless, "Chrome launched");

        Ok(Self {
            browser,
            user_agent: user_agent.into(),
        })
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        tab.set_user_agent(&self.user_agent, Some("en-US"), None)
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;

        Ok(Box::new(ChromePage {
            tab,
            closed: false,
        }))
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
    closed: bool,
}

impl ChromePage {
    async fn run<T, F>(&self, call: F) -> BrowserResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Tab>) -> BrowserResult<T> + Send + 'static,
    {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || call(tab))
            .await
            .map_err(|e| BrowserError::Protocol(format!("browser task failed: {e}")))?
    }

    async fn eval<T>(&self, script: String) -> BrowserResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.run(move |tab| {
            let result = tab
                .evaluate(&script, false)
                .map_err(|e| BrowserError::Script(e.to_string()))?;
            scripts::decode(result.value.as_ref())
        })
        .await
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> BrowserResult<()> {
        let url = url.to_string();
        self.run(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| BrowserError::Navigation {
                    url: url.clone(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn current_url(&self) -> BrowserResult<String> {
        self.run(|tab| Ok(tab.get_url())).await
    }

    async fn go_back(&mut self) -> BrowserResult<()> {
        let _: bool = self.eval(scripts::go_back()).await?;
        self.run(|tab| {
            // A back navigation served from the bfcache may never report
            // itself as navigating; the caller settles afterwards anyway.
            let _ = tab.wait_until_navigated();
            Ok(())
        })
        .await
    }

    async fn accept_cookies(&mut self) -> BrowserResult<bool> {
        self.eval(scripts::accept_cookies()).await
    }

    async fn scroll_by(&mut self, delta_y: i64) -> BrowserResult<()> {
        let _: bool = self.eval(scripts::scroll_by(delta_y)).await?;
        Ok(())
    }

    async fn frames(&self) -> BrowserResult<Vec<FrameInfo>> {
        self.eval(scripts::frames()).await
    }

    async fn controls(&self, scope: Scope) -> BrowserResult<Vec<Control>> {
        self.eval(scripts::controls(scope)).await
    }

    async fn click_control(
        &mut self,
        scope: Scope,
        index: usize,
        expected_text: &str,
    ) -> BrowserResult<bool> {
        self.eval(scripts::click_control(scope, index, expected_text))
            .await
    }

    async fn text_groups(&self, scope: Scope) -> BrowserResult<Vec<TextGroup>> {
        self.eval(scripts::text_groups(scope)).await
    }

    async fn select(&self, scope: Scope, selector: &str) -> BrowserResult<Vec<Candidate>> {
        self.eval(scripts::select(scope, selector)).await
    }

    async fn probe_levels(
        &self,
        target: &ElementPath,
        max_depth: usize,
    ) -> BrowserResult<Vec<ProbeLevel>> {
        self.eval(scripts::probe_levels(
            target.scope,
            &target.selector,
            target.index,
            max_depth,
        ))
        .await
    }

    async fn click_probe(
        &mut self,
        target: &ElementPath,
        depth: usize,
        position: usize,
    ) -> BrowserResult<()> {
        let clicked: bool = self
            .eval(scripts::click_probe(
                target.scope,
                &target.selector,
                target.index,
                depth,
                position,
            ))
            .await?;
        if !clicked {
            return Err(BrowserError::Script(format!(
                "probe control {depth}/{position} is gone"
            )));
        }
        Ok(())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.run(|tab| {
            tab.close(false)
                .map(|_| ())
                .map_err(|e| BrowserError::Protocol(e.to_string()))
        })
        .await
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.tab.close(false) {
                tracing::debug!(error = %e, "Failed to close tab on drop");
            }
        }
    }
}
