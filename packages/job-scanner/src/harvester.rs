//! DOM harvester: drives one careers page and collects raw candidates.
//!
//! A [`HarvestSession`] owns one loaded page. The website source uses it in
//! two steps: first [`HarvestSession::find_hubs`] and
//! [`HarvestSession::survey`] describe the page, then, once a title
//! selector is known, [`HarvestSession::collect`] gathers `{text, href}`
//! candidates across pagination and frames.
//!
//! Failures of single elements, controls, or frames are logged and skipped.
//! Only the initial navigation is fatal.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::heuristics::{is_page_number, is_view_jobs, matches_any, probe_keywords};
use crate::browser::{BrowserDriver, Control, ElementPath, GroupedText, Page, Scope, TextGroup};
use crate::config::HarvestConfig;
use crate::error::BrowserResult;
use crate::links;
use crate::types::Posting;

/// A harvested element: visible text plus the link it leads to.
///
/// `href` is the raw attribute value (possibly relative), the URL an
/// ancestor probe led to, or an [`links::element_link`] when neither exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub text: String,
    pub href: String,
    pub attributes: BTreeMap<String, String>,
}

impl Anchor {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// Text groups keyed by structural class, in first-seen order.
pub type GroupMap = IndexMap<String, Vec<GroupedText>>;

pub struct Harvester {
    driver: Arc<dyn BrowserDriver>,
    config: HarvestConfig,
}

impl Harvester {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: HarvestConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Load `url`, dismiss the cookie banner, and scroll to trigger lazy
    /// content. Navigation failure is returned to the caller.
    pub async fn open(&self, url: &str) -> BrowserResult<HarvestSession> {
        let mut page = self.driver.new_page().await?;

        if let Err(e) = page.goto(url, self.config.navigation_timeout).await {
            if let Err(close_err) = page.close().await {
                tracing::debug!(error = %close_err, "Failed to close page after navigation error");
            }
            return Err(e);
        }
        settle(self.config.initial_settle).await;

        match page.accept_cookies().await {
            Ok(true) => tracing::debug!(url, "Cookie banner accepted"),
            Ok(false) => {}
            Err(e) => tracing::debug!(url, error = %e, "Cookie banner check failed"),
        }

        for _ in 0..self.config.scroll_steps {
            if let Err(e) = page.scroll_by(self.config.scroll_distance).await {
                tracing::debug!(url, error = %e, "Scroll step failed");
                break;
            }
            settle(self.config.scroll_settle).await;
        }

        Ok(HarvestSession {
            page,
            requested_url: url.to_string(),
            driver: self.driver.clone(),
            config: self.config.clone(),
        })
    }
}

pub struct HarvestSession {
    page: Box<dyn Page>,
    requested_url: String,
    driver: Arc<dyn BrowserDriver>,
    config: HarvestConfig,
}

impl HarvestSession {
    pub fn requested_url(&self) -> &str {
        &self.requested_url
    }

    /// Where the page is now; falls back to the requested URL.
    pub async fn current_url(&self) -> String {
        self.page
            .current_url()
            .await
            .unwrap_or_else(|_| self.requested_url.clone())
    }

    /// Visible "view N jobs" links that open a new browsing context. Each is
    /// a listing page of its own.
    pub async fn find_hubs(&mut self) -> Vec<String> {
        let base = self.current_url().await;
        let mut hubs: Vec<String> = Vec::new();

        for scope in self.readable_scopes().await {
            let controls = match self.page.controls(scope).await {
                Ok(controls) => controls,
                Err(e) => {
                    tracing::debug!(?scope, error = %e, "Skipping scope for hub links");
                    continue;
                }
            };

            for control in controls {
                if !(control.is_anchor()
                    && control.visible
                    && control.opens_new_context()
                    && is_view_jobs(&control.text))
                {
                    continue;
                }
                let Some(href) = control.href.as_deref().filter(|h| !h.trim().is_empty()) else {
                    continue;
                };
                let hub = links::normalize(href, &base);
                if !hubs.contains(&hub) {
                    hubs.push(hub);
                }
            }
        }

        if !hubs.is_empty() {
            tracing::info!(url = %base, hubs = hubs.len(), "Page links out to listing hubs");
        }
        hubs
    }

    /// Group the page's text by structural key.
    ///
    /// With `expand`, every "view jobs" control in the main document is
    /// clicked in turn and the revealed content is grouped as well. Frames
    /// are read in place when same-origin and reopened in their own page
    /// otherwise.
    pub async fn survey(&mut self, expand: bool) -> GroupMap {
        let mut groups = GroupMap::new();

        if expand {
            self.expand_view_jobs(&mut groups).await;
        }

        match self.page.text_groups(Scope::Main).await {
            Ok(found) => merge_groups(&mut groups, found),
            Err(e) => tracing::warn!(error = %e, "Could not read main document text"),
        }

        let frames = self.page.frames().await.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Could not list frames");
            Vec::new()
        });
        for frame in frames {
            match self.page.text_groups(Scope::Frame(frame.index)).await {
                Ok(found) => merge_groups(&mut groups, found),
                Err(_) if is_loadable(&frame.url) => {
                    match self.frame_text_groups(&frame.url).await {
                        Ok(found) => merge_groups(&mut groups, found),
                        Err(e) => {
                            tracing::warn!(frame_url = %frame.url, error = %e, "Could not read frame");
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(frame = frame.index, error = %e, "Skipping unreadable frame");
                }
            }
        }

        tracing::debug!(groups = groups.len(), "Survey complete");
        groups
    }

    /// Candidates matching `selector` on this page, on every page reached
    /// through pagination controls, and in every frame. Frames are read in
    /// place when same-origin and reopened in their own page otherwise.
    pub async fn collect(&mut self, selector: &str) -> Vec<Anchor> {
        let page_url = self.current_url().await;
        let mut anchors = self.main_items(selector, &page_url).await;
        tracing::debug!(selector, count = anchors.len(), "Initial candidates");

        self.follow_pagination(selector, &mut anchors).await;

        let frames = self.page.frames().await.unwrap_or_default();
        for frame in frames {
            let scope = Scope::Frame(frame.index);
            let in_place =
                find_items(self.page.as_mut(), scope, selector, &self.config, &frame.url).await;
            let found = match in_place {
                Err(_) if is_loadable(&frame.url) => self.frame_items(&frame.url, selector).await,
                other => other,
            };
            match found {
                Ok(found) => {
                    tracing::debug!(frame_url = %frame.url, count = found.len(), "Frame candidates");
                    push_unique(&mut anchors, found);
                }
                Err(e) => tracing::warn!(frame_url = %frame.url, error = %e, "Could not read frame"),
            }
        }

        anchors
    }

    /// Titles read straight from `selector`, linked to their own href or to
    /// an element link on the document they were read from. The main
    /// document is tried first, then each frame.
    pub async fn direct_titles(&mut self, selector: &str) -> Vec<Posting> {
        let page_url = self.current_url().await;

        let mut source_url = page_url.clone();
        let mut candidates = self
            .page
            .select(Scope::Main, selector)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(selector, error = %e, "Direct title query failed");
                Vec::new()
            });

        if candidates.is_empty() {
            let frames = self.page.frames().await.unwrap_or_default();
            for frame in frames {
                match self.page.select(Scope::Frame(frame.index), selector).await {
                    Ok(found) if !found.is_empty() => {
                        candidates = found;
                        source_url = frame.url;
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!(frame = frame.index, error = %e, "Skipping frame"),
                }
            }
        }

        candidates
            .into_iter()
            .enumerate()
            .filter(|(_, c)| !c.text.is_empty())
            .map(|(position, c)| {
                let link = match c.href.filter(|h| !h.trim().is_empty()) {
                    Some(href) => href,
                    None => links::element_link(&source_url, &c.text, position),
                };
                Posting::new(c.text, link)
            })
            .collect()
    }

    pub async fn close(mut self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "Failed to close page");
        }
    }

    async fn readable_scopes(&self) -> Vec<Scope> {
        let mut scopes = vec![Scope::Main];
        if let Ok(frames) = self.page.frames().await {
            scopes.extend(frames.into_iter().map(|f| Scope::Frame(f.index)));
        }
        scopes
    }

    async fn expand_view_jobs(&mut self, groups: &mut GroupMap) {
        for i in 0..self.config.max_page_clicks {
            let clickable = match self.matching_controls(|c| is_view_jobs(&c.text)).await {
                Ok(clickable) => clickable,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not list view-jobs controls");
                    break;
                }
            };
            let Some(control) = clickable.get(i) else {
                break;
            };

            let before = match self.click(control, self.config.expand_settle).await {
                Ok(Some(before)) => before,
                Ok(None) => {
                    tracing::debug!(index = i, "Control changed under us, stopping expansion");
                    break;
                }
                Err(e) => {
                    tracing::warn!(index = i, error = %e, "View-jobs control failed");
                    continue;
                }
            };

            match self.page.text_groups(Scope::Main).await {
                Ok(found) => merge_groups(groups, found),
                Err(e) => tracing::warn!(index = i, error = %e, "Could not read expanded content"),
            }

            if let Err(e) = self.return_to(&before, self.config.expand_back_settle).await {
                tracing::warn!(error = %e, "Could not return after expansion");
                break;
            }
        }
    }

    async fn follow_pagination(&mut self, selector: &str, anchors: &mut Vec<Anchor>) {
        for i in 0..self.config.max_page_clicks {
            let clickable = match self
                .matching_controls(|c| is_view_jobs(&c.text) || is_page_number(&c.text))
                .await
            {
                Ok(clickable) => clickable,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not list pagination controls");
                    break;
                }
            };
            let Some(control) = clickable.get(i) else {
                break;
            };

            let before = match self.click(control, self.config.page_settle).await {
                Ok(Some(before)) => before,
                Ok(None) => {
                    tracing::debug!(index = i, "Control changed under us, stopping pagination");
                    break;
                }
                Err(e) => {
                    tracing::warn!(index = i, error = %e, "Pagination control failed");
                    continue;
                }
            };

            let page_url = self.current_url().await;
            let found = self.main_items(selector, &page_url).await;
            push_unique(anchors, found);

            if let Err(e) = self.return_to(&before, self.config.page_back_settle).await {
                tracing::warn!(error = %e, "Could not return after pagination");
                break;
            }
        }
    }

    async fn main_items(&mut self, selector: &str, page_url: &str) -> Vec<Anchor> {
        find_items(self.page.as_mut(), Scope::Main, selector, &self.config, page_url)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(selector, error = %e, "Candidate query failed");
                Vec::new()
            })
    }

    /// Visible main-document controls accepted by `keep` that stay in this
    /// browsing context. Queried fresh on every call.
    async fn matching_controls<F>(&self, keep: F) -> BrowserResult<Vec<Control>>
    where
        F: Fn(&Control) -> bool,
    {
        Ok(self
            .page
            .controls(Scope::Main)
            .await?
            .into_iter()
            .filter(|c| c.visible && !c.opens_new_context() && keep(c))
            .collect())
    }

    /// Click `control` and settle. Returns the URL from before the click,
    /// or `None` when the control was no longer there.
    async fn click(&mut self, control: &Control, wait: Duration) -> BrowserResult<Option<String>> {
        let before = self.page.current_url().await?;
        if !self
            .page
            .click_control(Scope::Main, control.index, &control.text)
            .await?
        {
            return Ok(None);
        }
        settle(wait).await;
        Ok(Some(before))
    }

    /// Go back if the page has moved away from `before`.
    async fn return_to(&mut self, before: &str, wait: Duration) -> BrowserResult<()> {
        let after = self.page.current_url().await?;
        if after != before {
            tracing::debug!(from = %before, to = %after, "Click navigated, going back");
            self.page.go_back().await?;
            settle(wait).await;
        }
        Ok(())
    }

    async fn frame_text_groups(&self, url: &str) -> BrowserResult<Vec<TextGroup>> {
        let mut page = self.open_frame_page(url).await?;
        let result = page.text_groups(Scope::Main).await;
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "Failed to close frame page");
        }
        result
    }

    async fn frame_items(&self, url: &str, selector: &str) -> BrowserResult<Vec<Anchor>> {
        let mut page = self.open_frame_page(url).await?;
        let found = find_items(page.as_mut(), Scope::Main, selector, &self.config, url).await;
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "Failed to close frame page");
        }
        found
    }

    async fn open_frame_page(&self, url: &str) -> BrowserResult<Box<dyn Page>> {
        let mut page = self.driver.new_page().await?;
        if let Err(e) = page.goto(url, self.config.frame_navigation_timeout).await {
            if let Err(close_err) = page.close().await {
                tracing::debug!(error = %close_err, "Failed to close frame page");
            }
            return Err(e);
        }
        settle(self.config.frame_settle).await;
        Ok(page)
    }
}

/// Collect candidates for `selector`.
///
/// Elements with an href are taken as-is. Elements without one are probed
/// through their ancestors, which may click and navigate, so after every
/// probe the candidate list is queried again and the scan resumes at the
/// next position. Elements the probe cannot resolve are linked with
/// [`links::element_link`] on `page_url`.
///
/// Only a failure of the first query is returned; later ones end the scan
/// with what was found so far.
pub async fn find_items(
    page: &mut dyn Page,
    scope: Scope,
    selector: &str,
    config: &HarvestConfig,
    page_url: &str,
) -> BrowserResult<Vec<Anchor>> {
    let mut found = Vec::new();
    let mut position = 0usize;
    let mut queried = false;

    loop {
        let candidates = match page.select(scope, selector).await {
            Ok(candidates) => candidates,
            Err(e) if !queried => return Err(e),
            Err(e) => {
                tracing::warn!(selector, error = %e, "Candidate query failed");
                break;
            }
        };
        queried = true;

        let mut requery = false;
        while let Some(candidate) = candidates.get(position) {
            if !candidate.shown || candidate.text.is_empty() {
                position += 1;
                continue;
            }

            match candidate.href.as_deref().filter(|h| !h.is_empty()) {
                Some(href) => {
                    if candidate.text != href {
                        found.push(Anchor {
                            text: candidate.text.clone(),
                            href: href.to_string(),
                            attributes: candidate.attributes.clone(),
                        });
                    }
                    position += 1;
                }
                None => {
                    let target = ElementPath::new(scope, selector, position);
                    let href = match probe_ancestors(page, &target, &candidate.text, config).await
                    {
                        Ok(Some(href)) if href == candidate.text => None,
                        Ok(Some(href)) => Some(href),
                        Ok(None) => Some(links::element_link(page_url, &candidate.text, position)),
                        Err(e) => {
                            tracing::debug!(position, error = %e, "Ancestor probe failed");
                            Some(links::element_link(page_url, &candidate.text, position))
                        }
                    };
                    if let Some(href) = href {
                        found.push(Anchor {
                            text: candidate.text.clone(),
                            href,
                            attributes: candidate.attributes.clone(),
                        });
                    }
                    position += 1;
                    requery = true;
                    break;
                }
            }
        }

        if !requery {
            break;
        }
    }

    Ok(found)
}

/// Walk up from `target` looking for a link or button that leads to the
/// posting. Links are read without clicking. Buttons are clicked, and if
/// that navigates, the new URL is the answer and the page goes back.
///
/// At the element itself every control may match the apply vocabulary or
/// the title text. Further up, only the ancestor itself may match the title;
/// its descendants must match the apply vocabulary.
pub async fn probe_ancestors(
    page: &mut dyn Page,
    target: &ElementPath,
    title: &str,
    config: &HarvestConfig,
) -> BrowserResult<Option<String>> {
    let url_before = page.current_url().await?;
    let with_title = probe_keywords(Some(title));
    let apply_only = probe_keywords(None);

    let mut levels = page.probe_levels(target, config.probe_depth).await?;
    let (mut level_idx, mut position) = (0usize, 0usize);

    loop {
        let Some(level) = levels.get(level_idx) else {
            break;
        };
        let Some(control) = level.controls.get(position).cloned() else {
            level_idx += 1;
            position = 0;
            continue;
        };
        let depth = level.depth;
        position += 1;

        let keywords = if depth == 0 || control.is_level_element {
            &with_title
        } else {
            &apply_only
        };
        if !matches_any(&control.text, keywords) {
            continue;
        }

        match control.tag.as_str() {
            "a" => {
                if let Some(href) = control.href.filter(|h| !h.is_empty()) {
                    return Ok(Some(href));
                }
            }
            "button" if control.visible => {
                if let Err(e) = page.click_probe(target, depth, control.position).await {
                    tracing::debug!(depth, error = %e, "Probe click failed");
                    continue;
                }
                settle(config.probe_click_wait).await;

                let now = page.current_url().await?;
                if now != url_before {
                    page.go_back().await?;
                    settle(config.probe_settle).await;
                    return Ok(Some(now));
                }

                // The click may have rebuilt the DOM around the target.
                levels = page.probe_levels(target, config.probe_depth).await?;
            }
            _ => {}
        }
    }

    Ok(None)
}

pub fn merge_groups(into: &mut GroupMap, groups: Vec<TextGroup>) {
    for group in groups {
        let slot = into.entry(group.key).or_default();
        for element in group.elements {
            if !slot.contains(&element) {
                slot.push(element);
            }
        }
    }
}

fn push_unique(anchors: &mut Vec<Anchor>, found: Vec<Anchor>) {
    for anchor in found {
        if !anchors
            .iter()
            .any(|a| a.href == anchor.href && a.text == anchor.text)
        {
            anchors.push(anchor);
        }
    }
}

fn is_loadable(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && !url.starts_with("about:") && !url.starts_with("javascript:")
}

async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
