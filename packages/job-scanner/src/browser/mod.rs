//! Browser automation seam.
//!
//! The harvester only sees [`BrowserDriver`] and [`Page`]. Every query
//! returns a plain snapshot of what the DOM looked like at that moment;
//! nothing hands out live element handles. Mutating calls address elements
//! by selector and index and re-resolve them at call time, so a click that
//! rebuilds the DOM can never leave the caller holding a stale reference.

pub mod chrome;
pub mod heuristics;
pub mod scripts;

pub use chrome::ChromeDriver;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::BrowserResult;

/// Which document a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Main,
    /// The n-th `iframe`/`frame` element of the main document. Only readable
    /// in place when it is same-origin.
    Frame(usize),
}

/// A link or button, in `a, button` document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Control {
    pub index: usize,
    pub tag: String,
    /// Lowercased, trimmed text content.
    pub text: String,
    pub href: Option<String>,
    pub target: Option<String>,
    pub visible: bool,
}

impl Control {
    pub fn link(index: usize, text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            index,
            tag: "a".to_string(),
            text: text.into(),
            href: Some(href.into()),
            target: None,
            visible: true,
        }
    }

    pub fn button(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            tag: "button".to_string(),
            text: text.into(),
            href: None,
            target: None,
            visible: true,
        }
    }

    pub fn in_new_context(mut self) -> Self {
        self.target = Some("_blank".to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn is_anchor(&self) -> bool {
        self.tag == "a"
    }

    pub fn opens_new_context(&self) -> bool {
        self.target.as_deref() == Some("_blank")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameInfo {
    pub index: usize,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupedText {
    pub text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl GroupedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// Texts sharing a structural key (`parent key > element key`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextGroup {
    pub key: String,
    pub elements: Vec<GroupedText>,
}

impl TextGroup {
    pub fn new(key: impl Into<String>, texts: &[&str]) -> Self {
        Self {
            key: key.into(),
            elements: texts.iter().map(|t| GroupedText::new(*t)).collect(),
        }
    }
}

/// An element matched by a title selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    /// Trimmed text content.
    pub text: String,
    pub href: Option<String>,
    /// Attributes other than `href` and `class`.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// False when a `display`, `opacity` or `visibility` attribute is `none`.
    pub shown: bool,
}

impl Candidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shown: true,
            ..Default::default()
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }
}

/// Address of one element matched by a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    pub scope: Scope,
    pub selector: String,
    pub index: usize,
}

impl ElementPath {
    pub fn new(scope: Scope, selector: impl Into<String>, index: usize) -> Self {
        Self {
            scope,
            selector: selector.into(),
            index,
        }
    }
}

/// A link or button found around an element during an ancestor probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProbeControl {
    /// Position within the level: descendants first, the level element last.
    pub position: usize,
    pub tag: String,
    /// Lowercased text content.
    pub text: String,
    pub href: Option<String>,
    pub visible: bool,
    /// True for the level element itself.
    pub is_level_element: bool,
}

/// Links and buttons under the element `depth` levels above the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProbeLevel {
    pub depth: usize,
    pub controls: Vec<ProbeControl>,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a fresh page in its own browsing context.
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>>;
}

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&mut self, url: &str, timeout: Duration) -> BrowserResult<()>;

    async fn current_url(&self) -> BrowserResult<String>;

    async fn go_back(&mut self) -> BrowserResult<()>;

    /// Click a button reading "accept all", if there is one.
    async fn accept_cookies(&mut self) -> BrowserResult<bool>;

    async fn scroll_by(&mut self, delta_y: i64) -> BrowserResult<()>;

    /// Child frames of the main document.
    async fn frames(&self) -> BrowserResult<Vec<FrameInfo>>;

    /// All `a, button` elements in the scope.
    async fn controls(&self, scope: Scope) -> BrowserResult<Vec<Control>>;

    /// Scroll the `index`-th control into view and click it. Returns false
    /// without clicking when the element there no longer has `expected_text`.
    async fn click_control(
        &mut self,
        scope: Scope,
        index: usize,
        expected_text: &str,
    ) -> BrowserResult<bool>;

    /// Text-bearing elements grouped by structural key, in first-seen order.
    async fn text_groups(&self, scope: Scope) -> BrowserResult<Vec<TextGroup>>;

    async fn select(&self, scope: Scope, selector: &str) -> BrowserResult<Vec<Candidate>>;

    /// Links and buttons around `target`, from the element itself up to
    /// `max_depth` ancestors. Empty when the target no longer exists.
    async fn probe_levels(
        &self,
        target: &ElementPath,
        max_depth: usize,
    ) -> BrowserResult<Vec<ProbeLevel>>;

    /// Click one control found by [`Page::probe_levels`].
    async fn click_probe(
        &mut self,
        target: &ElementPath,
        depth: usize,
        position: usize,
    ) -> BrowserResult<()>;

    async fn close(&mut self) -> BrowserResult<()>;
}
