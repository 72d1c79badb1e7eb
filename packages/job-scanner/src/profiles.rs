//! Site profiles: how a given careers page is scanned.
//!
//! Most pages are handled generically. A small table of override rules,
//! matched by URL substring, covers sites where the generic path is known
//! to go wrong.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::Phase;

/// Behavior for one known site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub name: String,
    /// Applies when the requested or current URL contains this.
    pub url_contains: String,
    #[serde(default)]
    pub skip_hubs: bool,
    #[serde(default)]
    pub skip_expansion: bool,
    /// Title selector used instead of asking the classifier.
    #[serde(default)]
    pub selector: Option<String>,
    /// Read titles straight from `selector`; no link probing, no extraction.
    #[serde(default)]
    pub direct_titles: bool,
}

impl OverrideRule {
    pub fn new(name: impl Into<String>, url_contains: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_contains: url_contains.into(),
            skip_hubs: false,
            skip_expansion: false,
            selector: None,
            direct_titles: false,
        }
    }

    pub fn skipping_hubs(mut self) -> Self {
        self.skip_hubs = true;
        self
    }

    pub fn skipping_expansion(mut self) -> Self {
        self.skip_expansion = true;
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn reading_titles_directly(mut self, selector: impl Into<String>) -> Self {
        self.direct_titles = true;
        self.with_selector(selector)
    }

    fn matches(&self, url: &str) -> bool {
        !self.url_contains.is_empty() && url.contains(&self.url_contains)
    }
}

/// How a page will be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteProfile {
    /// Look for hubs, then survey and classify.
    GenericIndex,
    /// A hub's listing page: survey and classify, never look for hubs.
    GenericDetail,
    KnownOverride { rule: OverrideRule, phase: Phase },
}

impl SiteProfile {
    pub fn phase(&self) -> Phase {
        match self {
            SiteProfile::GenericIndex => Phase::Index,
            SiteProfile::GenericDetail => Phase::Detail,
            SiteProfile::KnownOverride { phase, .. } => *phase,
        }
    }

    /// Whether hub links should be looked for on this page.
    pub fn finds_hubs(&self) -> bool {
        match self {
            SiteProfile::GenericIndex => true,
            SiteProfile::GenericDetail => false,
            SiteProfile::KnownOverride { rule, phase } => {
                *phase == Phase::Index && !rule.skip_hubs
            }
        }
    }

    /// Whether "view jobs" controls are clicked while surveying.
    pub fn expands(&self) -> bool {
        match self {
            SiteProfile::KnownOverride { rule, .. } => !rule.skip_expansion,
            _ => true,
        }
    }

    /// A title selector that replaces the classifier.
    pub fn fixed_selector(&self) -> Option<&str> {
        match self {
            SiteProfile::KnownOverride { rule, .. } if !rule.direct_titles => {
                rule.selector.as_deref()
            }
            _ => None,
        }
    }

    /// Selector for direct-title mode.
    pub fn direct_titles(&self) -> Option<&str> {
        match self {
            SiteProfile::KnownOverride { rule, .. } if rule.direct_titles => {
                rule.selector.as_deref()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfiles {
    rules: Vec<OverrideRule>,
}

impl SiteProfiles {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    /// The overrides the scanner ships with.
    pub fn builtin() -> Self {
        Self::new(vec![
            OverrideRule::new("kellogg", "kelloggcareers").skipping_hubs(),
            OverrideRule::new("fixify", "fixify").skipping_hubs(),
            OverrideRule::new("tellent", "tellent").skipping_expansion(),
            OverrideRule::new("radiflow", "radiflow").with_selector("a"),
            OverrideRule::new("atakama", "atakama").with_selector(
                ".wp-block-group.wow.fadeIn.is-layout-constrained.wp-container-core-group-is-layout-c9f28598.wp-block-group-is-layout-constrained > h3",
            ),
            OverrideRule::new("pomvom", "pomvom")
                .reading_titles_directly("div.target-job-title.text-xl.font-semibold"),
        ])
    }

    /// Load a rule table from a JSON file: `{"rules": [...]}`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read site profiles from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid site profiles in {}", path.display()))
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    /// Pick the profile for a page. The first rule matching either URL wins.
    pub fn resolve(&self, requested_url: &str, current_url: &str, phase: Phase) -> SiteProfile {
        let rule = self
            .rules
            .iter()
            .find(|r| r.matches(requested_url) || r.matches(current_url));

        match (rule, phase) {
            (Some(rule), phase) => SiteProfile::KnownOverride {
                rule: rule.clone(),
                phase,
            },
            (None, Phase::Index) => SiteProfile::GenericIndex,
            (None, Phase::Detail) => SiteProfile::GenericDetail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sites_are_generic() {
        let profiles = SiteProfiles::builtin();
        assert_eq!(
            profiles.resolve("https://acme.io/careers", "https://acme.io/careers", Phase::Index),
            SiteProfile::GenericIndex
        );
        assert_eq!(
            profiles.resolve("https://acme.io/jobs", "https://acme.io/jobs", Phase::Detail),
            SiteProfile::GenericDetail
        );
    }

    #[test]
    fn override_matches_redirected_url() {
        let profiles = SiteProfiles::builtin();
        let profile = profiles.resolve(
            "https://acme.io/careers",
            "https://boards.radiflow.com/jobs",
            Phase::Index,
        );
        assert_eq!(profile.fixed_selector(), Some("a"));
        assert!(profile.finds_hubs());
        assert!(profile.direct_titles().is_none());
    }

    #[test]
    fn hub_skipping_and_expansion_flags() {
        let profiles = SiteProfiles::builtin();
        let kellogg = profiles.resolve("https://kelloggcareers.com", "", Phase::Index);
        assert!(!kellogg.finds_hubs());
        assert!(kellogg.expands());

        let tellent = profiles.resolve("https://x.tellent.com", "", Phase::Index);
        assert!(tellent.finds_hubs());
        assert!(!tellent.expands());
    }

    #[test]
    fn direct_title_rule_has_no_fixed_selector() {
        let profile = SiteProfiles::builtin().resolve("https://pomvom.com/careers", "", Phase::Index);
        assert_eq!(
            profile.direct_titles(),
            Some("div.target-job-title.text-xl.font-semibold")
        );
        assert_eq!(profile.fixed_selector(), None);
    }

    #[test]
    fn detail_phase_never_finds_hubs() {
        let profile =
            SiteProfiles::builtin().resolve("https://radiflow.com/jobs", "", Phase::Detail);
        assert!(!profile.finds_hubs());
    }

    #[test]
    fn loads_rules_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"{"rules":[{"name":"acme","url_contains":"acme.io","selector":"h2.title"}]}"#,
        )
        .unwrap();

        let profiles = SiteProfiles::from_file(&path).unwrap();
        assert_eq!(profiles.rules().len(), 1);
        let profile = profiles.resolve("https://acme.io/careers", "", Phase::Index);
        assert_eq!(profile.fixed_selector(), Some("h2.title"));
        assert!(profile.expands());
    }
}
