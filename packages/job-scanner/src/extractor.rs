//! LLM-assisted posting extraction.
//!
//! Harvested candidates are loose `{text, href}` pairs. The extractor asks a
//! model to turn them into `{title, company, link}` postings. When the hrefs
//! are already absolute, the model is told to copy them verbatim and its
//! output is held to that: every returned link must be one of the offered
//! hrefs.

use serde::Deserialize;
use std::sync::Arc;

use crate::ai::parse::{parse_json_array, ArrayReply};
use crate::ai::prompts::{combine_links_prompt, verbatim_links_prompt};
use crate::ai::{BaseAI, CompletionRequest};
use crate::classifier::truncate_chars;
use crate::config::ScanPolicy;
use crate::harvester::Anchor;
use crate::links;
use crate::types::Posting;

/// How the model should treat hrefs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Hrefs are relative; build full URLs with the site host.
    Combine,
    /// Hrefs are usable as-is; copy them exactly.
    Verbatim,
}

impl LinkMode {
    /// Decided by the first href found on the page; element links stand in
    /// for missing hrefs and do not count.
    pub fn for_anchors(anchors: &[Anchor]) -> Self {
        match anchors.iter().find(|a| !links::is_element_link(&a.href)) {
            Some(anchor) if !links::looks_absolute(&anchor.href) => LinkMode::Combine,
            _ => LinkMode::Verbatim,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Postings(Vec<Posting>),
    /// The call failed or its answer could not be read.
    Unparseable,
}

#[derive(Debug, Deserialize)]
struct ExtractedPosting {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

pub struct PostingExtractor {
    ai: Arc<dyn BaseAI>,
    model: String,
    policy: ScanPolicy,
}

impl PostingExtractor {
    pub fn new(ai: Arc<dyn BaseAI>, model: impl Into<String>) -> Self {
        Self {
            ai,
            model: model.into(),
            policy: ScanPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ScanPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Extract postings from `fresh` candidates found on `page_url`.
    pub async fn extract(&self, fresh: &[Anchor], mode: LinkMode, page_url: &str) -> Extraction {
        if fresh.is_empty() {
            return Extraction::Postings(Vec::new());
        }

        let (lines, offered) = candidate_lines(fresh);
        let lines = truncate_chars(&lines, self.policy.extraction_budget_chars);
        let host = links::host_of(page_url).unwrap_or_else(|| page_url.to_string());

        let prompt = match mode {
            LinkMode::Combine => combine_links_prompt(&lines, &host),
            LinkMode::Verbatim => verbatim_links_prompt(&lines, &host),
        };
        let request = CompletionRequest::new(&self.model, prompt).with_temperature(0.0);

        let raw = match self.ai.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(url = page_url, error = %e, "Extraction call failed");
                return Extraction::Unparseable;
            }
        };

        let extracted = match parse_json_array::<ExtractedPosting>(&raw) {
            ArrayReply::Items(items) => items,
            ArrayReply::Missing => {
                tracing::info!(url = page_url, "Extraction returned no array");
                Vec::new()
            }
            ArrayReply::Malformed(e) => {
                tracing::warn!(url = page_url, error = %e, "Could not parse extraction response");
                return Extraction::Unparseable;
            }
        };

        let postings: Vec<Posting> = extracted
            .into_iter()
            .filter_map(|item| {
                let link = item.link.unwrap_or_default();
                let link = match mode {
                    LinkMode::Verbatim => match_offered(&link, &offered)?,
                    LinkMode::Combine => links::normalize(&link, page_url),
                };
                if link.is_empty() || item.title.trim().is_empty() {
                    return None;
                }
                Some(
                    Posting::new(item.title.trim(), link)
                        .with_company(item.company.unwrap_or_default().trim()),
                )
            })
            .collect();

        tracing::debug!(url = page_url, count = postings.len(), ?mode, "Extracted postings");
        Extraction::Postings(postings)
    }
}

/// `text — href` lines for the prompt, plus the hrefs they offer.
pub fn candidate_lines(anchors: &[Anchor]) -> (String, Vec<String>) {
    let lines: Vec<String> = anchors
        .iter()
        .map(|a| format!("{} — {}", a.text, a.href))
        .collect();
    let offered = anchors.iter().map(|a| a.href.clone()).collect();
    (lines.join("\n"), offered)
}

/// The offered href `link` stands for: an exact copy, or failing that one
/// it overlaps with. `None` for links the model made up.
fn match_offered(link: &str, offered: &[String]) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    if let Some(exact) = offered.iter().find(|href| href.as_str() == link) {
        return Some(exact.clone());
    }
    match offered.iter().find(|href| links::same_posting(href, link)) {
        Some(href) => Some(href.clone()),
        None => {
            tracing::debug!(link, "Dropping link not present in the input");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAI;

    #[test]
    fn mode_follows_first_href() {
        assert_eq!(
            LinkMode::for_anchors(&[Anchor::new("Dev", "/jobs/1")]),
            LinkMode::Combine
        );
        assert_eq!(
            LinkMode::for_anchors(&[Anchor::new("Dev", "https://a.com/jobs/1")]),
            LinkMode::Verbatim
        );
    }

    #[test]
    fn element_links_do_not_decide_the_mode() {
        let anchors = [
            Anchor::new("Dev", links::element_link("https://a.com/careers", "Dev", 0)),
            Anchor::new("QA", "/jobs/qa"),
        ];
        assert_eq!(LinkMode::for_anchors(&anchors), LinkMode::Combine);
        assert_eq!(LinkMode::for_anchors(&anchors[..1]), LinkMode::Verbatim);
    }

    #[test]
    fn every_element_offers_its_own_link() {
        let backend = links::element_link("https://a.com/careers", "Backend Engineer", 0);
        let qa = links::element_link("https://a.com/careers", "QA Engineer", 1);
        let (lines, offered) = candidate_lines(&[
            Anchor::new("Backend Engineer", backend.clone()),
            Anchor::new("QA Engineer", qa.clone()),
        ]);
        assert_eq!(
            lines,
            format!("Backend Engineer — {backend}\nQA Engineer — {qa}")
        );
        assert_eq!(offered, vec![backend, qa]);
    }

    #[tokio::test]
    async fn combine_mode_resolves_relative_links() {
        let ai = Arc::new(MockAI::new().with_default_response(
            r#"[{"title":"Dev","company":"","link":"/jobs/1"}]"#,
        ));
        let extractor = PostingExtractor::new(ai, "gpt-4o");

        let result = extractor
            .extract(
                &[Anchor::new("Dev", "/jobs/1")],
                LinkMode::Combine,
                "https://a.com/careers",
            )
            .await;

        assert_eq!(
            result,
            Extraction::Postings(vec![Posting::new("Dev", "https://a.com/jobs/1")])
        );
    }

    #[tokio::test]
    async fn combine_mode_adds_a_scheme_to_host_links() {
        let ai = Arc::new(MockAI::new().with_default_response(
            r#"[{"title":"Dev","company":"","link":"acme.io/jobs/1"}]"#,
        ));
        let extractor = PostingExtractor::new(ai, "gpt-4o");

        let result = extractor
            .extract(
                &[Anchor::new("Dev", "/jobs/1")],
                LinkMode::Combine,
                "https://acme.io/careers",
            )
            .await;

        assert_eq!(
            result,
            Extraction::Postings(vec![Posting::new("Dev", "https://acme.io/jobs/1")])
        );
    }

    #[tokio::test]
    async fn verbatim_mode_drops_invented_links() {
        let ai = Arc::new(MockAI::new().with_default_response(
            r#"[{"title":"Dev","link":"https://other.com/made-up"}]"#,
        ));
        let extractor = PostingExtractor::new(ai, "gpt-4o");

        let result = extractor
            .extract(
                &[Anchor::new("Dev", "https://a.com/jobs/1")],
                LinkMode::Verbatim,
                "https://a.com/careers",
            )
            .await;

        assert_eq!(result, Extraction::Postings(Vec::new()));
    }

    #[tokio::test]
    async fn malformed_answer_is_unparseable() {
        let ai = Arc::new(MockAI::new().with_default_response("[{\"title\": \"Dev\", ]"));
        let extractor = PostingExtractor::new(ai, "gpt-4o");

        let result = extractor
            .extract(
                &[Anchor::new("Dev", "/jobs/1")],
                LinkMode::Combine,
                "https://a.com/careers",
            )
            .await;

        assert_eq!(result, Extraction::Unparseable);
    }

    #[tokio::test]
    async fn nothing_fresh_skips_the_call() {
        let ai = Arc::new(MockAI::new());
        let extractor = PostingExtractor::new(ai.clone(), "gpt-4o");

        let result = extractor
            .extract(&[], LinkMode::Verbatim, "https://a.com/careers")
            .await;

        assert_eq!(result, Extraction::Postings(Vec::new()));
        assert_eq!(ai.call_count(), 0);
    }
}
