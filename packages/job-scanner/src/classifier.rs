//! Structure inference: which text group on a page holds job titles.

use std::sync::Arc;

use crate::ai::parse::{parse_json_array, ArrayReply};
use crate::ai::prompts::structure_prompt;
use crate::ai::{BaseAI, CompletionRequest};
use crate::config::ScanPolicy;
use crate::harvester::GroupMap;

pub struct StructureClassifier {
    ai: Arc<dyn BaseAI>,
    model: String,
    policy: ScanPolicy,
}

impl StructureClassifier {
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

    /// Group keys predicted to contain job titles.
    ///
    /// Never fails: a failed call or an unreadable answer is an empty list,
    /// which the caller treats as "no jobs on this page".
    pub async fn classify(&self, groups: &GroupMap) -> Vec<String> {
        if groups.is_empty() {
            return Vec::new();
        }

        let serialized = serialize_groups(
            groups,
            self.policy.samples_per_group,
            self.policy.structure_budget_chars,
        );
        let request = CompletionRequest::new(&self.model, structure_prompt(&serialized))
            .with_temperature(0.2);

        let raw = match self.ai.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Structure classification call failed");
                return Vec::new();
            }
        };

        match parse_json_array::<String>(&raw) {
            ArrayReply::Items(keys) => {
                let keys: Vec<String> = keys
                    .into_iter()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
                tracing::debug!(?keys, "Predicted title groups");
                keys
            }
            ArrayReply::Missing => {
                tracing::warn!(response = %raw, "Classifier returned no array");
                Vec::new()
            }
            ArrayReply::Malformed(e) => {
                tracing::warn!(error = %e, response = %raw, "Could not parse classifier response");
                Vec::new()
            }
        }
    }
}

/// Render groups for the prompt: one numbered block per key with up to
/// `samples` texts, truncated to `budget` characters.
pub fn serialize_groups(groups: &GroupMap, samples: usize, budget: usize) -> String {
    let blocks: Vec<String> = groups
        .iter()
        .enumerate()
        .map(|(i, (key, elements))| {
            let mut block = format!("{}. Class: \"{}\"", i + 1, key);
            for element in elements.iter().take(samples) {
                block.push_str(&format!("\n   - \"{}\"", element.text));
            }
            block
        })
        .collect();

    truncate_chars(&blocks.join("\n\n"), budget)
}

/// The first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Join predicted keys into one CSS selector list.
pub fn selector_for(keys: &[String]) -> String {
    keys.join(",")
}
