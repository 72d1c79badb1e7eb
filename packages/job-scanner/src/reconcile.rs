//! Roster reconciliation.
//!
//! `new roster = (prior - removed) + newly discovered`. Prior jobs keep
//! their `id` and `found` untouched. Removal only touches jobs of the
//! sources scanned in this run. New postings without a link, or whose link
//! is already in the roster, are dropped.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::links::canonical;
use crate::types::{Posting, ScanType, TrackedJob};

/// What a merge will do, before new jobs get their ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    /// Prior jobs that stay, in their original order.
    pub kept: Vec<TrackedJob>,
    /// Postings to add, deduplicated against `kept` and each other.
    pub additions: Vec<Posting>,
    /// Links of prior jobs that were dropped.
    pub removed: Vec<String>,
}

impl MergePlan {
    /// The final roster: kept jobs followed by the newly minted ones.
    pub fn finish(self, minted: Vec<TrackedJob>) -> Vec<TrackedJob> {
        let mut roster = self.kept;
        roster.extend(minted);
        roster
    }
}

/// Plan the merge of a scan into `prior`.
///
/// `removed` is matched exactly (after [`canonical`]) against stored links,
/// and only for jobs whose source is in `scanned`.
pub fn plan(
    prior: &[TrackedJob],
    scanned: &[ScanType],
    removed: &[String],
    fresh: Vec<Posting>,
) -> MergePlan {
    let removed_keys: HashSet<String> = removed
        .iter()
        .map(|l| canonical(l))
        .filter(|k| !k.is_empty())
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut plan = MergePlan::default();

    for job in prior {
        let key = canonical(&job.link);
        if scanned.contains(&job.source()) && removed_keys.contains(&key) {
            plan.removed.push(job.link.clone());
            continue;
        }
        if !key.is_empty() && !seen.insert(key) {
            tracing::warn!(link = %job.link, "Dropping duplicate roster entry");
            continue;
        }
        plan.kept.push(job.clone());
    }

    for posting in fresh {
        if !posting.has_link() {
            tracing::debug!(title = %posting.title, "Discarding posting without a link");
            continue;
        }
        if seen.insert(canonical(&posting.link)) {
            plan.additions.push(posting);
        }
    }

    plan
}

/// Give a newly discovered posting its identity. This is the only place
/// job ids are created.
pub fn mint(posting: Posting, description: String, found: DateTime<Utc>) -> TrackedJob {
    TrackedJob {
        id: Uuid::new_v4().simple().to_string(),
        title: posting.title,
        description,
        link: posting.link.trim().to_string(),
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tracked(id: &str, link: &str) -> TrackedJob {
        TrackedJob {
            id: id.to_string(),
            title: format!("Job {id}"),
            description: String::new(),
            link: link.to_string(),
            found: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn removal_is_scoped_to_scanned_sources() {
        let prior = vec![
            tracked("1", "https://a.com/job/1"),
            tracked("2", "https://www.linkedin.com/jobs/view/2"),
        ];
        let removed = vec![
            "https://a.com/job/1".to_string(),
            "https://www.linkedin.com/jobs/view/2".to_string(),
        ];

        let plan = plan(&prior, &[ScanType::Website], &removed, Vec::new());

        assert_eq!(plan.kept, vec![prior[1].clone()]);
        assert_eq!(plan.removed, vec!["https://a.com/job/1".to_string()]);
    }

    #[test]
    fn removal_is_exact_not_substring() {
        let prior = vec![tracked("1", "https://a.com/job/10")];
        let plan = plan(
            &prior,
            &[ScanType::Website],
            &["https://a.com/job/1".to_string()],
            Vec::new(),
        );
        assert_eq!(plan.kept.len(), 1);
        assert!(plan.removed.is_empty());
    }

    #[test]
    fn additions_skip_known_links_duplicates_and_linkless_postings() {
        let prior = vec![tracked("1", "https://a.com/job/1")];
        let fresh = vec![
            Posting::new("Same", "https://a.com/job/1/"),
            Posting::new("New", "https://a.com/job/2"),
            Posting::new("New again", "https://a.com/job/2#apply"),
            Posting::new("No link", "  "),
        ];

        let plan = plan(&prior, &[ScanType::Website], &[], fresh);

        assert_eq!(plan.additions, vec![Posting::new("New", "https://a.com/job/2")]);
    }

    #[test]
    fn finish_appends_minted_jobs_after_kept() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let prior = vec![tracked("1", "https://a.com/job/1")];
        let plan = plan(
            &prior,
            &[ScanType::Website],
            &[],
            vec![Posting::new("Dev", "https://a.com/job/2")],
        );

        let minted: Vec<TrackedJob> = plan
            .additions
            .clone()
            .into_iter()
            .map(|p| mint(p, "verdict".to_string(), now))
            .collect();
        let roster = plan.finish(minted);

        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0], prior[0]);
        assert_eq!(roster[1].link, "https://a.com/job/2");
        assert_eq!(roster[1].found, now);
        assert_eq!(roster[1].description, "verdict");
        assert_eq!(roster[1].id.len(), 32);
    }

    #[test]
    fn minted_ids_are_unique() {
        let now = Utc::now();
        let a = mint(Posting::new("A", "https://a.com/1"), String::new(), now);
        let b = mint(Posting::new("A", "https://a.com/1"), String::new(), now);
        assert_ne!(a.id, b.id);
    }
}
