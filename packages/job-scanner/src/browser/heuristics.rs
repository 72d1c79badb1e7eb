//! Lexical heuristics over control text.

use lazy_static::lazy_static;
use regex::Regex;

const JOB_KEYWORDS: &[&str] = &[
    "position",
    "open position",
    "job",
    "open job",
    "opening",
    "role",
    "open role",
];

const NAVIGATION_VERBS: &[&str] = &["view", "explore", "see", "find", "search"];

/// Words on controls that usually lead to a posting's own page.
pub const APPLY_KEYWORDS: &[&str] = &["apply", "more", "view job", "submit", "view featured job"];

/// Highest number treated as a pagination control.
const MAX_PAGE_NUMBER: u32 = 20;

lazy_static! {
    static ref COUNTED_JOBS: Regex = Regex::new(
        r"(?i)\b\d+\s+(position|open position|job|open job|opening|role|open role)s?\b"
    )
    .unwrap();
    static ref DIGITS: Regex = Regex::new(r"^\d+$").unwrap();
}

/// "12 open positions", "View all jobs", "Explore roles"...
///
/// Either a count followed by a job keyword, or any navigation verb together
/// with any job keyword. `text` is expected lowercased.
pub fn is_view_jobs(text: &str) -> bool {
    if COUNTED_JOBS.is_match(text) {
        return true;
    }
    NAVIGATION_VERBS.iter().any(|v| text.contains(v))
        && JOB_KEYWORDS.iter().any(|k| text.contains(k))
}

/// A bare page number below the pagination cap.
pub fn is_page_number(text: &str) -> bool {
    DIGITS.is_match(text)
        && text
            .parse::<u32>()
            .map(|n| n < MAX_PAGE_NUMBER)
            .unwrap_or(false)
}

/// Keywords an ancestor control must contain to be followed.
pub fn probe_keywords(title: Option<&str>) -> Vec<String> {
    let mut keywords: Vec<String> = APPLY_KEYWORDS.iter().map(|k| k.to_string()).collect();
    if let Some(title) = title {
        let title = title.trim().to_lowercase();
        if !title.is_empty() {
            keywords.push(title);
        }
    }
    keywords
}

pub fn matches_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}
