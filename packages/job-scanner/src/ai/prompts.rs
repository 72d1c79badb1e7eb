//! Prompt templates.

/// Ask which text group holds job titles. `groups` is the serialized
/// group listing produced by the classifier.
pub fn structure_prompt(groups: &str) -> String {
    format!(
        r#"You are given multiple groups of text content from a job listing page, grouped by the HTML class name or tag name they come from.

Each group looks like this:

{groups}

Among these, which class name or tag name contains the group of texts that are mostly like job titles? Only respond with the class name or tag name as a JSON string array.
If no group looks like job titles, output an empty array []."#
    )
}

/// Extraction prompt for hrefs that still need the site host.
pub fn combine_links_prompt(lines: &str, host: &str) -> String {
    format!(
        r#"Below is data related to job postings with the format (content — href).
"{lines}"

If the data is empty or contains no rows related to jobs, return an empty array [].

Extract all job postings in JSON format with the following fields:
- title: Extracted from the content
- company: Extracted from the href (if available)
- link: A valid, full URL built from the href and {host}.

Output in the following JSON format:
[
  {{
    "title": "Job Title",
    "company": "Company Name",
    "link": "Full Job Posting URL"
  }}
]"#
    )
}

/// Extraction prompt for hrefs that are already usable as-is.
pub fn verbatim_links_prompt(lines: &str, host: &str) -> String {
    format!(
        r#"Below is data related to job postings with the format (content — href).
"{lines}"

If the data is empty or contains no job-related rows, return an empty array [].

Extract all job postings in JSON format with the following fields:

- title: Extracted from the content
- company: Extracted from the href text if it contains the company name; otherwise leave as an empty string.
- link: **Use the href EXACTLY as provided in the input. DO NOT modify it, DO NOT prepend {host}, and DO NOT transform it.**

Important rules:
- Do NOT combine href with {host}.
- Do NOT generate or guess URLs.
- Do NOT rewrite or complete the href. Use it exactly as-is.
- Only output JSON.

Output format:
[
  {{
    "title": "Job Title",
    "company": "Company Name",
    "link": "Exact href provided"
  }}
]"#
    )
}

/// Pick the careers page for a domain out of web search results.
pub fn careers_url_prompt(domain: &str, candidates: &[(String, String)]) -> String {
    let listing = candidates
        .iter()
        .map(|(title, link)| format!("- {title}: {link}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"A user is looking for the most direct job listings page on this company's website ({domain}).
Here are candidate URLs from a Google search:

{listing}

Return only the single best URL that:
- Lists all current job openings
- Links each job to a detail/apply page
- Do not explain or add text, only return the URL.
- Please attach https:// to the URL if it is not already included"#
    )
}

/// Default instruction for the relevance classifier.
pub const DEFAULT_RELEVANCE_PROMPT: &str = "Analyze the following job posting. Does it describe a technical position like Software, Architect, Developer, QA, AQA, or DevOps, programming, IT, data science, engineering, deploying, or Telecommunication similar technical skills including technical leader, IT Helpdesk? If yes, return a short explanation; if not, respond with \"No match\". Enterprise Account Manager, Business Development Representative are not technical.";

/// User message for the relevance classifier.
pub fn relevance_input(title: &str, company: &str, description: &str) -> String {
    let company = if company.trim().is_empty() {
        "Not specified"
    } else {
        company
    };
    format!("Job Title: {title}\nCompany: {company}\nJob Description: {description}")
}
