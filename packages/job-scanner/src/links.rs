//! Link normalization and tolerant link identity.
//!
//! Scraped hrefs and LLM-echoed links for the same posting routinely differ
//! in trailing slashes, tracking parameters, or host prefixes. Identity is
//! therefore substring containment on fragment-free links, not equality.

use url::Url;

/// Canonicalize an href found on `base_url`.
///
/// Strips the fragment. Relative hrefs are resolved against the base URL;
/// absolute ones are otherwise returned untouched. An href that starts with
/// the base URL's host but has no scheme gets `https://`.
pub fn normalize(href: &str, base_url: &str) -> String {
    let href = strip_fragment(href.trim());
    if href.is_empty() || Url::parse(href).is_ok() {
        return href.to_string();
    }
    if starts_with_host(href, base_url) {
        return format!("https://{href}");
    }

    match Url::parse(base_url.trim()).and_then(|base| base.join(href)) {
        Ok(mut resolved) => {
            resolved.set_fragment(None);
            resolved.to_string()
        }
        Err(_) => href.to_string(),
    }
}

/// Whether `href` begins with the host of `base_url`, with or without `www.`.
fn starts_with_host(href: &str, base_url: &str) -> bool {
    let Some(host) = host_of(base_url) else {
        return false;
    };
    let bare = host.trim_start_matches("www.");
    let href = href.to_ascii_lowercase();
    let rest = href
        .strip_prefix("www.")
        .unwrap_or(&href)
        .strip_prefix(bare);
    matches!(rest, Some(rest) if rest.is_empty() || rest.starts_with(['/', '?', ':']))
}

/// Everything before the first `#`.
pub fn strip_fragment(link: &str) -> &str {
    match link.find('#') {
        Some(idx) => &link[..idx],
        None => link,
    }
}

/// Key for exact roster identity: fragment-free, trimmed, without a
/// trailing slash.
pub fn canonical(link: &str) -> String {
    strip_fragment(link.trim()).trim_end_matches('/').to_string()
}

/// Two links denote the same posting if one contains the other.
///
/// Empty links never match anything.
pub fn same_posting(a: &str, b: &str) -> bool {
    let a = strip_fragment(a.trim());
    let b = strip_fragment(b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(b) || b.contains(a)
}

/// Whether `href` matches any of the known links.
pub fn is_known(known: &[String], href: &str) -> bool {
    known.iter().any(|link| same_posting(link, href))
}

/// Known links that match none of the fresh hrefs.
pub fn removed_links<'a, I>(known: &[String], fresh: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let fresh = fresh.into_iter();
    known
        .iter()
        .filter(|link| !link.trim().is_empty())
        .filter(|link| !fresh.clone().any(|href| same_posting(link, href)))
        .cloned()
        .collect()
}

/// Query parameter that marks a link built by [`element_link`].
const ELEMENT_PARAM: &str = "job-title";

/// Link for an element with no discoverable href: the page it sits on,
/// tagged with the element's title and position. Each element gets its own
/// link, and an unchanged page yields the same links on every scan.
///
/// The position is zero-padded and last, so no element link contains
/// another one from the same page.
pub fn element_link(page_url: &str, text: &str, position: usize) -> String {
    let page = strip_fragment(page_url.trim());
    let sep = if page.contains('?') { '&' } else { '?' };
    format!("{page}{sep}{ELEMENT_PARAM}={}&pos={position:04}", slug(text))
}

/// Whether `href` was built by [`element_link`].
pub fn is_element_link(href: &str) -> bool {
    href.contains(&format!("{ELEMENT_PARAM}="))
}

fn slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Whether an href can be used as a URL without joining it to a host.
pub fn looks_absolute(href: &str) -> bool {
    href.contains("http")
}

/// Host of a URL, or `None` when it does not parse.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}
