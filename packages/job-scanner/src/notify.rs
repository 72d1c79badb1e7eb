//! New-posting digests and their delivery.

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::types::TrackedJob;

/// Delivers a rendered digest to a distribution list.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(
        &self,
        recipients: &[String],
        subject: &str,
        html: &str,
    ) -> Result<(), NotifyError>;
}

/// Writes digests to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(
        &self,
        recipients: &[String],
        subject: &str,
        html: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            recipients = ?recipients,
            subject,
            bytes = html.len(),
            "Digest ready for delivery"
        );
        Ok(())
    }
}

/// Recently found jobs of one company, split by source.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDigest {
    pub name: String,
    pub website_jobs: Vec<TrackedJob>,
    pub linkedin_jobs: Vec<TrackedJob>,
}

impl CompanyDigest {
    pub fn total(&self) -> usize {
        self.website_jobs.len() + self.linkedin_jobs.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Digest {
    pub companies: Vec<CompanyDigest>,
}

impl Digest {
    pub fn total(&self) -> usize {
        self.companies.iter().map(CompanyDigest::total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn subject(&self) -> &'static str {
        if self.total() > 1 {
            "New positions found for monitored customers"
        } else {
            "New position found for monitored customers"
        }
    }
}

pub fn render_digest(digest: &Digest) -> String {
    let mut html = String::new();
    for company in digest.companies.iter().filter(|c| c.total() > 0) {
        let total = company.total();
        html.push_str(&format!(
            "<h1 style='font-size: 30px; margin-bottom: 20px;'>{} - {} {}</h1>",
            escape(&company.name),
            total,
            if total > 1 { "new positions" } else { "new position" }
        ));
        render_section(&mut html, "Website Jobs", "#f0f8ff", "#0066cc", &company.website_jobs);
        render_section(&mut html, "LinkedIn Jobs", "#f0f7ff", "#0077b5", &company.linkedin_jobs);
    }
    html
}

fn render_section(html: &mut String, heading: &str, background: &str, accent: &str, jobs: &[TrackedJob]) {
    if jobs.is_empty() {
        return;
    }
    html.push_str(&format!(
        "<div style='margin-bottom: 30px; padding: 15px; background-color: {background}; border-left: 4px solid {accent};'>"
    ));
    html.push_str(&format!(
        "<h2 style='font-size: 24px; margin: 0 0 15px 0; color: {accent};'>{heading} ({})</h2>",
        jobs.len()
    ));
    for (i, job) in jobs.iter().enumerate() {
        html.push_str(&format!(
            "<div style=\"display: flex; align-items: center; margin-bottom: 10px; padding: 10px; background-color: white; border-radius: 5px;\">\
             <p style='font-size: 18px; margin: 0 20px 0 0; font-weight: bold; color: #333;'>{}.</p>\
             <p style='font-size: 18px; margin: 0 20px 0 0; color: #333; flex: 1;'>{}</p>\
             <a href='{}' style='font-size: 16px; color: {accent}; text-decoration: none;' target='_blank'>View Job →</a>\
             </div>",
            i + 1,
            escape(&job.title),
            escape(&job.link),
        ));
    }
    html.push_str("</div>");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

/// Render and deliver `digest`. Returns whether anything was sent.
/// Delivery failures are logged, never returned.
pub async fn send_digest(notifier: &dyn Notifier, recipients: &[String], digest: &Digest) -> bool {
    if digest.is_empty() {
        tracing::debug!("No new postings, skipping digest");
        return false;
    }
    if recipients.is_empty() {
        tracing::warn!(postings = digest.total(), "Digest has no recipients");
        return false;
    }

    let html = render_digest(digest);
    match notifier.deliver(recipients, digest.subject(), &html).await {
        Ok(()) => {
            tracing::info!(postings = digest.total(), "Digest delivered");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Digest delivery failed");
            false
        }
    }
}
