//! URLs the gate hands out, all rooted at the public base URL.

use reval_types::VerificationLink;

use crate::GateError;

/// Builds member-facing and protocol-facing URLs for a link.
#[derive(Clone, Debug)]
pub struct LinkBuilder {
    base_url: String,
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The status page the member opens: `<base>/<link>`.
    pub fn page_url(&self, link: &VerificationLink) -> String {
        format!("{}/{}", self.base_url, link)
    }

    /// Where the proof flow returns; `{sessionId}` is filled in by the
    /// proof service.
    pub fn redirect_url(&self, link: &VerificationLink) -> String {
        format!("{}/{}?sessionId={{sessionId}}", self.base_url, link)
    }

    pub fn callback_url(&self, link: &VerificationLink) -> String {
        format!("{}/api/callback/{}", self.base_url, link)
    }

    pub fn webhook_url(&self) -> String {
        format!("{}/api/bot", self.base_url)
    }
}

/// Parse an externally supplied link. Malformed links can never exist in
/// the store, so they are reported as not found.
pub fn parse_link(raw: &str) -> Result<VerificationLink, GateError> {
    VerificationLink::parse(raw).map_err(|_| GateError::NotFound(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_share_the_base() {
        let links = LinkBuilder::new("https://gate.example/");
        let link = VerificationLink::parse("abc123").unwrap();
        assert_eq!(links.page_url(&link), "https://gate.example/abc123");
        assert_eq!(
            links.redirect_url(&link),
            "https://gate.example/abc123?sessionId={sessionId}"
        );
        assert_eq!(links.callback_url(&link), "https://gate.example/api/callback/abc123");
        assert_eq!(links.webhook_url(), "https://gate.example/api/bot");
    }

    #[test]
    fn malformed_link_is_not_found() {
        assert!(matches!(parse_link("../etc"), Err(GateError::NotFound(_))));
        assert!(parse_link("abc123").is_ok());
    }
}
