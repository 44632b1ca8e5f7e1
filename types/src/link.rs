//! Verification link token.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// Random token identifying one verification attempt.
///
/// Freshly generated links are 40 lowercase hex characters (20 bytes of
/// entropy). Links arriving from the outside only have to be URL-path safe:
/// 1 to [`VerificationLink::MAX_LEN`] characters of `[A-Za-z0-9_-]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VerificationLink(String);

impl VerificationLink {
    /// Upper bound on accepted link length.
    pub const MAX_LEN: usize = 128;

    /// Parse a link received from a URL path or request body.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypeError> {
        let s = raw.into();
        if s.is_empty() {
            return Err(TypeError::EmptyLink);
        }
        if s.len() > Self::MAX_LEN {
            return Err(TypeError::LinkTooLong { max: Self::MAX_LEN });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(TypeError::InvalidLinkChar(c));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for VerificationLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VerificationLink {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<VerificationLink> for String {
    fn from(link: VerificationLink) -> Self {
        link.0
    }
}
