//! Strongly-typed identifiers used across the pipeline.
//!
//! All identifiers arrive as text (spreadsheet exports, YAML lists), so they
//! are trimmed string newtypes rather than numeric ids.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Stable identity of a recipient (their e-mail address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientKey(String);

/// Sleeper league identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeagueId(String);

/// Roster slot inside a league.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

/// Sleeper user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

macro_rules! impl_text_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Build the identifier from raw text.
            ///
            /// Surrounding whitespace is stripped; blank input and the literal
            /// `None` (as written by spreadsheet exports) are rejected.
            pub fn parse(raw: impl AsRef<str>) -> Result<Self, CoreError> {
                let trimmed = raw.as_ref().trim();
                if trimmed.is_empty() || trimmed == "None" {
                    return Err(CoreError::malformed(format!("{} is blank", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Like [`Self::parse`], but maps blank input to `None`.
            pub fn parse_optional(raw: Option<&str>) -> Option<Self> {
                raw.and_then(|r| Self::parse(r).ok())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_text_newtype!(RecipientKey, "RecipientKey");
impl_text_newtype!(LeagueId, "LeagueId");
impl_text_newtype!(TeamId, "TeamId");
impl_text_newtype!(UserId, "UserId");

impl RecipientKey {
    /// Log-safe rendering of the key.
    ///
    /// Keeps the first and last two characters of the local part, e.g.
    /// `jo***oe@example.com`. Keys without an `@` are masked the same way.
    pub fn censored(&self) -> String {
        let (local, domain) = match self.0.split_once('@') {
            Some((local, domain)) => (local, Some(domain)),
            None => (self.0.as_str(), None),
        };
        let chars: Vec<char> = local.chars().collect();
        let head: String = chars.iter().take(2).collect();
        let tail: String = chars[chars.len().saturating_sub(2)..].iter().collect();
        match domain {
            Some(domain) => format!("{head}***{tail}@{domain}"),
            None => format!("{head}***{tail}"),
        }
    }
}
