//! IMAP search criteria
//!
//! Callers describe what to fetch with a small JSON object. It is
//! turned into strongly-typed [`SearchKey`]s and rendered to IMAP
//! SEARCH syntax, instead of splicing raw strings together.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

/// A single IMAP search key.
///
/// # Examples
///
/// ```
/// use imap_relay::SearchKey;
///
/// assert_eq!(SearchKey::Unseen.to_string(), "UNSEEN");
/// assert_eq!(
///     SearchKey::From("alice@example.com".to_string()).to_string(),
///     "FROM \"alice@example.com\""
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    All,
    Seen,
    Unseen,
    Flagged,
    Unflagged,
    Answered,
    Unanswered,
    From(String),
    To(String),
    Subject(String),
    Body(String),
    Text(String),
    /// Internal date on or after the given day.
    Since(NaiveDate),
    /// Internal date strictly before the given day.
    Before(NaiveDate),
    /// Caller-supplied search expression, passed through verbatim.
    Raw(String),
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Seen => f.write_str("SEEN"),
            Self::Unseen => f.write_str("UNSEEN"),
            Self::Flagged => f.write_str("FLAGGED"),
            Self::Unflagged => f.write_str("UNFLAGGED"),
            Self::Answered => f.write_str("ANSWERED"),
            Self::Unanswered => f.write_str("UNANSWERED"),
            Self::From(s) => write!(f, "FROM {}", quote(s)),
            Self::To(s) => write!(f, "TO {}", quote(s)),
            Self::Subject(s) => write!(f, "SUBJECT {}", quote(s)),
            Self::Body(s) => write!(f, "BODY {}", quote(s)),
            Self::Text(s) => write!(f, "TEXT {}", quote(s)),
            Self::Since(d) => write!(f, "SINCE {}", d.format("%-d-%b-%Y")),
            Self::Before(d) => write!(f, "BEFORE {}", d.format("%-d-%b-%Y")),
            Self::Raw(s) => f.write_str(s.trim()),
        }
    }
}

/// Render a string as an IMAP quoted string.
fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Search criteria as accepted in a batch request. Every field is
/// optional; an empty object matches all messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCriteria {
    pub seen: Option<bool>,
    pub flagged: Option<bool>,
    pub answered: Option<bool>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub text: Option<String>,
    pub since: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
    /// Raw IMAP search expression appended after the typed keys.
    pub query: Option<String>,
}

impl SearchCriteria {
    /// Reject values containing CR or LF, which would end the SEARCH
    /// command line early.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("from", &self.from),
            ("to", &self.to),
            ("subject", &self.subject),
            ("body", &self.body),
            ("text", &self.text),
            ("query", &self.query),
        ];
        for (name, value) in fields {
            if value.as_deref().is_some_and(|v| v.contains(['\r', '\n'])) {
                return Err(Error::Config(format!(
                    "Search field '{name}' must not contain line breaks"
                )));
            }
        }
        Ok(())
    }

    /// The typed keys this criteria expands to, `ALL` when empty.
    #[must_use]
    pub fn keys(&self) -> Vec<SearchKey> {
        let mut keys = Vec::new();

        if let Some(seen) = self.seen {
            keys.push(if seen { SearchKey::Seen } else { SearchKey::Unseen });
        }
        if let Some(flagged) = self.flagged {
            keys.push(if flagged {
                SearchKey::Flagged
            } else {
                SearchKey::Unflagged
            });
        }
        if let Some(answered) = self.answered {
            keys.push(if answered {
                SearchKey::Answered
            } else {
                SearchKey::Unanswered
            });
        }

        let strings: [(&Option<String>, fn(String) -> SearchKey); 5] = [
            (&self.from, SearchKey::From),
            (&self.to, SearchKey::To),
            (&self.subject, SearchKey::Subject),
            (&self.body, SearchKey::Body),
            (&self.text, SearchKey::Text),
        ];
        for (value, key) in strings {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                keys.push(key(value.clone()));
            }
        }

        if let Some(since) = self.since {
            keys.push(SearchKey::Since(since));
        }
        if let Some(before) = self.before {
            keys.push(SearchKey::Before(before));
        }
        if let Some(query) = self.query.as_ref().filter(|q| !q.trim().is_empty()) {
            keys.push(SearchKey::Raw(query.clone()));
        }

        if keys.is_empty() {
            keys.push(SearchKey::All);
        }
        keys
    }

    /// The full IMAP SEARCH expression.
    #[must_use]
    pub fn to_query(&self) -> String {
        self.keys()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
