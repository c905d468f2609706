//! The IMAP session capability the pipeline runs against
//!
//! The body-resolution pipeline only needs a handful of operations
//! from a live session. They are collected in [`MailSession`] so the
//! pipeline can be driven by the async-imap backed
//! [`ImapConnection`](crate::ImapConnection) in production and by
//! scripted sessions in tests.

use crate::error::Result;
use crate::structure::PartNode;
use std::fmt;
use std::future::Future;
use std::str::FromStr;

/// Identifies one fetchable section of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartRef {
    /// A dotted section path such as `1` or `2.1`.
    Section(String),
    /// The `TEXT` designator: the message body without its header.
    Text,
}

impl PartRef {
    /// The part fetched when structural selection fails.
    #[must_use]
    pub fn default_fallback() -> Self {
        Self::Section("1".to_string())
    }

    /// The section specifier as it appears inside `BODY.PEEK[...]`.
    #[must_use]
    pub fn as_section(&self) -> &str {
        match self {
            Self::Section(path) => path,
            Self::Text => "TEXT",
        }
    }

    /// The numeric components of a section path, if this is one.
    #[must_use]
    pub fn path_components(&self) -> Option<Vec<u32>> {
        match self {
            Self::Section(path) => path.split('.').map(|n| n.parse().ok()).collect(),
            Self::Text => None,
        }
    }
}

impl fmt::Display for PartRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_section())
    }
}

impl FromStr for PartRef {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("TEXT") {
            return Ok(Self::Text);
        }
        let valid = !s.is_empty()
            && s.split('.')
                .all(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) && n != "0");
        if valid {
            Ok(Self::Section(s.to_string()))
        } else {
            Err(format!("'{s}' is neither TEXT nor a dotted section path"))
        }
    }
}

/// Header block and structure of one message, fetched in a single
/// round trip.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    pub uid: Option<u32>,
    /// Raw RFC 5322 header block.
    pub header: Vec<u8>,
    pub structure: Option<PartNode>,
}

/// A live, exclusively owned IMAP session.
pub trait MailSession: Send {
    /// SELECT a mailbox.
    fn open_mailbox(&mut self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Run a UID SEARCH and return matching UIDs in ascending order
    /// (oldest first, the server's natural order).
    fn search(&mut self, query: &str) -> impl Future<Output = Result<Vec<u32>>> + Send;

    /// Fetch the header block and body structure of a message.
    fn fetch_summary(&mut self, uid: u32) -> impl Future<Output = Result<MessageSummary>> + Send;

    /// Fetch the raw (still transfer-encoded) content of one part.
    fn fetch_part(
        &mut self,
        uid: u32,
        part: &PartRef,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// LOGOUT and release the connection.
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}
