//! Time-bounded part retrieval

use crate::session::{MailSession, PartRef};
use std::time::Duration;
use tracing::{debug, warn};

/// Result of one attempt to retrieve a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(Vec<u8>),
    Timeout,
    FetchError(String),
}

impl FetchOutcome {
    /// Content retrieved by the attempt, if any. An empty success
    /// counts as nothing retrieved.
    #[must_use]
    pub fn into_content(self) -> Option<Vec<u8>> {
        match self {
            Self::Success(content) if !content.is_empty() => Some(content),
            _ => None,
        }
    }
}

/// Fetch one part, giving up after `timeout`.
///
/// On timeout the in-flight retrieval is dropped; the session ignores
/// any late response to it.
pub async fn fetch_part<S: MailSession>(
    session: &mut S,
    uid: u32,
    part: &PartRef,
    timeout: Duration,
) -> FetchOutcome {
    debug!(uid, part = %part, "Fetching part");

    match tokio::time::timeout(timeout, session.fetch_part(uid, part)).await {
        Ok(Ok(content)) => FetchOutcome::Success(content),
        Ok(Err(e)) => {
            warn!(uid, part = %part, "Part fetch failed: {}", e);
            FetchOutcome::FetchError(e.to_string())
        }
        Err(_) => {
            warn!(
                uid,
                part = %part,
                "Part fetch timed out after {} ms",
                timeout.as_millis()
            );
            FetchOutcome::Timeout
        }
    }
}
