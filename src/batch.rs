//! Sequential batch processing of search results

use crate::error::Result;
use crate::normalize::{HeaderMap, MessageRecord, normalize};
use crate::resolve::{ResolveOptions, resolve_body};
use crate::session::MailSession;
use tracing::{debug, info, warn};

/// Pick the UIDs to process: newest first, at most `limit` of them.
///
/// `uids` is in the server's order (oldest first). Only an absent
/// limit means no limit; `Some(0)` selects nothing.
#[must_use]
pub fn newest_first(uids: &[u32], limit: Option<usize>) -> Vec<u32> {
    let mut ordered: Vec<u32> = uids.iter().rev().copied().collect();
    if let Some(limit) = limit {
        ordered.truncate(limit);
    }
    ordered
}

/// Build one record per search result.
///
/// Messages are processed one at a time on the shared session. A
/// failure while building a record drops that message only; this
/// function never fails.
pub async fn process_batch<S: MailSession>(
    session: &mut S,
    uids: &[u32],
    limit: Option<usize>,
    fetch_bodies: bool,
    options: &ResolveOptions,
) -> Vec<MessageRecord> {
    let selected = newest_first(uids, limit);
    info!(
        "Processing {} of {} messages (bodies: {})",
        selected.len(),
        uids.len(),
        fetch_bodies
    );

    let mut records = Vec::with_capacity(selected.len());
    for uid in selected {
        match process_one(session, uid, fetch_bodies, options).await {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(uid, "Skipping message: {}", e);
            }
        }
    }

    records
}

async fn process_one<S: MailSession>(
    session: &mut S,
    uid: u32,
    fetch_bodies: bool,
    options: &ResolveOptions,
) -> Result<MessageRecord> {
    let summary = session.fetch_summary(uid).await?;
    let headers = HeaderMap::parse(&summary.header)?;

    let resolution = resolve_body(
        session,
        uid,
        summary.structure.as_ref(),
        fetch_bodies,
        options,
    )
    .await;
    debug!(uid, status = ?resolution.status, "Body resolution finished");

    Ok(normalize(summary.uid.unwrap_or(0), &headers, &resolution))
}
