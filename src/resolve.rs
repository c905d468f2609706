//! Per-message body resolution with a fixed-identity fallback
//!
//! Servers differ in how faithfully they honour structural section
//! addressing. Resolution therefore runs as a short chain:
//!
//! ```text
//!   fetch_bodies == false ───────────────────────────────> Skipped
//!   flatten + select ──(part with id)──> fetch ──ok──────> Structure
//!        │                                  │
//!        └──(nothing usable)──┐   timeout / error / empty
//!                             v             │
//!                      fetch fallback part <┘
//!                        │            │
//!                       ok     timeout / error / empty
//!                        v            v
//!                    Fallback     Unresolved
//! ```
//!
//! The primary part is never retried and the fallback is attempted at
//! most once, so a message costs at most two part round trips.

use crate::config::{DEFAULT_PART_TIMEOUT, RelayConfig};
use crate::fetch::fetch_part;
use crate::session::{MailSession, PartRef};
use crate::structure::{PartDescriptor, PartNode, flatten, select_best_part};
use std::time::Duration;
use tracing::{debug, warn};

/// Body text shown when neither attempt produced content.
pub const CONTENT_UNAVAILABLE: &str = "[Message content unavailable]";

/// Tunables for body resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub part_timeout: Duration,
    pub fallback_part: PartRef,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            part_timeout: DEFAULT_PART_TIMEOUT,
            fallback_part: PartRef::default_fallback(),
        }
    }
}

impl From<&RelayConfig> for ResolveOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            part_timeout: config.part_timeout,
            fallback_part: config.fallback_part.clone(),
        }
    }
}

/// Terminal state of the resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    /// Bodies were not requested.
    Skipped,
    /// Resolved through the selected structural part.
    Structure,
    /// Resolved through the fixed fallback part.
    Fallback,
    Unresolved,
}

impl ResolutionStatus {
    /// Placeholder text for display, if this state has one.
    #[must_use]
    pub const fn note(self) -> Option<&'static str> {
        match self {
            Self::Unresolved => Some(CONTENT_UNAVAILABLE),
            _ => None,
        }
    }
}

/// Raw part content together with what is known about its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub raw: Vec<u8>,
    pub descriptor: PartDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyResolution {
    pub content: Option<FetchedBody>,
    pub status: ResolutionStatus,
}

impl BodyResolution {
    const fn empty(status: ResolutionStatus) -> Self {
        Self {
            content: None,
            status,
        }
    }
}

/// Resolve the displayable body of one message.
///
/// Never fails: every failure path ends in
/// [`ResolutionStatus::Unresolved`].
pub async fn resolve_body<S: MailSession>(
    session: &mut S,
    uid: u32,
    structure: Option<&PartNode>,
    fetch_bodies: bool,
    options: &ResolveOptions,
) -> BodyResolution {
    if !fetch_bodies {
        return BodyResolution::empty(ResolutionStatus::Skipped);
    }

    let parts = flatten(structure);

    if let Some(best) = select_best_part(&parts) {
        if let Some(id) = best.part_id.as_deref() {
            let part = PartRef::Section(id.to_string());
            let outcome = fetch_part(session, uid, &part, options.part_timeout).await;
            if let Some(raw) = outcome.into_content() {
                debug!(uid, part = id, mime = %best.mime_type(), "Resolved body via structure");
                return BodyResolution {
                    content: Some(FetchedBody {
                        raw,
                        descriptor: best.clone(),
                    }),
                    status: ResolutionStatus::Structure,
                };
            }
            debug!(uid, part = id, "Structural part yielded nothing, trying fallback");
        } else {
            debug!(uid, "Selected part is not addressable, trying fallback");
        }
    } else {
        debug!(uid, parts = parts.len(), "No text part in structure, trying fallback");
    }

    let fallback = &options.fallback_part;
    let outcome = fetch_part(session, uid, fallback, options.part_timeout).await;
    match outcome.into_content() {
        Some(raw) => {
            debug!(uid, part = %fallback, "Resolved body via fallback");
            BodyResolution {
                content: Some(FetchedBody {
                    raw,
                    descriptor: fallback_descriptor(&parts, fallback),
                }),
                status: ResolutionStatus::Fallback,
            }
        }
        None => {
            warn!(uid, "Body unavailable after fallback");
            BodyResolution::empty(ResolutionStatus::Unresolved)
        }
    }
}

/// The structure's own description of the fallback part when it has
/// one, otherwise plain text.
fn fallback_descriptor(parts: &[PartDescriptor], fallback: &PartRef) -> PartDescriptor {
    let id = fallback.as_section();
    parts
        .iter()
        .find(|p| p.part_id.as_deref() == Some(id) && p.media_type == "text")
        .cloned()
        .unwrap_or_else(|| PartDescriptor::assumed_plain_text(Some(id)))
}
