//! Stateless HTTP-to-IMAP relay
//!
//! Each request carries its own IMAP credentials and search criteria.
//! The relay opens one session, selects the mailbox, searches, and
//! turns every match into a flat [`MessageRecord`] with a plain-text
//! and an HTML body.
//!
//! Bodies are located from the server's BODYSTRUCTURE: the best text
//! part is fetched under a deadline, and if that yields nothing a
//! single fallback section is tried. A message that cannot be
//! processed is dropped from the batch; it never fails the request.

mod batch;
mod config;
mod connection;
mod error;
mod fetch;
pub mod http;
mod normalize;
mod relay;
mod resolve;
mod search;
mod session;
mod structure;


pub use batch::{newest_first, process_batch};
pub use config::{DEFAULT_PART_TIMEOUT, ImapConfig, RelayConfig};
pub use connection::{ImapConnection, connect};
pub use error::{Error, Result};
pub use fetch::{FetchOutcome, fetch_part};
pub use normalize::{
    DECODE_FAILED, DecodedBody, HeaderMap, MessageRecord, NO_SUBJECT, UNKNOWN_SENDER, decode_body,
    normalize,
};
pub use relay::{BatchRequest, ImapRelay};
pub use resolve::{
    BodyResolution, CONTENT_UNAVAILABLE, FetchedBody, ResolutionStatus, ResolveOptions,
    resolve_body,
};
pub use search::{SearchCriteria, SearchKey};
pub use session::{MailSession, MessageSummary, PartRef};
pub use structure::{PartDescriptor, PartNode, flatten, select_best_part};
