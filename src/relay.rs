//! One request, one session: the relay entry point

use crate::batch::process_batch;
use crate::config::ImapConfig;
use crate::connection::connect;
use crate::error::Result;
use crate::normalize::MessageRecord;
use crate::resolve::ResolveOptions;
use crate::search::SearchCriteria;
use crate::session::MailSession;
use serde::Deserialize;
use tracing::{info, warn};

/// A relay request as posted by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub imap: ImapConfig,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    #[serde(default)]
    pub search: Option<SearchCriteria>,
    /// Maximum number of messages to return; absent means no limit.
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default = "default_fetch_bodies")]
    pub fetch_bodies: bool,
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

const fn default_fetch_bodies() -> bool {
    true
}

impl BatchRequest {
    /// The IMAP SEARCH expression for this request.
    #[must_use]
    pub fn query(&self) -> String {
        self.search.clone().unwrap_or_default().to_query()
    }

    /// Check the connection settings and search input.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for unusable IMAP settings or search
    /// values that cannot be sent on a command line.
    pub fn validate(&self) -> Result<()> {
        self.imap.validate()?;
        if let Some(search) = &self.search {
            search.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit.and_then(|n| usize::try_from(n).ok())
    }
}

/// Stateless IMAP relay
///
/// Holds only resolution settings; every call to [`ImapRelay::fetch`]
/// opens and closes its own session.
#[derive(Debug, Clone, Default)]
pub struct ImapRelay {
    options: ResolveOptions,
}

impl ImapRelay {
    #[must_use]
    pub const fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    /// Fetch the messages described by `request`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before connecting if the IMAP
    /// settings are unusable, or a transport error if the connection,
    /// SELECT, or SEARCH fails. Per-message failures never surface
    /// here.
    pub async fn fetch(&self, request: &BatchRequest) -> Result<Vec<MessageRecord>> {
        request.validate()?;
        let session = connect(&request.imap).await?;
        self.run(session, request).await
    }

    /// Run a request on an already-open session, closing it afterwards.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unsafe search input, or an
    /// error if SELECT or SEARCH fails.
    pub async fn run<S: MailSession>(
        &self,
        mut session: S,
        request: &BatchRequest,
    ) -> Result<Vec<MessageRecord>> {
        let result = self.run_on(&mut session, request).await;

        if let Err(e) = session.close().await {
            warn!("Ignoring logout failure: {}", e);
        }

        result
    }

    async fn run_on<S: MailSession>(
        &self,
        session: &mut S,
        request: &BatchRequest,
    ) -> Result<Vec<MessageRecord>> {
        if let Some(search) = &request.search {
            search.validate()?;
        }
        session.open_mailbox(&request.mailbox).await?;

        let query = request.query();
        let uids = session.search(&query).await?;
        if uids.is_empty() {
            return Ok(vec![]);
        }

        let records = process_batch(
            session,
            &uids,
            request.limit(),
            request.fetch_bodies,
            &self.options,
        )
        .await;

        info!(
            "Relayed {} messages from {}",
            records.len(),
            request.mailbox
        );
        Ok(records)
    }
}
