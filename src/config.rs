//! Relay and IMAP connection configuration

use crate::error::{Error, Result};
use crate::session::PartRef;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Default bound on a single part retrieval.
pub const DEFAULT_PART_TIMEOUT: Duration = Duration::from_millis(5000);

/// IMAP connection configuration, supplied per request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    #[serde(alias = "user")]
    pub username: String,
    #[serde(alias = "pass")]
    pub password: String,
    /// Implicit TLS on connect. When false the session is upgraded
    /// with STARTTLS instead; plaintext sessions are never used.
    #[serde(default = "default_tls", alias = "secure")]
    pub tls: bool,
    /// Skip certificate verification (self-signed bridges).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

const fn default_tls() -> bool {
    true
}

impl ImapConfig {
    /// Reject configurations that cannot possibly connect.
    ///
    /// Runs before any socket is opened.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("IMAP host is empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("IMAP port must be non-zero".into()));
        }
        if self.username.is_empty() {
            return Err(Error::Config("IMAP username is empty".into()));
        }
        if self.password.is_empty() {
            return Err(Error::Config("IMAP password is empty".into()));
        }
        Ok(())
    }
}

/// Process-wide relay settings, read once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: String,
    /// Shared secret expected in the `x-api-key` header. `None` leaves
    /// the endpoint open.
    pub api_key: Option<String>,
    pub part_timeout: Duration,
    pub fallback_part: PartRef,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            api_key: None,
            part_timeout: DEFAULT_PART_TIMEOUT,
            fallback_part: PartRef::default_fallback(),
        }
    }
}

impl RelayConfig {
    /// Load relay configuration from environment variables
    ///
    /// Reads from `.env` file if present. All variables are optional:
    /// - `RELAY_BIND` (default: `0.0.0.0:3000`)
    /// - `RELAY_API_KEY` (default: unset, open access)
    /// - `RELAY_PART_TIMEOUT_MS` (default: `5000`)
    /// - `RELAY_FALLBACK_PART` (default: `1`; `TEXT` for the bare
    ///   TEXT designator)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let part_timeout = match lookup("RELAY_PART_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .map_err(|e| Error::Config(format!("Invalid RELAY_PART_TIMEOUT_MS: {e}")))?,
            ),
            None => defaults.part_timeout,
        };

        let fallback_part = match lookup("RELAY_FALLBACK_PART") {
            Some(part) => part
                .parse()
                .map_err(|e| Error::Config(format!("Invalid RELAY_FALLBACK_PART: {e}")))?,
            None => defaults.fallback_part,
        };

        Ok(Self {
            bind: lookup("RELAY_BIND").unwrap_or(defaults.bind),
            api_key: lookup("RELAY_API_KEY").filter(|key| !key.is_empty()),
            part_timeout,
            fallback_part,
        })
    }
}
