//! Error types for imap-relay

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Body decoding error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Message processing error: {0}")]
    Item(String),
}

impl Error {
    /// Whether this error came from the IMAP transport (connect,
    /// STARTTLS/TLS, login, SELECT, SEARCH).
    ///
    /// Transport errors abort a whole batch; everything else is either
    /// a caller mistake (`Config`) or recovered per message.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Imap(_) | Self::Io(_) | Self::Tls(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
