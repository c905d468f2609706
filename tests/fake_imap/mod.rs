//! Fake IMAP server for integration testing
//!
//! Just enough IMAP to drive the relay end-to-end over a real socket:
//! STARTTLS, LOGIN, SELECT, UID SEARCH, UID FETCH with BODYSTRUCTURE
//! and section literals, LOGOUT.
//!
//! - `server` -- TCP listener, TLS setup, and command dispatch
//! - `handlers/` -- one file per command group
//! - `mailbox` -- test data model and builder
//! - `io` -- write helpers

pub mod mailbox;

pub use mailbox::{MailboxBuilder, TestEmail};
pub use server::FakeImapServer;
