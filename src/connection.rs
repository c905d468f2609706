//! async-imap backed session
//!
//! Provides [`connect`] (TCP, then implicit TLS or STARTTLS, then
//! LOGIN) and [`ImapConnection`], the production [`MailSession`].

use crate::config::ImapConfig;
use crate::error::{Error, Result};
use crate::session::{MailSession, MessageSummary, PartRef};
use crate::structure::PartNode;
use async_imap::Session;
use async_imap::imap_proto::types::{MessageSection, SectionPath};
use futures::StreamExt;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// A TLS-wrapped IMAP session.
pub type ImapSession = Session<Compat<TlsStream<TcpStream>>>;

/// Header block and structure in one round trip.
const SUMMARY_QUERY: &str = "(UID BODYSTRUCTURE BODY.PEEK[HEADER])";

/// Build a TLS connector.
///
/// Certificates are checked against the Mozilla root store unless the
/// caller opted out (self-signed bridges and test servers).
fn tls_connector(accept_invalid_certs: bool) -> TlsConnector {
    let config = if accept_invalid_certs {
        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    };
    TlsConnector::from(Arc::new(config))
}

/// Open a fresh TLS-wrapped IMAP session.
///
/// With `config.tls` the TLS handshake happens immediately; otherwise
/// the plaintext connection is upgraded with STARTTLS first. Either
/// way the session logs in before it is returned.
pub async fn connect(config: &ImapConfig) -> Result<ImapConnection> {
    let addr = format!("{}:{}", config.host, config.port);
    debug!("Connecting to IMAP server at {} (implicit TLS: {})", addr, config.tls);

    let mut tcp_stream = TcpStream::connect(&addr).await?;

    if !config.tls {
        let mut client = async_imap::Client::new(tcp_stream.compat());
        client
            .run_command_and_check_ok("STARTTLS", None)
            .await
            .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;
        tcp_stream = client.into_inner().into_inner();
    }

    let connector = tls_connector(config.accept_invalid_certs);
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| Error::Tls(e.to_string()))?;

    let tls_client = async_imap::Client::new(tls_stream.compat());

    let session = tls_client
        .login(&config.username, &config.password)
        .await
        .map_err(|(e, _)| Error::Imap(format!("Login failed: {e}")))?;

    info!("Connected to IMAP server {}", config.host);
    Ok(ImapConnection { session })
}

/// A logged-in IMAP session owned by one batch.
pub struct ImapConnection {
    session: ImapSession,
}

fn section_path(part: &PartRef) -> Option<SectionPath> {
    match part {
        PartRef::Text => Some(SectionPath::Full(MessageSection::Text)),
        PartRef::Section(_) => part.path_components().map(|p| SectionPath::Part(p, None)),
    }
}

impl MailSession for ImapConnection {
    async fn open_mailbox(&mut self, name: &str) -> Result<()> {
        self.session
            .select(name)
            .await
            .map_err(|e| Error::Imap(format!("Failed to select {name}: {e}")))?;
        Ok(())
    }

    async fn search(&mut self, query: &str) -> Result<Vec<u32>> {
        let uids = self
            .session
            .uid_search(query)
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();

        info!("Found {} messages matching '{}'", uid_list.len(), query);
        Ok(uid_list)
    }

    async fn fetch_summary(&mut self, uid: u32) -> Result<MessageSummary> {
        let uid_set = format!("{uid}");
        let mut messages = self
            .session
            .uid_fetch(&uid_set, SUMMARY_QUERY)
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

        let mut summary = None;
        while let Some(msg_result) = messages.next().await {
            let msg = msg_result.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
            if summary.is_some() || msg.uid.is_some_and(|u| u != uid) {
                continue;
            }
            if let Some(header) = msg.header() {
                summary = Some(MessageSummary {
                    uid: msg.uid,
                    header: header.to_vec(),
                    structure: msg.bodystructure().map(PartNode::from_body_structure),
                });
            }
        }

        summary.ok_or_else(|| Error::Item(format!("No header found for UID {uid}")))
    }

    async fn fetch_part(&mut self, uid: u32, part: &PartRef) -> Result<Vec<u8>> {
        let path = section_path(part)
            .ok_or_else(|| Error::Imap(format!("Invalid section '{part}'")))?;
        let uid_set = format!("{uid}");
        let query = format!("BODY.PEEK[{}]", part.as_section());

        let mut messages = self
            .session
            .uid_fetch(&uid_set, &query)
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

        // Responses without the requested section (late answers to an
        // abandoned fetch, unsolicited flag updates) are skipped.
        let mut content = None;
        while let Some(msg_result) = messages.next().await {
            let msg = msg_result.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
            if content.is_none() {
                content = msg.section(&path).map(<[u8]>::to_vec);
            }
        }

        content.ok_or_else(|| Error::Imap(format!("No section {part} for UID {uid}")))
    }

    async fn close(mut self) -> Result<()> {
        self.session
            .logout()
            .await
            .map_err(|e| Error::Imap(format!("Logout failed: {e}")))
    }
}

/// Certificate verifier that accepts all certificates
/// (for self-signed IMAP bridges).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
