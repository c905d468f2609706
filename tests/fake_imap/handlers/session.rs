//! LOGIN and LOGOUT handlers.
//!
//! Any credentials are accepted. LOGOUT answers with an untagged BYE
//! before the tagged OK, as RFC 3501 Section 6.1.3 requires.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle LOGIN. Returns `false` if the client went away.
pub async fn handle_login<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    stream: &mut BufReader<S>,
) -> bool {
    let resp = format!("{tag} OK LOGIN completed\r\n");
    write_line(stream, &resp).await.is_ok()
}

/// Handle LOGOUT.
pub async fn handle_logout<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    stream: &mut BufReader<S>,
) {
    let _ = write_line(stream, "* BYE Relay session over\r\n").await;
    let resp = format!("{tag} OK LOGOUT completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn output_of<F, Fut>(handler: F) -> String
    where
        F: FnOnce(BufReader<tokio::io::DuplexStream>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let (client, server) = tokio::io::duplex(1024);
        handler(BufReader::new(server)).await;

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn login_echoes_tag() {
        let output = output_of(|mut stream| async move {
            assert!(handle_login("A0001", &mut stream).await);
        })
        .await;

        assert_eq!(output, "A0001 OK LOGIN completed\r\n");
    }

    #[tokio::test]
    async fn logout_sends_bye_before_ok() {
        let output = output_of(|mut stream| async move {
            handle_logout("X1", &mut stream).await;
        })
        .await;

        let bye = output.find("* BYE").unwrap();
        let ok = output.find("X1 OK LOGOUT completed").unwrap();
        assert!(bye < ok);
    }
}
