//! UID SEARCH command handler.
//!
//! Evaluates the parsed `SearchKey` criteria the relay renders:
//! `ALL`, `SEEN`/`UNSEEN`, `SUBJECT`, and `SINCE`/`BEFORE` against the
//! stored header's `Date:`. Unknown keys match everything.
//!
//! Response format (RFC 3501 Section 7.2.5):
//!
//! ```text
//! * SEARCH 1 2 3
//! A0003 OK SEARCH completed
//! ```

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use chrono::NaiveDate;
use imap_codec::imap_types::search::SearchKey;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the UID SEARCH command. Returns matching UIDs from the
/// selected folder.
pub async fn handle_uid_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder_name) = selected_folder else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let Some(folder) = mailbox.get_folder(folder_name) else {
        let resp = format!("{tag} BAD Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let uids: Vec<u32> = folder
        .emails
        .iter()
        .filter(|e| criteria.iter().all(|key| matches_key(e, key)))
        .map(|e| e.uid)
        .collect();

    let search_line: String = uids
        .iter()
        .fold("* SEARCH".to_string(), |line, uid| format!("{line} {uid}"))
        + "\r\n";
    let _ = write_line(stream, &search_line).await;
    let resp = format!("{tag} OK SEARCH completed\r\n");
    let _ = write_line(stream, &resp).await;
}

/// Check if a test email matches a single `SearchKey`.
#[allow(clippy::match_same_arms)]
fn matches_key(email: &TestEmail, key: &SearchKey<'_>) -> bool {
    match key {
        SearchKey::All => true,
        SearchKey::Unseen => !email.seen,
        SearchKey::Seen => email.seen,
        SearchKey::Subject(needle) => header_value(&email.header, "Subject:").is_some_and(|s| {
            let needle = String::from_utf8_lossy(needle.as_ref()).to_lowercase();
            s.to_lowercase().contains(&needle)
        }),
        SearchKey::Since(date) => parse_email_date(&email.header).is_some_and(|d| d >= *date.as_ref()),
        SearchKey::Before(date) => parse_email_date(&email.header).is_some_and(|d| d < *date.as_ref()),
        SearchKey::And(keys) => keys.as_ref().iter().all(|k| matches_key(email, k)),
        SearchKey::Or(a, b) => matches_key(email, a) || matches_key(email, b),
        SearchKey::Not(k) => !matches_key(email, k),
        _ => true,
    }
}

/// Find a header line by its `Name:` prefix.
fn header_value<'a>(header: &'a [u8], prefix: &str) -> Option<&'a str> {
    let text = std::str::from_utf8(header).ok()?;
    text.lines()
        .find_map(|line| line.trim().strip_prefix(prefix))
        .map(str::trim)
}

/// Parse the `Date:` header into a `NaiveDate`.
fn parse_email_date(header: &[u8]) -> Option<NaiveDate> {
    let value = header_value(header, "Date:")?;
    chrono::DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use imap_codec::imap_types::core::AString;
    use imap_codec::imap_types::datetime::NaiveDate as ImapDate;
    use tokio::io::BufReader;

    fn dated(uid: u32, subject: &str, date: &str) -> TestEmail {
        TestEmail::plain(uid, &format!("Subject: {subject}\r\nDate: {date}"), "body")
    }

    async fn run(
        tag: &str,
        criteria: &[SearchKey<'_>],
        mailbox: &Mailbox,
        selected: Option<&str>,
    ) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_search(tag, criteria, mailbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> ImapDate {
        ImapDate::unvalidated(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn mailbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .email(dated(1, "Invoice 1", "Mon, 01 Jan 2024 10:00:00 +0000").seen())
            .email(dated(2, "Lunch", "Wed, 10 Jan 2024 10:00:00 +0000"))
            .email(dated(5, "Invoice 2", "Sat, 20 Jan 2024 10:00:00 +0000"))
            .build()
    }

    #[tokio::test]
    async fn search_all_returns_all_uids() {
        let output = run("A1", &[SearchKey::All], &mailbox(), Some("INBOX")).await;

        assert!(output.contains("* SEARCH 1 2 5"));
        assert!(output.contains("A1 OK SEARCH completed"));
    }

    #[tokio::test]
    async fn search_unseen_filters_seen() {
        let output = run("A1", &[SearchKey::Unseen], &mailbox(), Some("INBOX")).await;

        assert!(output.contains("* SEARCH 2 5\r\n"));
    }

    #[tokio::test]
    async fn subject_is_case_insensitive_substring() {
        let needle = AString::try_from("invoice").unwrap();
        let output = run("A1", &[SearchKey::Subject(needle)], &mailbox(), Some("INBOX")).await;

        assert!(output.contains("* SEARCH 1 5\r\n"));
    }

    #[tokio::test]
    async fn since_and_before_form_a_range() {
        let output = run(
            "A1",
            &[
                SearchKey::Since(date(2024, 1, 10)),
                SearchKey::Before(date(2024, 1, 20)),
            ],
            &mailbox(),
            Some("INBOX"),
        )
        .await;

        assert!(output.contains("* SEARCH 2\r\n"));
    }

    #[tokio::test]
    async fn no_folder_selected_returns_bad() {
        let output = run("A1", &[SearchKey::All], &mailbox(), None).await;

        assert!(output.contains("A1 BAD No folder selected"));
    }

    #[tokio::test]
    async fn empty_folder_returns_empty_search() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();

        let output = run("A1", &[SearchKey::All], &mailbox, Some("INBOX")).await;

        assert!(output.contains("* SEARCH\r\n"));
    }

    #[test]
    fn date_is_read_from_header() {
        let email = dated(1, "x", "Mon, 01 Jan 2024 12:00:00 +0000");
        assert_eq!(
            parse_email_date(&email.header),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert!(parse_email_date(b"Subject: none\r\n\r\n").is_none());
    }
}
