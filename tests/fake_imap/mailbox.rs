//! Test data model for the fake IMAP server
//!
//! Messages are stored pre-split: a header block, a BODYSTRUCTURE
//! string, and the bytes of every addressable section. The server
//! never parses MIME itself.
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .email(TestEmail::plain(1, "Subject: hi\r\n", "hello"))
//!         .email(TestEmail::alternative(2, header, "text", "<p>html</p>").broken("2"))
//!         .email(TestEmail::plain(3, header, "late").slow("1", Duration::from_millis(400)))
//!     .build();
//! ```

use std::time::Duration;

/// A complete mailbox: a collection of named folders.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
}

impl Mailbox {
    /// Look up a folder by name (case-sensitive, matching real IMAP).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub emails: Vec<TestEmail>,
}

/// A stored message.
///
/// `sections` maps an IMAP section name (`"1"`, `"1.2"`, `"TEXT"`) to
/// its raw bytes. Sections listed in `broken` make any FETCH that asks
/// for them fail with a tagged NO; sections listed in `slow` are
/// answered only after their delay.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub uid: u32,
    pub seen: bool,
    pub header: Vec<u8>,
    pub structure: String,
    pub sections: Vec<(String, Vec<u8>)>,
    pub broken: Vec<String>,
    pub slow: Vec<(String, Duration)>,
}

fn text_part(subtype: &str, body: &str, encoding: &str) -> String {
    format!(
        "(\"TEXT\" \"{subtype}\" (\"CHARSET\" \"UTF-8\") NIL NIL \"{encoding}\" {} {})",
        body.len(),
        body.lines().count()
    )
}

fn header_block(header: &str) -> Vec<u8> {
    let mut block = header.trim_end().replace('\n', "\r\n").replace("\r\r\n", "\r\n");
    block.push_str("\r\n\r\n");
    block.into_bytes()
}

impl TestEmail {
    /// A single-part text/plain message.
    pub fn plain(uid: u32, header: &str, body: &str) -> Self {
        Self {
            uid,
            seen: false,
            header: header_block(header),
            structure: text_part("PLAIN", body, "7BIT"),
            sections: vec![
                ("1".to_string(), body.as_bytes().to_vec()),
                ("TEXT".to_string(), body.as_bytes().to_vec()),
            ],
            broken: Vec::new(),
            slow: Vec::new(),
        }
    }

    /// A single-part text/html message with a base64 body.
    pub fn html_base64(uid: u32, header: &str, encoded: &str) -> Self {
        Self {
            uid,
            seen: false,
            header: header_block(header),
            structure: text_part("HTML", encoded, "BASE64"),
            sections: vec![
                ("1".to_string(), encoded.as_bytes().to_vec()),
                ("TEXT".to_string(), encoded.as_bytes().to_vec()),
            ],
            broken: Vec::new(),
            slow: Vec::new(),
        }
    }

    /// A multipart/alternative message: section 1 is text/plain,
    /// section 2 is text/html.
    pub fn alternative(uid: u32, header: &str, text: &str, html: &str) -> Self {
        let boundary = "frontier";
        let combined = format!(
            "--{boundary}\r\nContent-Type: text/plain\r\n\r\n{text}\r\n\
             --{boundary}\r\nContent-Type: text/html\r\n\r\n{html}\r\n\
             --{boundary}--\r\n"
        );
        Self {
            uid,
            seen: false,
            header: header_block(header),
            structure: format!(
                "({}{} \"ALTERNATIVE\")",
                text_part("PLAIN", text, "7BIT"),
                text_part("HTML", html, "7BIT"),
            ),
            sections: vec![
                ("1".to_string(), text.as_bytes().to_vec()),
                ("2".to_string(), html.as_bytes().to_vec()),
                ("TEXT".to_string(), combined.into_bytes()),
            ],
            broken: Vec::new(),
            slow: Vec::new(),
        }
    }

    /// Make FETCH requests for `section` fail.
    pub fn broken(mut self, section: &str) -> Self {
        self.broken.push(section.to_string());
        self
    }

    /// Delay the answer to FETCH requests for `section`.
    pub fn slow(mut self, section: &str, delay: Duration) -> Self {
        self.slow.push((section.to_string(), delay));
        self
    }

    pub const fn seen(mut self) -> Self {
        self.seen = true;
        self
    }

    pub fn section(&self, name: &str) -> Option<&[u8]> {
        self.sections
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn is_broken(&self, name: &str) -> bool {
        self.broken.iter().any(|b| b.eq_ignore_ascii_case(name))
    }

    pub fn delay_for(&self, name: &str) -> Option<Duration> {
        self.slow
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, delay)| *delay)
    }
}

/// Builder for constructing a `Mailbox` step by step.
pub struct MailboxBuilder {
    folders: Vec<Folder>,
}

impl MailboxBuilder {
    pub const fn new() -> Self {
        Self {
            folders: Vec::new(),
        }
    }

    /// Add a new folder. Subsequent `.email()` calls add to this folder.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            emails: Vec::new(),
        });
        self
    }

    /// Add a message to the most recently added folder.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn email(mut self, email: TestEmail) -> Self {
        self.folders
            .last_mut()
            .expect("call .folder() before .email()")
            .emails
            .push(email);
        self
    }

    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
        }
    }
}
