//! Inbound email normalization.
//!
//! Accepts either a bare message body or a full RFC 5322 message and
//! reduces it to the text the pipeline works on.

use mail_parser::MessageParser;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EmailError;

/// Headers that mark the start of an RFC 5322 message.
const HEADER_NAMES: &[&str] = &[
    "from",
    "to",
    "subject",
    "date",
    "message-id",
    "mime-version",
    "received",
    "return-path",
    "delivered-to",
    "reply-to",
    "content-type",
];

/// A normalized inbound email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailInput {
    pub subject: Option<String>,
    pub sender: Option<String>,
    /// Readable body with quoted replies removed.
    pub body: String,
}

impl EmailInput {
    /// Parse `raw` as a full message when it starts with headers, otherwise
    /// take it as the body.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        if raw.trim().is_empty() {
            return Err(EmailError::Empty);
        }

        let input = if looks_like_message(raw) {
            Self::parse_message(raw)?
        } else {
            Self {
                subject: None,
                sender: None,
                body: strip_quoted_text(raw.trim()),
            }
        };

        if input.body.trim().is_empty() && input.subject.is_none() {
            return Err(EmailError::Empty);
        }
        Ok(input)
    }

    fn parse_message(raw: &str) -> Result<Self, EmailError> {
        let parsed = MessageParser::default()
            .parse(raw.as_bytes())
            .ok_or_else(|| EmailError::Unparseable("no headers found".into()))?;

        let subject = parsed
            .subject()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let sender = parsed
            .from()
            .and_then(|addr| addr.first())
            .and_then(|a| a.address())
            .map(|s| s.to_string());

        let text = if let Some(text) = parsed.body_text(0) {
            text.into_owned()
        } else if let Some(html) = parsed.body_html(0) {
            strip_html(html.as_ref())
        } else {
            String::new()
        };

        debug!(
            sender = sender.as_deref().unwrap_or("unknown"),
            has_subject = subject.is_some(),
            "Parsed RFC 5322 message"
        );

        Ok(Self {
            subject,
            sender,
            body: strip_quoted_text(text.trim()),
        })
    }

    /// Text handed to `process_email`.
    pub fn content(&self) -> String {
        match &self.subject {
            Some(subject) if self.body.is_empty() => format!("Subject: {subject}"),
            Some(subject) => format!("Subject: {subject}\n\n{}", self.body),
            None => self.body.clone(),
        }
    }
}

/// First line is a known `Name: value` header and a blank line follows the
/// header block.
fn looks_like_message(raw: &str) -> bool {
    let first = raw.trim_start().lines().next().unwrap_or_default();
    let is_header = first
        .split_once(':')
        .is_some_and(|(name, _)| HEADER_NAMES.contains(&name.trim().to_ascii_lowercase().as_str()));
    is_header && (raw.contains("\n\n") || raw.contains("\r\n\r\n"))
}

/// Drop quoted reply lines and everything after a reply attribution.
pub fn strip_quoted_text(body: &str) -> String {
    let mut kept: Vec<&str> = body
        .lines()
        .take_while(|line| !is_reply_separator(line.trim()))
        .filter(|line| !line.trim_start().starts_with('>'))
        .collect();

    while kept.last().is_some_and(|l| l.trim().is_empty()) {
        kept.pop();
    }
    kept.join("\n")
}

fn is_reply_separator(line: &str) -> bool {
    // "On Mon, Jan 1, 2026 at 10:00 AM Alice <alice@ex.com> wrote:"
    (line.starts_with("On ") && line.ends_with("wrote:"))
        || (line.starts_with("---") && line.contains("Original Message"))
}

/// Strip tags and common entities, collapsing whitespace.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
