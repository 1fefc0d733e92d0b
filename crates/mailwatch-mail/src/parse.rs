//! RFC 5322 message decoding via `mailparse`.

use chrono::{DateTime, TimeZone, Utc};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use mailwatch_core::error::{MonitorError, Result};
use mailwatch_core::source::FetchedMessage;

/// Decode a raw message.
///
/// `fetched_at` stands in for the receipt time when the `Date` header is
/// missing or unparseable.
pub fn parse_message(raw: &[u8], fetched_at: DateTime<Utc>) -> Result<FetchedMessage> {
    let parsed = mailparse::parse_mail(raw)
        .map_err(|e| MonitorError::Protocol(format!("malformed message: {e}")))?;

    let headers = parsed.headers.as_slice();
    let subject = headers.get_first_value("Subject").unwrap_or_default();
    let from_address = headers
        .get_first_value("From")
        .map(|f| extract_sender_email(&f))
        .unwrap_or_default();
    let received_at = headers
        .get_first_value("Date")
        .and_then(|d| parse_date(&d))
        .unwrap_or(fetched_at);

    let mut text_body = None;
    let mut html_body = None;
    collect_bodies(&parsed, &mut text_body, &mut html_body);

    Ok(FetchedMessage {
        subject,
        text_body,
        html_body,
        received_at,
        from_address,
    })
}

/// Parse an RFC 2822 `Date` header value into UTC.
pub(crate) fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let ts = mailparse::dateparse(value).ok()?;
    Utc.timestamp_opt(ts, 0).single()
}

/// Extract a bare, lowercased address from a `From` header.
///
/// Handles:
/// - `user@example.com`
/// - `"User Name" <user@example.com>`
/// - `User Name <user@example.com>`
pub(crate) fn extract_sender_email(from_header: &str) -> String {
    if let Some(start) = from_header.rfind('<') {
        if let Some(end) = from_header.rfind('>') {
            if end > start {
                return from_header[start + 1..end].trim().to_lowercase();
            }
        }
    }
    from_header.trim().to_lowercase()
}

/// Whether a `From` header contains any of `senders` (case-insensitive).
pub(crate) fn sender_matches(from_header: &str, senders: &[String]) -> bool {
    if senders.is_empty() {
        return true;
    }
    let from = from_header.to_lowercase();
    senders.iter().any(|s| from.contains(&s.to_lowercase()))
}

/// Keep the first text/plain and first text/html part, skipping attachments.
fn collect_bodies(mail: &ParsedMail, text: &mut Option<String>, html: &mut Option<String>) {
    if mail.get_content_disposition().disposition == DispositionType::Attachment {
        return;
    }

    if !mail.subparts.is_empty() {
        for part in &mail.subparts {
            collect_bodies(part, text, html);
        }
        return;
    }

    let ct = mail.ctype.mimetype.to_lowercase();
    let slot = if ct == "text/plain" {
        text
    } else if ct == "text/html" {
        html
    } else {
        return;
    };

    if slot.is_none() {
        if let Ok(body) = mail.get_body() {
            *slot = Some(body);
        }
    }
}
