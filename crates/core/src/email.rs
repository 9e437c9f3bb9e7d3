//! Email parsing.
//!
//! A raw RFC 5322 message goes through [`EmailMessage`] for its headers and
//! best body part, then through the same sanitize, readability and Markdown
//! chain as a web page. Image recovery is not run on this path.
//!
//! Body selection: the first `text/html` part wins; otherwise the first
//! `text/plain` part is HTML-escaped and wrapped in `<pre>`. Attachments are
//! never considered.

use std::fs;
use std::path::Path;

use mailparse::{DispositionType, MailAddr, MailHeaderMap, ParsedMail, SingleInfo};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;

use crate::article::{EmailOrigin, ExtractedArticle};
use crate::config::PipelineConfig;
use crate::markdown::to_markdown;
use crate::readability::Readability;
use crate::sanitize::sanitize_html;
use crate::{LecternError, Result};

/// Title used when the `Subject` header is missing or blank.
pub const UNTITLED_EMAIL: &str = "Untitled Email";

/// Sender name used when `From` is missing or unparsable.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Shortest Markdown body, in characters, accepted from an email.
pub const MIN_CONTENT_CHARS: usize = 20;

/// A parsed MIME message.
pub struct EmailMessage<'a> {
    mail: ParsedMail<'a>,
}

impl<'a> EmailMessage<'a> {
    /// Parses the MIME structure of `raw`. Nothing is decoded yet.
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        Ok(Self { mail: mailparse::parse_mail(raw)? })
    }

    /// Trimmed `Subject`, or [`UNTITLED_EMAIL`].
    pub fn subject(&self) -> String {
        self.mail
            .headers
            .get_first_value("Subject")
            .map(|subject| subject.trim().to_string())
            .filter(|subject| !subject.is_empty())
            .unwrap_or_else(|| UNTITLED_EMAIL.to_string())
    }

    /// `(display name, address)` from `From`.
    ///
    /// Without a display name the local part of the address stands in; without
    /// an address the name is [`UNKNOWN_SENDER`] and the address is empty.
    pub fn sender(&self) -> (String, String) {
        let info = self
            .mail
            .headers
            .get_first_header("From")
            .and_then(|header| mailparse::addrparse_header(header).ok())
            .and_then(|list| list.iter().find_map(first_single));

        let Some(info) = info else {
            return (UNKNOWN_SENDER.to_string(), String::new());
        };

        let address = info.addr.trim().to_string();
        let name = info
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .or_else(|| address.split('@').next().filter(|local| !local.is_empty()).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        (name, address)
    }

    /// `Date` as a timestamp. Unparsable dates are logged and yield `None`.
    pub fn published_at(&self) -> Option<OffsetDateTime> {
        let raw = self.mail.headers.get_first_value("Date")?;
        let raw = raw.trim();

        let parsed = parse_date(raw);
        if parsed.is_none() {
            tracing::warn!(date = raw, "failed to parse email Date header");
        }
        parsed
    }

    /// HTML for the best body part.
    ///
    /// # Errors
    ///
    /// [`LecternError::MissingBody`] when the message has neither a
    /// `text/html` nor a `text/plain` part.
    pub fn html_body(&self) -> Result<String> {
        let mut parts = Vec::new();
        collect_parts(&self.mail, &mut parts);

        if let Some(html) = parts.iter().find(|part| part.ctype.mimetype.eq_ignore_ascii_case("text/html")) {
            return decode_body(html);
        }
        if let Some(plain) = parts.iter().find(|part| part.ctype.mimetype.eq_ignore_ascii_case("text/plain")) {
            let text = decode_body(plain)?;
            return Ok(format!(
                "<html><body><pre>{}</pre></body></html>",
                html_escape::encode_text(&text)
            ));
        }
        Err(LecternError::MissingBody)
    }

    /// Header data for the resulting article.
    pub fn origin(&self) -> EmailOrigin {
        let (sender_name, sender_email) = self.sender();
        EmailOrigin { published_at: self.published_at(), sender_name, sender_email }
    }
}

/// RFC 2822 date, comments and obsolete zone names included.
///
/// A weekday that disagrees with the date is ignored rather than rejected.
fn parse_date(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc2822).ok().or_else(|| {
        let (_, rest) = raw.split_once(',')?;
        OffsetDateTime::parse(rest.trim_start(), &Rfc2822).ok()
    })
}

fn first_single(addr: &MailAddr) -> Option<SingleInfo> {
    match addr {
        MailAddr::Single(info) => Some(info.clone()),
        MailAddr::Group(group) => group.addrs.first().cloned(),
    }
}

/// Leaf parts in depth-first order, attachments skipped.
fn collect_parts<'m, 'a>(mail: &'m ParsedMail<'a>, out: &mut Vec<&'m ParsedMail<'a>>) {
    if mail.subparts.is_empty() {
        if mail.get_content_disposition().disposition != DispositionType::Attachment {
            out.push(mail);
        }
        return;
    }
    for part in &mail.subparts {
        collect_parts(part, out);
    }
}

/// Decodes with the declared charset, or as lossy UTF-8 when none is declared.
fn decode_body(part: &ParsedMail<'_>) -> Result<String> {
    if part.ctype.params.contains_key("charset") {
        Ok(part.get_body()?)
    } else {
        Ok(String::from_utf8_lossy(&part.get_body_raw()?).into_owned())
    }
}

/// Parses one raw message into an article.
///
/// # Errors
///
/// [`LecternError::MalformedEmail`] when the MIME structure is unreadable,
/// [`LecternError::MissingBody`] when there is no text part,
/// [`LecternError::EmptyContent`] or [`LecternError::ContentTooShort`] when the
/// Markdown has fewer than [`MIN_CONTENT_CHARS`] characters.
pub fn parse_email(raw: &[u8], config: &PipelineConfig) -> Result<ExtractedArticle> {
    let message = EmailMessage::parse(raw)?;
    let title = message.subject();
    let origin = message.origin();
    let html = message.html_body()?;

    tracing::debug!(subject = %title, sender = %origin.sender_email, bytes = html.len(), "parsed email body");

    let sanitized = sanitize_html(&html, &config.sanitize);
    let extraction = Readability::with_config(config.readability.clone()).extract(&sanitized, None);
    let markdown = to_markdown(&extraction.content_html);

    let length = markdown.chars().count();
    if length == 0 {
        return Err(LecternError::EmptyContent);
    }
    if length < MIN_CONTENT_CHARS {
        return Err(LecternError::ContentTooShort { length, minimum: MIN_CONTENT_CHARS });
    }

    tracing::info!(title = %title, sender = %origin.sender_name, chars = length, "extracted email");
    Ok(ExtractedArticle::email(title, markdown, origin))
}

/// [`parse_email`] on the contents of a file.
pub fn parse_email_file(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<ExtractedArticle> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LecternError::FileNotFound(path.to_path_buf()));
    }
    let raw = fs::read(path)?;
    parse_email(&raw, config)
}
