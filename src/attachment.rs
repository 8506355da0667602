//! Attachment processing: base64 sniffing, `.eml` parsing and re-running
//! the scanners over attached bounce reports

use crate::diagnostics::{extract_diagnostics, extract_failure_reason};
use crate::scanner::{extract_from_bounce_patterns, extract_from_dsn, extract_from_header};
use crate::types::{Attachment, FoundAddress, Headers};
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Standard alphabet, padding optional
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static BLANK_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n\r?\n").unwrap());

static HEADER_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):\s*(.*)$").unwrap());

/// A message/rfc822 attachment split into headers and body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmlContent {
    /// Header names are lowercased
    pub headers: Headers,
    pub body: String,
}

/// How an attachment gets scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachmentKind {
    Eml,
    PlainText,
    Other,
}

impl AttachmentKind {
    #[allow(clippy::case_sensitive_file_extension_comparisons)]
    fn detect(attachment: &Attachment) -> Self {
        let name = attachment.name.to_lowercase();
        let content_type = attachment.content_type.to_lowercase();

        if name.ends_with(".eml")
            || content_type.contains("message/rfc822")
            || content_type.contains("text/rfc822")
        {
            Self::Eml
        } else if content_type.contains("text/plain") || name.ends_with(".txt") {
            Self::PlainText
        } else {
            Self::Other
        }
    }
}

/// Split raw `.eml` text at the first blank line and parse its headers
///
/// Folded header lines (starting with whitespace) are joined to the previous
/// value with a single space. Lines that are neither a `Name: value` pair
/// nor a continuation are skipped. Without a blank line the whole content
/// is treated as headers and the body is empty.
#[must_use]
pub fn parse_eml_content(content: &str) -> EmlContent {
    let (header_section, body) = BLANK_LINE_REGEX
        .find(content)
        .map_or((content, ""), |m| (&content[..m.start()], &content[m.end()..]));

    let mut headers = Headers::new();
    let mut current: Option<(String, String)> = None;

    for line in header_section.lines() {
        if line.starts_with(char::is_whitespace) {
            let folded = line.trim();
            if let Some((_, value)) = current.as_mut()
                && !folded.is_empty()
            {
                value.push(' ');
                value.push_str(folded);
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            headers.insert(name, value);
        }

        if let Some(cap) = HEADER_LINE_REGEX.captures(line) {
            let name = cap[1].trim().to_lowercase();
            if !name.is_empty() {
                current = Some((name, cap[2].trim_end().to_string()));
            }
        }
    }

    if let Some((name, value)) = current {
        headers.insert(name, value);
    }

    EmlContent {
        headers,
        body: body.to_string(),
    }
}

/// Decode attachment content that is declared or looks base64-encoded
///
/// Anything that fails to decode into UTF-8 text is returned unchanged.
#[must_use]
pub fn decode_content(attachment: &Attachment) -> String {
    let raw = attachment.content.as_str();
    if !attachment.content_type.to_lowercase().contains("base64") && !looks_like_base64(raw) {
        return raw.to_string();
    }

    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match BASE64.decode(compact.as_bytes()).map(String::from_utf8) {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => {
            debug!("Attachment {} decoded to non-UTF-8, using raw content", attachment.name);
            raw.to_string()
        }
        Err(e) => {
            debug!("Attachment {} is not base64 ({e}), using raw content", attachment.name);
            raw.to_string()
        }
    }
}

fn looks_like_base64(content: &str) -> bool {
    let mut compact = content.chars().filter(|c| !c.is_whitespace()).peekable();
    compact.peek().is_some()
        && compact.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
}

/// Extract failed addresses from `.eml` and plain-text attachments
///
/// Addresses from `.eml` attachments carry the diagnostics and failure
/// reason of the attached body; plain-text ones carry none. The result is
/// deduplicated by address, first occurrence winning.
#[must_use]
pub fn extract_from_attachments(attachments: &[Attachment]) -> Vec<FoundAddress> {
    let mut found = Vec::new();

    for attachment in attachments {
        if attachment.content.is_empty() {
            continue;
        }

        match AttachmentKind::detect(attachment) {
            AttachmentKind::Eml => found.extend(scan_eml(attachment)),
            AttachmentKind::PlainText => found.extend(scan_plain_text(attachment)),
            AttachmentKind::Other => {
                trace!(
                    "Skipping attachment {} ({})",
                    attachment.name, attachment.content_type
                );
            }
        }
    }

    dedup_by_address(found)
}

fn scan_eml(attachment: &Attachment) -> Vec<FoundAddress> {
    let eml = parse_eml_content(&decode_content(attachment));

    let diagnostics = extract_diagnostics(&eml.body);
    let failure_reason = extract_failure_reason(&eml.body);

    let found: Vec<FoundAddress> = extract_from_header(&eml.headers)
        .into_iter()
        .chain(extract_from_dsn(&eml.body))
        .chain(extract_from_bounce_patterns(&eml.body))
        .map(|addr| {
            let mut addr = addr.in_attachment(&attachment.name);
            if addr.diagnostic_code.is_none() {
                addr.diagnostic_code.clone_from(&diagnostics.diagnostic_code);
                addr.status_code.clone_from(&diagnostics.status_code);
                addr.failure_reason = addr.failure_reason.or(Some(failure_reason));
            }
            addr
        })
        .collect();

    debug!(
        "Attachment {}: {} address(es), reason {failure_reason}",
        attachment.name,
        found.len()
    );
    found
}

fn scan_plain_text(attachment: &Attachment) -> Vec<FoundAddress> {
    let content = decode_content(attachment);

    let found: Vec<FoundAddress> = extract_from_dsn(&content)
        .into_iter()
        .chain(extract_from_bounce_patterns(&content))
        .map(|addr| addr.in_attachment(&attachment.name))
        .collect();

    debug!(
        "Attachment {}: {} address(es) in plain text",
        attachment.name,
        found.len()
    );
    found
}

/// Keep the first record per address, preserving order
pub(crate) fn dedup_by_address(found: Vec<FoundAddress>) -> Vec<FoundAddress> {
    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|addr| seen.insert(addr.address.clone()))
        .collect()
}
