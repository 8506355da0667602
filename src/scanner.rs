//! Address scanners: failure header, DSN recipient fields and free-text
//! bounce phrasing

use crate::types::{FoundAddress, Headers, Source};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Header some MTAs (Exim, Gmail) add to list the recipients that failed
pub const FAILED_RECIPIENTS_HEADER: &str = "X-Failed-Recipients";

// Regex patterns
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

static FINAL_RECIPIENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Final-Recipient:[ \t]*(?:[a-z][a-z0-9-]*[ \t]*;)?[ \t]*([^\r\n]+)").unwrap()
});

static ORIGINAL_RECIPIENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Original-Recipient:[ \t]*(?:[a-z][a-z0-9-]*[ \t]*;)?[ \t]*([^\r\n]+)").unwrap()
});

const ADDRESS: &str = r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})";

/// Vendor bounce phrasing, in evaluation order. Each pattern captures the
/// address in group 1. Case folding is confined to the phrases so the
/// address class stays ASCII.
static BOUNCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(
            r"(?i:could not be delivered to|failed to deliver to|undeliverable to|rejected by|bounced from|Delivery has failed to)[:\s]*{ADDRESS}"
        ),
        format!(
            r"(?i:The following recipient|Recipient address|these recipients or groups)[:\s]*\n*\s*{ADDRESS}"
        ),
        format!(r"(?i:User unknown|Mailbox not found|Invalid recipient)\s*[:<]?\s*{ADDRESS}"),
        format!(r"<{ADDRESS}>.*(?i:failed|rejected|bounced|undeliverable)"),
        // a line holding nothing but an address
        format!(r"(?mR)^{ADDRESS}$"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Extract addresses listed in the `X-Failed-Recipients` header
#[must_use]
pub fn extract_from_header(headers: &Headers) -> Vec<FoundAddress> {
    let Some(value) = headers.get(FAILED_RECIPIENTS_HEADER) else {
        return Vec::new();
    };

    let found: Vec<FoundAddress> = EMAIL_REGEX
        .find_iter(value)
        .map(|m| FoundAddress::new(m.as_str(), Source::Header))
        .collect();

    trace!("{} address(es) in {FAILED_RECIPIENTS_HEADER}", found.len());
    found
}

/// Extract `Final-Recipient` and `Original-Recipient` addresses (RFC 3464)
///
/// All occurrences of each field are reported, final recipients first.
#[must_use]
pub fn extract_from_dsn(body: &str) -> Vec<FoundAddress> {
    let mut found = scan_recipient_field(body, &FINAL_RECIPIENT_REGEX, Source::DsnFinalRecipient);
    found.extend(scan_recipient_field(
        body,
        &ORIGINAL_RECIPIENT_REGEX,
        Source::DsnOriginalRecipient,
    ));

    trace!("{} address(es) in DSN recipient fields", found.len());
    found
}

fn scan_recipient_field(body: &str, field: &Regex, source: Source) -> Vec<FoundAddress> {
    field
        .captures_iter(body)
        .filter_map(|cap| cap.get(1))
        .flat_map(|value| EMAIL_REGEX.find_iter(value.as_str()))
        .map(|m| FoundAddress::new(m.as_str(), source))
        .collect()
}

/// Extract addresses from free-text bounce phrasing
///
/// Matching is deliberately loose (a bare address on its own line counts),
/// so the same address is often reported more than once. Callers dedupe.
#[must_use]
pub fn extract_from_bounce_patterns(body: &str) -> Vec<FoundAddress> {
    let found: Vec<FoundAddress> = BOUNCE_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(body))
        .filter_map(|cap| cap.get(1))
        .map(|m| FoundAddress::new(m.as_str(), Source::BouncePattern))
        .collect();

    trace!("{} address(es) from bounce patterns", found.len());
    found
}
