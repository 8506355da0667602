//! Bounce extraction entry point

use crate::attachment::{dedup_by_address, extract_from_attachments};
use crate::diagnostics::{extract_diagnostics, extract_failure_reason};
use crate::scanner::{extract_from_bounce_patterns, extract_from_dsn, extract_from_header};
use crate::types::{ExtractedAddress, FoundAddress, Message};
use tracing::debug;

/// Extract every failed recipient from a bounce notification
///
/// Sources are scanned in a fixed order (failure header, DSN fields, bounce
/// phrasing, then attachments) and each address is reported once, with the
/// source that saw it first. Message-level diagnostics and failure reason
/// fill in whatever an attachment did not provide.
#[must_use]
pub fn extract_failed_addresses(message: &Message) -> Vec<ExtractedAddress> {
    let mut found: Vec<FoundAddress> = extract_from_header(&message.headers);
    found.extend(extract_from_dsn(&message.body));
    found.extend(extract_from_bounce_patterns(&message.body));
    found.extend(extract_from_attachments(&message.attachments));

    let candidates = found.len();
    let unique = dedup_by_address(found);

    let diagnostics = extract_diagnostics(&message.body);
    let failure_reason = extract_failure_reason(&message.body);

    debug!(
        "Extracted {} failed address(es) from {candidates} candidate(s), reason {failure_reason}",
        unique.len()
    );

    unique
        .into_iter()
        .map(|addr| ExtractedAddress {
            address: addr.address,
            failure_reason: addr.failure_reason.unwrap_or(failure_reason),
            diagnostic_code: addr
                .diagnostic_code
                .or_else(|| diagnostics.diagnostic_code.clone()),
            status_code: addr.status_code.or_else(|| diagnostics.status_code.clone()),
            source: addr.source,
            attachment_name: addr.attachment_name,
        })
        .collect()
}
