//! DSN diagnostic fields and failure-reason classification

use crate::types::{Diagnostics, FailureReason};
use regex::Regex;
use std::sync::LazyLock;

static STATUS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Status:\s*([0-9]+\.[0-9]+\.[0-9]+)").unwrap());

static DIAGNOSTIC_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Diagnostic-Code:[ \t]*(?:[a-z][a-z0-9-]*[ \t]*;)?[ \t]*([^\r\n]+)").unwrap()
});

static ACTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Action:[ \t]*(\w+)").unwrap());

/// Keyword groups in priority order; the first match decides.
static REASON_TABLE: LazyLock<Vec<(Regex, FailureReason)>> = LazyLock::new(|| {
    [
        (
            r"(?i)user unknown|user not found|mailbox not found|no such user|does not exist|RecipientNotFound",
            FailureReason::UserNotFound,
        ),
        (
            r"(?i)mailbox full|over quota|quota exceeded",
            FailureReason::MailboxFull,
        ),
        (
            r"(?i)domain not found|no mx record|dns error|domain.*does not exist",
            FailureReason::DomainNotFound,
        ),
        (
            r"(?i)connection refused|connection timed out",
            FailureReason::ConnectionFailed,
        ),
        (r"(?i)blocked|blacklisted|spam", FailureReason::Blocked),
        (
            r"(?i)invalid address|bad address",
            FailureReason::InvalidAddress,
        ),
        (
            r"(?i)relay denied|relaying not permitted",
            FailureReason::RelayDenied,
        ),
        (
            r"(?i)message too large|size limit exceeded",
            FailureReason::MessageTooLarge,
        ),
    ]
    .into_iter()
    .map(|(pattern, reason)| (Regex::new(pattern).unwrap(), reason))
    .collect()
});

/// Extract the first `Status`, `Diagnostic-Code` and `Action` fields
#[must_use]
pub fn extract_diagnostics(body: &str) -> Diagnostics {
    let status_code = first_capture(&STATUS_REGEX, body).map(str::to_string);

    let diagnostic_code = first_capture(&DIAGNOSTIC_CODE_REGEX, body)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string);

    let action = first_capture(&ACTION_REGEX, body).map(str::to_lowercase);

    Diagnostics {
        status_code,
        diagnostic_code,
        action,
    }
}

fn first_capture<'a>(regex: &Regex, body: &'a str) -> Option<&'a str> {
    regex
        .captures(body)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Classify a bounce body into a coarse failure category
///
/// Falls back to [`FailureReason::DeliveryFailed`] when nothing matches.
#[must_use]
pub fn extract_failure_reason(body: &str) -> FailureReason {
    REASON_TABLE
        .iter()
        .find(|(pattern, _)| pattern.is_match(body))
        .map_or(FailureReason::DeliveryFailed, |(_, reason)| *reason)
}
