//! Core types for bounce extraction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An inbound notification as handed over by the mail connector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Message {
    /// Plain text body
    pub body: String,

    /// Top-level headers
    pub headers: Headers,

    /// Attachments in the order the connector delivered them
    pub attachments: Vec<Attachment>,
}

impl Message {
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Header map with ASCII case-insensitive lookup
///
/// Keys keep the spelling they arrived with. When two keys only differ in
/// case, the one that sorts first wins a lookup, so `X-Failed-Recipients`
/// is preferred over `x-failed-recipients`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a header, replacing any value stored under the same spelling
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a header value regardless of name case
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A file attached to the notification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Attachment {
    /// Declared file name (e.g. "details.eml")
    pub name: String,

    /// Declared content type, not always trustworthy
    pub content_type: String,

    /// Raw or base64-encoded content
    pub content: String,
}

impl Attachment {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }
}

/// Where a failed address was found
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Header,
    DsnFinalRecipient,
    DsnOriginalRecipient,
    BouncePattern,
    AttachmentHeader,
    AttachmentDsnFinalRecipient,
    AttachmentDsnOriginalRecipient,
    AttachmentBouncePattern,
}

impl Source {
    /// The same source, as seen inside an attachment
    #[must_use]
    pub const fn in_attachment(self) -> Self {
        match self {
            Self::Header | Self::AttachmentHeader => Self::AttachmentHeader,
            Self::DsnFinalRecipient | Self::AttachmentDsnFinalRecipient => {
                Self::AttachmentDsnFinalRecipient
            }
            Self::DsnOriginalRecipient | Self::AttachmentDsnOriginalRecipient => {
                Self::AttachmentDsnOriginalRecipient
            }
            Self::BouncePattern | Self::AttachmentBouncePattern => Self::AttachmentBouncePattern,
        }
    }

    #[must_use]
    pub const fn is_attachment(self) -> bool {
        matches!(
            self,
            Self::AttachmentHeader
                | Self::AttachmentDsnFinalRecipient
                | Self::AttachmentDsnOriginalRecipient
                | Self::AttachmentBouncePattern
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::DsnFinalRecipient => "dsn-final-recipient",
            Self::DsnOriginalRecipient => "dsn-original-recipient",
            Self::BouncePattern => "bounce-pattern",
            Self::AttachmentHeader => "attachment-header",
            Self::AttachmentDsnFinalRecipient => "attachment-dsn-final-recipient",
            Self::AttachmentDsnOriginalRecipient => "attachment-dsn-original-recipient",
            Self::AttachmentBouncePattern => "attachment-bounce-pattern",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse, human-readable failure category
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FailureReason {
    #[serde(rename = "User not found")]
    UserNotFound,
    #[serde(rename = "Mailbox full")]
    MailboxFull,
    #[serde(rename = "Domain not found")]
    DomainNotFound,
    #[serde(rename = "Connection failed")]
    ConnectionFailed,
    #[serde(rename = "Blocked or blacklisted")]
    Blocked,
    #[serde(rename = "Invalid address format")]
    InvalidAddress,
    #[serde(rename = "Relay denied")]
    RelayDenied,
    #[serde(rename = "Message too large")]
    MessageTooLarge,
    #[default]
    #[serde(rename = "Delivery failed")]
    DeliveryFailed,
}

impl FailureReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserNotFound => "User not found",
            Self::MailboxFull => "Mailbox full",
            Self::DomainNotFound => "Domain not found",
            Self::ConnectionFailed => "Connection failed",
            Self::Blocked => "Blocked or blacklisted",
            Self::InvalidAddress => "Invalid address format",
            Self::RelayDenied => "Relay denied",
            Self::MessageTooLarge => "Message too large",
            Self::DeliveryFailed => "Delivery failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DSN diagnostic fields found in one body
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Enhanced status code (e.g. "5.1.1")
    pub status_code: Option<String>,

    /// Diagnostic-Code text without its type tag
    pub diagnostic_code: Option<String>,

    /// Action keyword, lowercased (e.g. "failed")
    pub action: Option<String>,
}

impl Diagnostics {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status_code.is_none() && self.diagnostic_code.is_none() && self.action.is_none()
    }
}

/// An address found by one of the scanners, before message-level
/// diagnostics are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundAddress {
    /// Lowercased address
    pub address: String,

    pub source: Source,

    /// Set for addresses found inside an attachment
    pub attachment_name: Option<String>,

    /// Attachment-level diagnostic code, if any
    pub diagnostic_code: Option<String>,

    /// Attachment-level status code, if any
    pub status_code: Option<String>,

    /// Attachment-level failure reason, if one was derived
    pub failure_reason: Option<FailureReason>,
}

impl FoundAddress {
    #[must_use]
    pub fn new(address: &str, source: Source) -> Self {
        Self {
            address: address.to_lowercase(),
            source,
            attachment_name: None,
            diagnostic_code: None,
            status_code: None,
            failure_reason: None,
        }
    }

    /// Re-tag an address found in attachment content
    #[must_use]
    pub fn in_attachment(mut self, name: &str) -> Self {
        self.source = self.source.in_attachment();
        self.attachment_name = Some(name.to_string());
        self
    }
}

/// A failed recipient with its attributed diagnostics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedAddress {
    /// Lowercased address
    pub address: String,

    pub failure_reason: FailureReason,

    pub diagnostic_code: Option<String>,

    pub status_code: Option<String>,

    pub source: Source,

    /// Name of the attachment the address came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
}
