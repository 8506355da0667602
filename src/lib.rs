// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Bounce Address Extractor
//!
//! Pulls failed recipient addresses and failure diagnostics out of bounce
//! notifications: RFC 3464 delivery status reports, vendor-specific bounce
//! wording, and `.eml` or plain-text reports attached to the notification.
//!
//! # Sources
//!
//! - `X-Failed-Recipients` header
//! - `Final-Recipient` / `Original-Recipient` DSN fields
//! - Free-text bounce phrasing (Gmail, Office 365, Postfix, Exim...)
//! - Attached reports, base64-encoded or not, scanned with all of the above
//!
//! # Example
//!
//! ```rust
//! use bounce_extract::{FailureReason, Message, Source, extract_failed_addresses};
//!
//! let message = Message::new(
//!     "Final-Recipient: rfc822; gone@example.com\nStatus: 5.1.1\n\
//!      Diagnostic-Code: smtp; 550 User unknown",
//! )
//! .with_header("X-Failed-Recipients", "Gone@Example.com");
//!
//! let failed = extract_failed_addresses(&message);
//!
//! assert_eq!(failed.len(), 1);
//! assert_eq!(failed[0].address, "gone@example.com");
//! assert_eq!(failed[0].source, Source::Header);
//! assert_eq!(failed[0].status_code.as_deref(), Some("5.1.1"));
//! assert_eq!(failed[0].failure_reason, FailureReason::UserNotFound);
//! ```

mod attachment;
mod diagnostics;
mod error;
mod parser;
mod request;
mod scanner;
mod types;

pub use attachment::{EmlContent, decode_content, extract_from_attachments, parse_eml_content};
pub use diagnostics::{extract_diagnostics, extract_failure_reason};
pub use error::{ErrorResponse, ExtractError, Result};
pub use parser::extract_failed_addresses;
pub use request::{ProcessRequest, ProcessResponse, process_json, process_request};
pub use scanner::{
    FAILED_RECIPIENTS_HEADER, extract_from_bounce_patterns, extract_from_dsn, extract_from_header,
};
pub use types::*;
