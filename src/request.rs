//! Request/response envelope for callers that expose the extractor over
//! HTTP or a queue

use crate::error::{ExtractError, Result};
use crate::parser::extract_failed_addresses;
use crate::types::{ExtractedAddress, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A bounce notification submitted for processing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    /// Connector message id, echoed back for correlation
    #[serde(default)]
    pub message_id: Option<String>,

    #[serde(default)]
    pub subject: Option<String>,

    /// Sender of the notification (usually MAILER-DAEMON)
    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub received_date_time: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub message: Message,
}

/// Successful processing result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub message_id: String,
    pub extracted_addresses: Vec<ExtractedAddress>,
    pub processing_details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_date_time: Option<DateTime<Utc>>,
}

/// Validate a request and run the extractor on it
pub fn process_request(request: ProcessRequest) -> Result<ProcessResponse> {
    let Some(message_id) = request.message_id.filter(|id| !id.is_empty()) else {
        warn!("Rejecting bounce notification without messageId");
        return Err(ExtractError::MissingMessageId);
    };

    let extracted_addresses = extract_failed_addresses(&request.message);
    let count = extracted_addresses.len();

    info!(
        "Processed message {message_id} ({}), found {count} address(es)",
        request.subject.as_deref().unwrap_or("(no subject)")
    );

    Ok(ProcessResponse {
        success: true,
        message_id,
        extracted_addresses,
        processing_details: format!("Extracted {count} failed address(es) from message"),
        received_date_time: request.received_date_time,
    })
}

/// Deserialize a JSON request body and process it
pub fn process_json(raw: &[u8]) -> Result<ProcessResponse> {
    let request: ProcessRequest = serde_json::from_slice(raw)?;
    process_request(request)
}
