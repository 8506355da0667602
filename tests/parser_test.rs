use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bounce_extract::*;
use std::collections::HashSet;

const GMAIL_DSN: &str = "This is an automatically generated Delivery Status Notification.

Delivery to the following recipient failed permanently:

     invalid.user@nonexistent-domain.com

Technical details of permanent failure:
Google tried to deliver your message, but it was rejected by the server for the recipient domain nonexistent-domain.com.

----- Original message -----

Final-Recipient: rfc822; invalid.user@nonexistent-domain.com
Action: failed
Status: 5.1.1
Remote-MTA: dns; nonexistent-domain.com
Diagnostic-Code: smtp; 550 5.1.1 The email account that you tried to reach does not exist.";

const OFFICE365_BOUNCE: &str = "Delivery has failed to these recipients or groups:

user@invalid-domain.xyz

The domain invalid-domain.xyz does not exist.

Diagnostic information for administrators:

Generating server: AM6PR03MB5123.eurprd03.prod.outlook.com

user@invalid-domain.xyz
Remote Server returned '550 5.1.10 RESOLVER.ADR.RecipientNotFound; Recipient not found by SMTP address lookup'

Original message headers:

From: sender@company.com
To: user@invalid-domain.xyz
Subject: Meeting Request
Date: Mon, 15 Jan 2024 10:00:00 +0000";

const MULTI_RECIPIENT: &str = "The following messages could not be delivered:

Final-Recipient: rfc822; user1@example.com
Action: failed
Status: 5.1.1
Diagnostic-Code: smtp; 550 User not found

Final-Recipient: rfc822; user2@example.com
Action: failed
Status: 5.2.1
Diagnostic-Code: smtp; 552 Mailbox over quota

Final-Recipient: rfc822; user3@example.com
Action: failed
Status: 5.1.2
Diagnostic-Code: smtp; 550 Domain not found";

const POSTFIX_SPAM: &str = "This is the mail system at host smtp.example.com.

I'm sorry to have to inform you that your message could not
be delivered to one or more recipients. It's attached below.

<blocked@strict-domain.com>: host mx.strict-domain.com[192.0.2.1] said:
    550 5.7.1 Message rejected as spam by Content Filtering

Final-Recipient: rfc822; blocked@strict-domain.com
Action: failed
Status: 5.7.1
Diagnostic-Code: smtp; 550 5.7.1 Message rejected as spam";

fn addresses(result: &[ExtractedAddress]) -> Vec<&str> {
    result.iter().map(|r| r.address.as_str()).collect()
}

#[test]
fn test_combines_sources_in_scan_order() {
    let message = Message::new(
        "Final-Recipient: rfc822; dsn@example.com\n\
         Your message could not be delivered to bounce@example.com",
    )
    .with_header("X-Failed-Recipients", "header@example.com");
    let result = extract_failed_addresses(&message);

    assert_eq!(
        addresses(&result),
        vec!["header@example.com", "dsn@example.com", "bounce@example.com"]
    );
    assert_eq!(result[0].source, Source::Header);
    assert_eq!(result[1].source, Source::DsnFinalRecipient);
    assert_eq!(result[2].source, Source::BouncePattern);
}

#[test]
fn test_deduplicates_first_source_wins() {
    let message = Message::new("could not be delivered to same@example.com")
        .with_header("X-Failed-Recipients", "same@example.com");
    let result = extract_failed_addresses(&message);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].source, Source::Header);
}

#[test]
fn test_attaches_message_diagnostics() {
    let message = Message::new(
        "
          Final-Recipient: rfc822; user@example.com
          Status: 5.1.1
          Diagnostic-Code: smtp; 550 User not found
        ",
    );
    let result = extract_failed_addresses(&message);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].status_code.as_deref(), Some("5.1.1"));
    assert!(result[0].diagnostic_code.as_deref().unwrap().contains("550"));
    assert_eq!(result[0].failure_reason, FailureReason::UserNotFound);
    assert!(result[0].attachment_name.is_none());
}

#[test]
fn test_empty_message() {
    let message = Message::default();

    assert!(extract_failed_addresses(&message).is_empty());
}

#[test]
fn test_uppercase_header_address_normalized() {
    let message = Message::new("").with_header("X-Failed-Recipients", "USER@EXAMPLE.COM");
    let result = extract_failed_addresses(&message);

    assert_eq!(addresses(&result), vec!["user@example.com"]);
}

#[test]
fn test_gmail_dsn() {
    let message = Message::new(GMAIL_DSN)
        .with_header("X-Failed-Recipients", "invalid.user@nonexistent-domain.com")
        .with_header("Content-Type", "multipart/report; report-type=delivery-status");
    let result = extract_failed_addresses(&message);

    assert_eq!(addresses(&result), vec!["invalid.user@nonexistent-domain.com"]);
    assert_eq!(result[0].source, Source::Header);
    assert_eq!(result[0].status_code.as_deref(), Some("5.1.1"));
    assert_eq!(result[0].failure_reason, FailureReason::UserNotFound);
}

#[test]
fn test_office365_bounce() {
    let result = extract_failed_addresses(&Message::new(OFFICE365_BOUNCE));

    assert_eq!(addresses(&result), vec!["user@invalid-domain.xyz"]);
    assert_eq!(result[0].source, Source::BouncePattern);
    assert_eq!(result[0].failure_reason, FailureReason::UserNotFound);
    assert!(result[0].status_code.is_none());
    assert!(result[0].diagnostic_code.is_none());
}

#[test]
fn test_multiple_recipients_share_message_diagnostics() {
    let message = Message::new(MULTI_RECIPIENT).with_header(
        "X-Failed-Recipients",
        "user1@example.com, user2@example.com, user3@example.com",
    );
    let result = extract_failed_addresses(&message);

    assert_eq!(
        addresses(&result),
        vec!["user1@example.com", "user2@example.com", "user3@example.com"]
    );
    assert!(result.iter().all(|r| r.status_code.as_deref() == Some("5.1.1")));
    assert!(result
        .iter()
        .all(|r| r.failure_reason == FailureReason::UserNotFound));
}

#[test]
fn test_postfix_spam_rejection() {
    let result = extract_failed_addresses(&Message::new(POSTFIX_SPAM));

    assert_eq!(addresses(&result), vec!["blocked@strict-domain.com"]);
    assert_eq!(result[0].source, Source::DsnFinalRecipient);
    assert_eq!(result[0].status_code.as_deref(), Some("5.7.1"));
    assert_eq!(
        result[0].diagnostic_code.as_deref(),
        Some("550 5.7.1 Message rejected as spam")
    );
    assert_eq!(result[0].failure_reason, FailureReason::Blocked);
}

#[test]
fn test_ordinary_mail_yields_nothing() {
    let message = Message::new("This is a normal email message with no bounce information.")
        .with_header("Content-Type", "text/plain");

    assert!(extract_failed_addresses(&message).is_empty());
}

#[test]
fn test_top_level_source_wins_over_attachment() {
    let message = Message::new("")
        .with_header("X-Failed-Recipients", "bounced@example.com")
        .with_attachment(Attachment::new(
            "bounce.eml",
            "",
            "Subject: x\n\nFinal-Recipient: rfc822; bounced@example.com\nStatus: 5.1.1",
        ));
    let result = extract_failed_addresses(&message);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].source, Source::Header);
    assert!(result[0].attachment_name.is_none());
    assert!(result[0].status_code.is_none());
}

#[test]
fn test_base64_eml_attachment_round_trip() {
    let eml = "X-Failed-Recipients: bounced@example.com\n\n\
               Final-Recipient: rfc822; bounced@example.com";
    let plain = Message::new("").with_attachment(Attachment::new("bounce.eml", "", eml));
    let encoded = Message::new("").with_attachment(Attachment::new(
        "bounce.eml",
        "message/rfc822; base64",
        STANDARD.encode(eml),
    ));

    let plain = extract_failed_addresses(&plain);
    let encoded = extract_failed_addresses(&encoded);

    assert_eq!(plain, encoded);
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].address, "bounced@example.com");
    assert_eq!(plain[0].source, Source::AttachmentHeader);
    assert_eq!(plain[0].attachment_name.as_deref(), Some("bounce.eml"));
}

#[test]
fn test_attachment_diagnostics_take_precedence() {
    let message = Message::new("Status: 4.4.7\nDiagnostic-Code: smtp; 421 try again later")
        .with_attachment(Attachment::new(
            "details.eml",
            "message/rfc822",
            "Subject: Undelivered\n\n\
             Final-Recipient: rfc822; att@example.com\n\
             Status: 5.1.1\n\
             Diagnostic-Code: smtp; 550 no such user",
        ));
    let result = extract_failed_addresses(&message);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].source, Source::AttachmentDsnFinalRecipient);
    assert_eq!(result[0].status_code.as_deref(), Some("5.1.1"));
    assert_eq!(result[0].diagnostic_code.as_deref(), Some("550 no such user"));
    assert_eq!(result[0].failure_reason, FailureReason::UserNotFound);
}

#[test]
fn test_attachment_without_diagnostics_inherits_fields_but_keeps_reason() {
    let message = Message::new(
        "Status: 5.7.1\nDiagnostic-Code: smtp; 554 sender blocked",
    )
    .with_attachment(Attachment::new(
        "details.eml",
        "",
        "Subject: Undelivered\n\nFinal-Recipient: rfc822; att@example.com",
    ));
    let result = extract_failed_addresses(&message);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].status_code.as_deref(), Some("5.7.1"));
    assert_eq!(result[0].diagnostic_code.as_deref(), Some("554 sender blocked"));
    // the attachment body produced its own (default) reason
    assert_eq!(result[0].failure_reason, FailureReason::DeliveryFailed);
}

#[test]
fn test_plain_text_attachment_inherits_message_reason() {
    let message = Message::new("Status: 5.2.2\nThe recipient's mailbox full")
        .with_attachment(Attachment::new(
            "details.txt",
            "text/plain",
            "Final-Recipient: rfc822; full@example.com",
        ));
    let result = extract_failed_addresses(&message);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].source, Source::AttachmentDsnFinalRecipient);
    assert_eq!(result[0].attachment_name.as_deref(), Some("details.txt"));
    assert_eq!(result[0].status_code.as_deref(), Some("5.2.2"));
    assert_eq!(result[0].failure_reason, FailureReason::MailboxFull);
}

#[test]
fn test_output_addresses_unique_and_lowercase() {
    let message = Message::new(MULTI_RECIPIENT)
        .with_header("X-Failed-Recipients", "User1@Example.com")
        .with_attachment(Attachment::new("a.eml", "", GMAIL_DSN))
        .with_attachment(Attachment::new("b.txt", "text/plain", OFFICE365_BOUNCE))
        .with_attachment(Attachment::new(
            "c.eml",
            "message/rfc822; base64",
            STANDARD.encode(format!("X-Failed-Recipients: USER2@example.com\n\n{POSTFIX_SPAM}")),
        ));
    let result = extract_failed_addresses(&message);

    let unique: HashSet<&str> = result.iter().map(|r| r.address.as_str()).collect();
    assert_eq!(unique.len(), result.len());
    assert!(result.iter().all(|r| r.address == r.address.to_lowercase()));
    assert!(unique.contains("blocked@strict-domain.com"));
    assert!(unique.contains("user@invalid-domain.xyz"));
}

#[test]
fn test_non_ascii_lookalike_address_ignored() {
    let message = Message::new("Your message could not be delivered to \u{17F}am@example.com");
    let result = extract_failed_addresses(&message);

    assert!(result.iter().all(|r| r.address.is_ascii()));
}
