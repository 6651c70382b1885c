//! Wire payload construction
//!
//! The external mail API accepts one raw message per send: `\n`-joined
//! headers, a blank line, then the body, with the whole blob base64url
//! encoded (`+` → `-`, `/` → `_`, padding stripped). Attachments turn
//! the body into a multipart/mixed structure with base64 parts.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sendlater_storage::models::Attachment;
use uuid::Uuid;

/// A fully-resolved message handed to the executor. Recipient lists are
/// already split and trimmed; the scheduler owns that boundary.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// Build and encode the raw wire payload for one message
pub fn encode_raw_message(message: &OutgoingMessage) -> String {
    URL_SAFE_NO_PAD.encode(build_wire_blob(message))
}

/// The pre-encoding wire blob
fn build_wire_blob(message: &OutgoingMessage) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("To: {}", message.to.join(", ")));
    if !message.cc.is_empty() {
        lines.push(format!("Cc: {}", message.cc.join(", ")));
    }
    if !message.bcc.is_empty() {
        lines.push(format!("Bcc: {}", message.bcc.join(", ")));
    }
    lines.push(format!("Subject: {}", message.subject));
    lines.push("MIME-Version: 1.0".to_string());

    if message.attachments.is_empty() {
        lines.push("Content-Type: text/html; charset=\"UTF-8\"".to_string());
        lines.push(String::new());
        lines.push(message.body.clone());
        return lines.join("\n");
    }

    let boundary = format!("part_{}", Uuid::new_v4().simple());
    lines.push(format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"",
        boundary
    ));
    lines.push(String::new());

    lines.push(format!("--{}", boundary));
    lines.push("Content-Type: text/html; charset=\"UTF-8\"".to_string());
    lines.push(String::new());
    lines.push(message.body.clone());

    for attachment in &message.attachments {
        lines.push(format!("--{}", boundary));
        lines.push(format!(
            "Content-Type: {}; name=\"{}\"",
            attachment.mime_type, attachment.filename
        ));
        lines.push(format!(
            "Content-Disposition: attachment; filename=\"{}\"",
            attachment.filename
        ));
        lines.push("Content-Transfer-Encoding: base64".to_string());
        lines.push(String::new());
        lines.push(attachment.content_b64.clone());
    }

    lines.push(format!("--{}--", boundary));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            to: vec!["a@x.com".to_string()],
            cc: vec!["b@y.com".to_string(), "c@z.com".to_string()],
            bcc: vec![],
            subject: "Quarterly update".to_string(),
            body: "<p>Hello</p>".to_string(),
            attachments: vec![],
        }
    }

    #[test]
    fn test_blob_framing() {
        let blob = build_wire_blob(&message());
        let (headers, body) = blob.split_once("\n\n").unwrap();

        assert!(headers.contains("To: a@x.com"));
        assert!(headers.contains("Cc: b@y.com, c@z.com"));
        assert!(!headers.contains("Bcc:"));
        assert!(headers.contains("Subject: Quarterly update"));
        assert!(headers.contains("Content-Type: text/html"));
        assert_eq!(body, "<p>Hello</p>");
    }

    #[test]
    fn test_encoding_is_base64url_without_padding() {
        let raw = encode_raw_message(&message());
        assert!(!raw.contains('+'));
        assert!(!raw.contains('/'));
        assert!(!raw.contains('='));

        let decoded = URL_SAFE_NO_PAD.decode(raw.as_bytes()).unwrap();
        let blob = String::from_utf8(decoded).unwrap();
        assert_eq!(blob, build_wire_blob(&message()));
    }

    #[test]
    fn test_attachment_framing() {
        let mut msg = message();
        msg.attachments.push(Attachment {
            filename: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 3,
            content_b64: "AAAA".to_string(),
        });

        let blob = build_wire_blob(&msg);

        assert!(blob.contains("Content-Type: multipart/mixed; boundary="));
        assert!(blob.contains("Content-Disposition: attachment; filename=\"report.pdf\""));
        assert!(blob.contains("Content-Transfer-Encoding: base64\n\nAAAA"));
        // Closing boundary marker terminates the blob
        assert!(blob.ends_with("--"));
    }
}
