//! Webhook payload normalization.
//!
//! The provider delivers status events in two encodings: JSON and the
//! legacy XML document format. Both are reduced to the same
//! `(envelope_id, status)` shape. Events that carry no envelope id are not
//! errors — the endpoint must stay quiet for unrecognized traffic so the
//! provider's retry machinery is never triggered by our own strictness.

use serde_json::Value;

use crate::error::ApiError;

/// A normalized envelope status event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeEvent {
    pub envelope_id: String,
    /// Lowercased provider status. May be empty when the payload carried an
    /// envelope id without a status.
    pub status: String,
}

/// Decode a raw webhook body into a normalized event.
///
/// Returns `Ok(None)` when the payload is well-formed but carries no
/// envelope id. Returns `ApiError::WebhookParse` only for bodies that fail
/// to parse in their declared encoding.
pub fn decode_event(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<Option<EnvelopeEvent>, ApiError> {
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);

    if is_json {
        decode_json(body)
    } else {
        decode_xml(body)
    }
}

/// JSON payloads carry the envelope id under `envelope_id` or `envelopeId`.
fn decode_json(body: &[u8]) -> Result<Option<EnvelopeEvent>, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::WebhookParse(format!("invalid JSON: {e}")))?;

    let envelope_id = value
        .get("envelope_id")
        .or_else(|| value.get("envelopeId"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    let Some(envelope_id) = envelope_id else {
        return Ok(None);
    };

    let status = value
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();

    Ok(Some(EnvelopeEvent {
        envelope_id: envelope_id.to_string(),
        status,
    }))
}

/// XML payloads nest the envelope id and status as direct children of an
/// `EnvelopeStatus` element. Recipient-level `Status` elements sit deeper
/// and must not be confused with the envelope's own status, so only
/// depth-one children count. The last occurrence wins when several are
/// present.
fn decode_xml(body: &[u8]) -> Result<Option<EnvelopeEvent>, ApiError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let xml = std::str::from_utf8(body)
        .map_err(|e| ApiError::WebhookParse(format!("invalid UTF-8: {e}")))?;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut result: Option<EnvelopeEvent> = None;

    // State while inside an EnvelopeStatus element.
    let mut in_envelope_status = false;
    let mut child_depth = 0usize;
    let mut current_child: Option<String> = None;
    let mut envelope_id: Option<String> = None;
    let mut status: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                let name = std::str::from_utf8(local.as_ref()).unwrap_or("");

                if !in_envelope_status {
                    if name == "EnvelopeStatus" {
                        in_envelope_status = true;
                        child_depth = 0;
                        envelope_id = None;
                        status = None;
                    }
                } else {
                    child_depth += 1;
                    if child_depth == 1 {
                        current_child = Some(name.to_string());
                    }
                }
            }
            Ok(Event::Empty(_)) => {
                // Self-closing elements carry no text; depth is unchanged.
            }
            Ok(Event::Text(e)) => {
                if in_envelope_status && child_depth == 1 {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_child.as_deref() {
                        Some("EnvelopeID") => envelope_id = Some(text),
                        Some("Status") => status = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let name = std::str::from_utf8(local.as_ref()).unwrap_or("");

                if in_envelope_status {
                    if child_depth == 0 && name == "EnvelopeStatus" {
                        if let Some(id) = envelope_id.take() {
                            result = Some(EnvelopeEvent {
                                envelope_id: id,
                                status: status.take().unwrap_or_default().to_lowercase(),
                            });
                        }
                        in_envelope_status = false;
                    } else {
                        if child_depth == 1 {
                            current_child = None;
                        }
                        child_depth = child_depth.saturating_sub(1);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ApiError::WebhookParse(format!("XML parse error: {e}")));
            }
            _ => {}
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_snake_case() {
        let event = decode_event(
            Some("application/json"),
            br#"{"envelope_id":"E1","status":"Completed"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.envelope_id, "E1");
        assert_eq!(event.status, "completed");
    }

    #[test]
    fn test_json_camel_case() {
        let event = decode_event(
            Some("application/json; charset=utf-8"),
            br#"{"envelopeId":"E2","status":"VOIDED"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.envelope_id, "E2");
        assert_eq!(event.status, "voided");
    }

    #[test]
    fn test_json_without_envelope_id_is_ignored() {
        let result = decode_event(Some("application/json"), br#"{"status":"completed"}"#).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_json_without_status_keeps_empty_status() {
        let event = decode_event(Some("application/json"), br#"{"envelope_id":"E3"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.envelope_id, "E3");
        assert_eq!(event.status, "");
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let err = decode_event(Some("application/json"), b"not json").unwrap_err();
        assert!(matches!(err, ApiError::WebhookParse(_)));
    }

    #[test]
    fn test_xml_basic_document() {
        let xml = br#"<?xml version="1.0"?>
            <DocuSignEnvelopeInformation>
              <EnvelopeStatus>
                <EnvelopeID>E4</EnvelopeID>
                <Status>Completed</Status>
              </EnvelopeStatus>
            </DocuSignEnvelopeInformation>"#;
        let event = decode_event(Some("text/xml"), xml).unwrap().unwrap();
        assert_eq!(event.envelope_id, "E4");
        assert_eq!(event.status, "completed");
    }

    #[test]
    fn test_xml_ignores_recipient_level_status() {
        // The recipient's own Status sits deeper than depth one and must
        // not override the envelope status.
        let xml = br#"
            <DocuSignEnvelopeInformation>
              <EnvelopeStatus>
                <RecipientStatuses>
                  <RecipientStatus>
                    <Status>Sent</Status>
                  </RecipientStatus>
                </RecipientStatuses>
                <EnvelopeID>E5</EnvelopeID>
                <Status>Declined</Status>
              </EnvelopeStatus>
            </DocuSignEnvelopeInformation>"#;
        let event = decode_event(None, xml).unwrap().unwrap();
        assert_eq!(event.envelope_id, "E5");
        assert_eq!(event.status, "declined");
    }

    #[test]
    fn test_xml_last_occurrence_wins() {
        let xml = br#"
            <Events>
              <EnvelopeStatus>
                <EnvelopeID>E6</EnvelopeID>
                <Status>Sent</Status>
              </EnvelopeStatus>
              <EnvelopeStatus>
                <EnvelopeID>E7</EnvelopeID>
                <Status>Completed</Status>
              </EnvelopeStatus>
            </Events>"#;
        let event = decode_event(Some("application/xml"), xml).unwrap().unwrap();
        assert_eq!(event.envelope_id, "E7");
        assert_eq!(event.status, "completed");
    }

    #[test]
    fn test_xml_without_envelope_id_is_ignored() {
        let xml = br#"
            <DocuSignEnvelopeInformation>
              <EnvelopeStatus>
                <Status>Completed</Status>
              </EnvelopeStatus>
            </DocuSignEnvelopeInformation>"#;
        assert!(decode_event(None, xml).unwrap().is_none());
    }

    #[test]
    fn test_xml_with_no_envelope_status_element_is_ignored() {
        let xml = b"<SomethingElse><Nested>value</Nested></SomethingElse>";
        assert!(decode_event(None, xml).unwrap().is_none());
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        let err = decode_event(None, b"<EnvelopeStatus><EnvelopeID>E8</Broken>").unwrap_err();
        assert!(matches!(err, ApiError::WebhookParse(_)));
    }

    #[test]
    fn test_missing_content_type_defaults_to_xml() {
        let xml = br#"<EnvelopeStatus><EnvelopeID>E9</EnvelopeID><Status>Voided</Status></EnvelopeStatus>"#;
        let event = decode_event(None, xml).unwrap().unwrap();
        assert_eq!(event.envelope_id, "E9");
        assert_eq!(event.status, "voided");
    }
}
