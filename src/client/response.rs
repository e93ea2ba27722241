//! Error-body handling for admin API responses.

/// Message used when a failed response carries nothing readable.
pub const GENERIC_FAILURE: &str = "request failed";

const MAX_BODY_MESSAGE: usize = 200;

/// Extract a human-readable message from a failed response body.
///
/// Prefers a JSON `message`, `error` or `detail` string field, then the
/// trimmed body text, then [`GENERIC_FAILURE`].
pub fn error_message_from_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return GENERIC_FAILURE.to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "error", "detail"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return s.trim().to_string();
                }
                // {"error": {"message": "..."}}
                Some(serde_json::Value::Object(inner)) => {
                    if let Some(serde_json::Value::String(s)) = inner.get("message") {
                        if !s.trim().is_empty() {
                            return s.trim().to_string();
                        }
                    }
                }
                _ => {}
            }
        }
        // JSON without a usable message; the raw body is not helpful either.
        if value.is_object() {
            return GENERIC_FAILURE.to_string();
        }
    }

    if trimmed.chars().count() > MAX_BODY_MESSAGE {
        let cut: String = trimmed.chars().take(MAX_BODY_MESSAGE).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_message_field() {
        assert_eq!(
            error_message_from_body(r#"{"message": "Pipeline not found", "error": "x"}"#),
            "Pipeline not found"
        );
    }

    #[test]
    fn test_error_and_detail_fields() {
        assert_eq!(error_message_from_body(r#"{"error": "forbidden"}"#), "forbidden");
        assert_eq!(
            error_message_from_body(r#"{"detail": "Not authenticated"}"#),
            "Not authenticated"
        );
        assert_eq!(
            error_message_from_body(r#"{"error": {"message": "run already finished"}}"#),
            "run already finished"
        );
    }

    #[test]
    fn test_falls_back_to_body_text() {
        assert_eq!(error_message_from_body("Bad Gateway\n"), "Bad Gateway");
        let long = "x".repeat(500);
        assert_eq!(error_message_from_body(&long).len(), MAX_BODY_MESSAGE + 3);
    }

    #[test]
    fn test_generic_fallback() {
        assert_eq!(error_message_from_body(""), GENERIC_FAILURE);
        assert_eq!(error_message_from_body("   "), GENERIC_FAILURE);
        assert_eq!(error_message_from_body(r#"{"code": 17}"#), GENERIC_FAILURE);
    }
}
