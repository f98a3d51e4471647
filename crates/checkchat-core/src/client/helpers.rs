//! Pure helpers: error bodies and URL building (no HTTP, no status logic).

use reqwest::Url;

use crate::error::{ClientError, ClientResult};

/// Pull a human-readable message out of an error body.
///
/// Expected format: `{"error": "No metrics available"}`. Falls back to the
/// raw body (truncated) or the status line.
pub(crate) fn parse_error_body(body: &str, status_line: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json.get("error").and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status_line.to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Join the base URL and a path segment.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url, path.trim_start_matches('/'))
}

/// Like [`endpoint`], then append `segment` as one percent-encoded path
/// segment. `/`, `?` and `#` in the segment cannot change the route.
pub(crate) fn endpoint_with_segment(
    base_url: &str,
    path: &str,
    segment: &str,
) -> ClientResult<String> {
    let mut url = Url::parse(&endpoint(base_url, path))
        .map_err(|e| ClientError::config(format!("invalid dashboard URL {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::config(format!("dashboard URL {} cannot take a path", base_url)))?
        .push(segment);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_body_json() {
        let msg = parse_error_body(r#"{"error": "No metrics available"}"#, "400 Bad Request");
        assert_eq!(msg, "No metrics available");
    }

    #[test]
    fn test_parse_error_body_fallbacks() {
        assert_eq!(parse_error_body("", "502 Bad Gateway"), "502 Bad Gateway");
        assert_eq!(parse_error_body("upstream down\n", "502"), "upstream down");
        assert_eq!(parse_error_body(&"x".repeat(500), "500").len(), 200);
    }

    #[test]
    fn test_endpoint_with_segment_encodes_reserved_characters() {
        let base = "http://127.0.0.1:5000/api";
        assert_eq!(
            endpoint_with_segment(base, "metrics", "abc123").unwrap(),
            "http://127.0.0.1:5000/api/metrics/abc123"
        );
        assert_eq!(
            endpoint_with_segment(base, "metrics", "a/b").unwrap(),
            "http://127.0.0.1:5000/api/metrics/a%2Fb"
        );
        assert_eq!(
            endpoint_with_segment(base, "metrics", "x?y#z").unwrap(),
            "http://127.0.0.1:5000/api/metrics/x%3Fy%23z"
        );
    }

    #[test]
    fn test_endpoint_with_segment_rejects_bad_base() {
        let err = endpoint_with_segment("not a url", "metrics", "1").unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint("http://127.0.0.1:5000/api", "/metrics/3"),
            "http://127.0.0.1:5000/api/metrics/3"
        );
    }
}
