//! Content-type gating

use axum::http::{header::CONTENT_TYPE, HeaderMap};

use crate::error::PipelineError;

/// Binary media types accepted by the decrypt endpoint.
const BINARY_TYPES: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/x-gt",
];

/// Lowercased media type without parameters, e.g. `application/json`.
pub fn media_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = raw.split(';').next()?.trim().to_ascii_lowercase();
    (!essence.is_empty()).then_some(essence)
}

pub fn is_json(media_type: Option<&str>) -> bool {
    match media_type {
        Some(mt) => mt == "application/json" || mt.ends_with("+json"),
        None => false,
    }
}

pub fn is_binary(media_type: Option<&str>) -> bool {
    media_type.is_some_and(|mt| BINARY_TYPES.contains(&mt))
}

pub fn require_json(headers: &HeaderMap) -> Result<(), PipelineError> {
    if is_json(media_type(headers).as_deref()) {
        Ok(())
    } else {
        Err(PipelineError::invalid_input(
            "Content-Type must be application/json",
        ))
    }
}

pub fn require_binary(headers: &HeaderMap) -> Result<(), PipelineError> {
    if is_binary(media_type(headers).as_deref()) {
        Ok(())
    } else {
        Err(PipelineError::invalid_input(
            "Content-Type must be application/octet-stream",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(ct: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        h
    }

    #[test]
    fn test_media_type_strips_params() {
        assert_eq!(
            media_type(&headers("Application/JSON; charset=utf-8")).as_deref(),
            Some("application/json")
        );
        assert_eq!(media_type(&HeaderMap::new()), None);
    }

    #[test]
    fn test_json_variants() {
        assert!(is_json(Some("application/json")));
        assert!(is_json(Some("application/vnd.gtvault+json")));
        assert!(!is_json(Some("text/plain")));
        assert!(!is_json(None));
    }

    #[test]
    fn test_binary_variants() {
        assert!(is_binary(Some("application/octet-stream")));
        assert!(is_binary(Some("application/x-gt")));
        assert!(!is_binary(Some("application/json")));
        assert!(!is_binary(None));
    }

    #[test]
    fn test_require_helpers() {
        assert!(require_json(&headers("application/json")).is_ok());
        assert!(require_json(&headers("application/octet-stream")).is_err());
        assert!(require_binary(&headers("application/octet-stream")).is_ok());
        assert!(require_binary(&HeaderMap::new()).is_err());
    }
}
