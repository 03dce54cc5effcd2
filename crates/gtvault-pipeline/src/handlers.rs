//! Encrypt/decrypt request handlers
//!
//! Both handlers run the same shape: validate (content type, body, size,
//! deadline), process (codec call), respond. Any validation failure exits
//! before the codec is reached.

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, Extension, Request, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use gtvault_core::{
    config::LimitsConfig,
    naming::{export_filename, iso_timestamp},
    types::DecryptResponse,
    ErrorKind,
};
use gtvault_crypto::{EnvelopeCodec, HEADER_SIZE};
use tracing::{error, info, warn, Instrument};

use crate::content;
use crate::deadline::Deadline;
use crate::error::PipelineError;
use crate::metrics::Operation;
use crate::state::PipelineState;

/// When the request entered the router, before the body was read.
#[derive(Debug, Clone, Copy)]
pub struct RequestStart(pub Instant);

/// Middleware: stamp the request start time and open a request span.
pub async fn stamp_request(mut req: Request, next: Next) -> Response {
    req.extensions_mut().insert(RequestStart(Instant::now()));
    let span = tracing::info_span!(
        "request",
        request_id = %uuid::Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    next.run(req).instrument(span).await
}

/// Output of a successful seal.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub envelope: Vec<u8>,
    pub original_size: usize,
}

/// Seal the `data` field of a JSON request body.
///
/// The content type must already have been checked.
pub fn seal_json(
    codec: &EnvelopeCodec,
    limits: &LimitsConfig,
    body: &[u8],
    deadline: &Deadline,
) -> Result<Sealed, PipelineError> {
    let request: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        PipelineError::invalid_input("Request body is not valid JSON").with_details(e.to_string())
    })?;

    let data = match request.get("data") {
        Some(data) if !data.is_null() => data,
        _ => {
            return Err(PipelineError::invalid_input(
                "Request body must contain a `data` field",
            ))
        }
    };

    seal_value(codec, limits, data, deadline)
}

/// Seal an already parsed JSON value under the payload ceiling.
pub fn seal_value(
    codec: &EnvelopeCodec,
    limits: &LimitsConfig,
    data: &serde_json::Value,
    deadline: &Deadline,
) -> Result<Sealed, PipelineError> {
    let plaintext = serde_json::to_string(data).map_err(|e| {
        PipelineError::internal("Failed to serialize data").with_details(e.to_string())
    })?;

    if plaintext.len() > limits.max_payload_bytes {
        return Err(PipelineError::payload_too_large(
            plaintext.len(),
            limits.max_payload_bytes,
        ));
    }

    deadline.check()?;

    let envelope = codec.encrypt(&plaintext, None)?;
    Ok(Sealed {
        envelope: envelope.to_bytes(),
        original_size: plaintext.len(),
    })
}

/// Open an envelope and parse its plaintext as JSON.
///
/// The content type must already have been checked.
pub fn open_envelope(
    codec: &EnvelopeCodec,
    limits: &LimitsConfig,
    body: &[u8],
    deadline: &Deadline,
) -> Result<serde_json::Value, PipelineError> {
    if body.is_empty() {
        return Err(PipelineError::invalid_input("Request body is empty"));
    }

    // a plaintext at the ceiling seals to ceiling + header
    let ceiling = limits.max_payload_bytes.saturating_add(HEADER_SIZE);
    if body.len() > ceiling {
        return Err(PipelineError::payload_too_large(body.len(), ceiling));
    }

    deadline.check()?;

    let plaintext = codec.decrypt(body, None)?;

    serde_json::from_str(&plaintext).map_err(|e| {
        PipelineError::new(
            ErrorKind::MalformedData,
            "Decrypted data is not valid JSON",
        )
        .with_details(e.to_string())
    })
}

/// `POST /api/encrypt`
pub async fn encrypt(
    State(state): State<PipelineState>,
    Extension(RequestStart(started)): Extension<RequestStart>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let deadline = state.deadline(started);

    let result = content::require_json(&headers)
        .and_then(|()| body.map_err(read_error))
        .and_then(|body| seal_json(state.codec(), state.limits(), &body, &deadline))
        .and_then(|sealed| sealed_response(&state, sealed));

    finish(&state, Operation::Encrypt, started, result)
}

/// `POST /api/decrypt`
pub async fn decrypt(
    State(state): State<PipelineState>,
    Extension(RequestStart(started)): Extension<RequestStart>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let deadline = state.deadline(started);

    let result = content::require_binary(&headers)
        .and_then(|()| body.map_err(read_error))
        .and_then(|body| open_envelope(state.codec(), state.limits(), &body, &deadline))
        .map(|data| {
            info!(operation = "decrypt", "opened state export");
            Json(DecryptResponse {
                success: true,
                data,
                timestamp: iso_timestamp(Utc::now()),
            })
            .into_response()
        });

    finish(&state, Operation::Decrypt, started, result)
}

fn sealed_response(state: &PipelineState, sealed: Sealed) -> Result<Response, PipelineError> {
    let now = Utc::now();
    let filename = export_filename(state.file_base(), state.file_extension(), now);

    info!(
        operation = "encrypt",
        original_size = sealed.original_size,
        encrypted_size = sealed.envelope.len(),
        "sealed state export"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .header("x-original-size", sealed.original_size)
        .header("x-encrypted-size", sealed.envelope.len())
        .header("x-timestamp", iso_timestamp(now))
        .body(Body::from(sealed.envelope))
        .map_err(|e| {
            PipelineError::internal("Failed to build response").with_details(e.to_string())
        })
}

fn read_error(rejection: BytesRejection) -> PipelineError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PipelineError::new(ErrorKind::PayloadTooLarge, "Request body too large")
            .with_details(rejection.body_text())
    } else {
        PipelineError::invalid_input("Failed to read request body")
            .with_details(rejection.body_text())
    }
}

fn finish(
    state: &PipelineState,
    operation: Operation,
    started: Instant,
    result: Result<Response, PipelineError>,
) -> Response {
    let elapsed = started.elapsed();
    match result {
        Ok(response) => {
            state.metrics().observe(operation, "ok", elapsed);
            response
        }
        Err(err) => {
            state.metrics().observe(operation, err.kind.as_str(), elapsed);
            if err.kind.is_server_fault() {
                error!(
                    operation = operation.as_str(),
                    kind = %err.kind,
                    details = err.details.as_deref().unwrap_or(""),
                    "request failed"
                );
            } else {
                warn!(
                    operation = operation.as_str(),
                    kind = %err.kind,
                    status = err.status().as_u16(),
                    "request rejected"
                );
            }
            err.into_response_for(state.environment())
        }
    }
}


#[cfg(test)]
mod proptest_suite {
    use super::*;
    use gtvault_core::CipherSuite;
    use gtvault_crypto::EnvelopeKey;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::new(
            Arc::new(EnvelopeKey::from_bytes([3u8; 32])),
            CipherSuite::ChaCha20Poly1305,
        )
    }

    proptest! {
        #[test]
        fn sealed_state_opens_to_same_json(
            watch in prop::collection::vec("[A-Z]{1,5}", 0..20),
            lessons in prop::collection::vec("[a-z0-9-]{1,12}", 0..20),
        ) {
            let codec = codec();
            let limits = LimitsConfig::default();
            let deadline = Deadline::from_limits(Instant::now(), &limits);
            let data = serde_json::json!({ "watchList": watch, "completedLessons": lessons });

            let sealed = seal_value(&codec, &limits, &data, &deadline).unwrap();
            let opened = open_envelope(&codec, &limits, &sealed.envelope, &deadline).unwrap();
            prop_assert_eq!(opened, data);
        }

        #[test]
        fn any_bit_flip_is_rejected(idx in any::<prop::sample::Index>(), bit in 0u8..8) {
            let codec = codec();
            let limits = LimitsConfig::default();
            let deadline = Deadline::from_limits(Instant::now(), &limits);
            let data = serde_json::json!({ "watchList": ["TSLA"] });

            let mut envelope = seal_value(&codec, &limits, &data, &deadline).unwrap().envelope;
            let i = idx.index(envelope.len());
            envelope[i] ^= 1 << bit;

            let err = open_envelope(&codec, &limits, &envelope, &deadline).unwrap_err();
            prop_assert_eq!(err.kind, ErrorKind::AuthTagVerificationFailed);
        }
    }
}
