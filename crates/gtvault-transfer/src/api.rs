//! Encrypt/decrypt calls against a gtvault pipeline.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use gtvault_core::{types::DecryptResponse, ErrorBody, ErrorKind};
use reqwest::{header::CONTENT_TYPE, Response, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{TransferError, TransferResult};

/// The two pipeline operations the transfer client needs.
pub trait ExportApi: Send + Sync {
    /// Seal `data`; returns the envelope bytes.
    fn encrypt(&self, data: &Value) -> impl Future<Output = TransferResult<Bytes>> + Send;

    /// Open an envelope; returns the decrypted JSON.
    fn decrypt(&self, envelope: Bytes) -> impl Future<Output = TransferResult<Value>> + Send;
}

/// [`ExportApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpExportApi {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExportApi {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> TransferResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }
}

impl ExportApi for HttpExportApi {
    async fn encrypt(&self, data: &Value) -> TransferResult<Bytes> {
        let response = self
            .client
            .post(self.url("/api/encrypt"))
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let response = check(response).await?;
        let envelope = response.bytes().await?;
        debug!(size = envelope.len(), "received envelope");
        Ok(envelope)
    }

    async fn decrypt(&self, envelope: Bytes) -> TransferResult<Value> {
        let response = self
            .client
            .post(self.url("/api/decrypt"))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(envelope)
            .send()
            .await?;
        let response = check(response).await?;
        let body: DecryptResponse = response
            .json()
            .await
            .map_err(|e| TransferError::Protocol(format!("decrypt response: {e}")))?;
        if !body.success {
            return Err(TransferError::Protocol("decrypt response without success".into()));
        }
        Ok(body.data)
    }
}

/// Pass success through; turn anything else into [`TransferError::Remote`].
async fn check(response: Response) -> TransferResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(remote_error(status, &text))
}

/// Build a remote error from a failed response body, falling back to the
/// status code when the body is not an error object.
pub fn remote_error(status: StatusCode, body: &str) -> TransferError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => TransferError::Remote {
            kind: err.error,
            status: status.as_u16(),
            message: err.message,
        },
        Err(_) => TransferError::Remote {
            kind: kind_for_status(status),
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        },
    }
}

pub fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST => ErrorKind::InvalidInput,
        StatusCode::PAYLOAD_TOO_LARGE => ErrorKind::PayloadTooLarge,
        StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::MalformedData,
        StatusCode::REQUEST_TIMEOUT => ErrorKind::Timeout,
        _ => ErrorKind::InternalError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_from_body() {
        let body = r#"{"error":"AUTH_TAG_VERIFICATION_FAILED","message":"Data integrity check failed","timestamp":"t"}"#;
        match remote_error(StatusCode::UNPROCESSABLE_ENTITY, body) {
            TransferError::Remote {
                kind,
                status,
                message,
            } => {
                assert_eq!(kind, ErrorKind::AuthTagVerificationFailed);
                assert_eq!(status, 422);
                assert_eq!(message, "Data integrity check failed");
            }
            other => panic!("expected Remote, got: {other:?}"),
        }
    }

    #[test]
    fn test_remote_error_from_status() {
        let err = remote_error(StatusCode::PAYLOAD_TOO_LARGE, "<html>nginx</html>");
        assert_eq!(err.kind(), Some(ErrorKind::PayloadTooLarge));

        let err = remote_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.kind(), Some(ErrorKind::InternalError));
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let api = HttpExportApi::new("http://localhost:8787/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.url("/api/encrypt"), "http://localhost:8787/api/encrypt");
    }
}
