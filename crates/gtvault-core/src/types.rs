use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::naming::iso_timestamp;

/// AEAD construction used for envelopes.
///
/// Envelopes carry no algorithm tag, so every deployment sharing a key must
/// also agree on the suite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherSuite {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl std::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aes256Gcm => f.write_str("aes-256-gcm"),
            Self::ChaCha20Poly1305 => f.write_str("chacha20-poly1305"),
        }
    }
}

/// Application state exported into (and restored from) a `.gt` file.
///
/// Both lists are required on the wire; an object without them is not a
/// snapshot and must not be applied as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Ticker symbols on the watchlist
    pub watch_list: Vec<String>,
    /// Identifiers of completed lessons
    pub completed_lessons: Vec<String>,
    /// Semantic version of the exporting application
    #[serde(default)]
    pub version: String,
    /// ISO-8601 timestamp of the snapshot
    #[serde(default)]
    pub timestamp: String,
}

impl StateSnapshot {
    /// Build a snapshot from live state, stamped with `now`.
    pub fn capture(
        watch_list: Vec<String>,
        completed_lessons: Vec<String>,
        version: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            watch_list,
            completed_lessons,
            version: version.into(),
            timestamp: iso_timestamp(now),
        }
    }

    /// True when there is nothing a load could clobber.
    pub fn is_empty(&self) -> bool {
        self.watch_list.is_empty() && self.completed_lessons.is_empty()
    }
}

/// JSON body of every failed pipeline response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
    pub timestamp: String,
    /// Diagnostic text, only present in development mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// JSON body of a successful decrypt response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub success: bool,
    pub data: serde_json::Value,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_wire_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let snap = StateSnapshot::capture(
            vec!["TSLA".into()],
            vec!["l1".into()],
            "1.2.0",
            now,
        );
        let json = serde_json::to_value(&snap).unwrap();

        assert_eq!(json["watchList"][0], "TSLA");
        assert_eq!(json["completedLessons"][0], "l1");
        assert_eq!(json["version"], "1.2.0");
        assert_eq!(json["timestamp"], "2026-03-01T09:30:00.000Z");
    }

    #[test]
    fn test_snapshot_metadata_defaults() {
        let snap: StateSnapshot =
            serde_json::from_str(r#"{"watchList":["AAPL"],"completedLessons":[]}"#).unwrap();
        assert_eq!(snap.watch_list, vec!["AAPL"]);
        assert!(snap.completed_lessons.is_empty());
        assert!(snap.version.is_empty());
        assert!(snap.timestamp.is_empty());
    }

    #[test]
    fn test_snapshot_requires_both_lists() {
        for json in [r#"{}"#, r#"{"foo":1}"#, r#"{"watchList":["AAPL"]}"#, r#"{"completedLessons":[]}"#] {
            assert!(
                serde_json::from_str::<StateSnapshot>(json).is_err(),
                "{json} must not parse as a snapshot"
            );
        }
    }

    #[test]
    fn test_snapshot_rejects_wrong_types() {
        let result = serde_json::from_str::<StateSnapshot>(r#"{"watchList":"AAPL"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_is_empty() {
        assert!(StateSnapshot::default().is_empty());
        let snap = StateSnapshot {
            completed_lessons: vec!["l1".into()],
            ..Default::default()
        };
        assert!(!snap.is_empty());
    }

    #[test]
    fn test_error_body_omits_details() {
        let body = ErrorBody {
            error: ErrorKind::InvalidInput,
            message: "bad".into(),
            timestamp: "t".into(),
            details: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "INVALID_INPUT");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_cipher_suite_names() {
        let suite: CipherSuite = serde_json::from_str("\"chacha20-poly1305\"").unwrap();
        assert_eq!(suite, CipherSuite::ChaCha20Poly1305);
        assert_eq!(CipherSuite::default().to_string(), "aes-256-gcm");
        assert!(serde_json::from_str::<CipherSuite>("\"des\"").is_err());
    }
}
