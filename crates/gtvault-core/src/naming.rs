//! Timestamp and export filename formatting

use chrono::{DateTime, SecondsFormat, Utc};

/// ISO-8601 timestamp with millisecond precision and a `Z` suffix,
/// e.g. `2026-10-15T08:04:05.123Z`.
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Compact ISO-8601 basic format, e.g. `20261015T080405Z`.
pub fn compact_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Filename for a downloaded export: `<base>-<compact timestamp>.<ext>`.
///
/// A leading dot on `ext` is tolerated.
pub fn export_filename(base: &str, ext: &str, now: DateTime<Utc>) -> String {
    let ext = ext.trim_start_matches('.');
    format!("{base}-{}.{ext}", compact_timestamp(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 8, 4, 5).unwrap()
    }

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(iso_timestamp(fixed()), "2026-10-15T08:04:05.000Z");
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("gtvault-state", "gt", fixed()),
            "gtvault-state-20261015T080405Z.gt"
        );
    }

    #[test]
    fn test_export_filename_dotted_ext() {
        assert_eq!(
            export_filename("backup", ".gt", fixed()),
            "backup-20261015T080405Z.gt"
        );
    }
}
