//! Merge policy for applying a loaded snapshot over live state.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gtvault_core::{naming::iso_timestamp, StateSnapshot};
use serde::{Deserialize, Serialize};

/// How a loaded snapshot is combined with non-empty current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Ordered union of both lists, current entries first
    Merge,
    /// Discard current state, adopt the loaded snapshot
    Replace,
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown merge strategy '{other}' (expected merge or replace)")),
        }
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merge => f.write_str("merge"),
            Self::Replace => f.write_str("replace"),
        }
    }
}

/// Deduplicating union: every entry of `current` in order, then the entries
/// of `loaded` not yet seen. Duplicates inside either list collapse too.
pub fn union_ordered(current: &[String], loaded: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(current.len() + loaded.len());
    current
        .iter()
        .chain(loaded)
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

/// Combine `loaded` with `current` under `strategy`. The result is always
/// stamped with `now`.
pub fn apply(
    current: &StateSnapshot,
    loaded: &StateSnapshot,
    strategy: MergeStrategy,
    now: DateTime<Utc>,
) -> StateSnapshot {
    match strategy {
        MergeStrategy::Merge => StateSnapshot {
            watch_list: union_ordered(&current.watch_list, &loaded.watch_list),
            completed_lessons: union_ordered(&current.completed_lessons, &loaded.completed_lessons),
            version: loaded.version.clone(),
            timestamp: iso_timestamp(now),
        },
        MergeStrategy::Replace => replace(loaded, now),
    }
}

/// The loaded snapshot verbatim, restamped.
pub fn replace(loaded: &StateSnapshot, now: DateTime<Utc>) -> StateSnapshot {
    StateSnapshot {
        timestamp: iso_timestamp(now),
        ..loaded.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn snapshot(watch: &[&str], lessons: &[&str], version: &str) -> StateSnapshot {
        StateSnapshot {
            watch_list: strings(watch),
            completed_lessons: strings(lessons),
            version: version.into(),
            timestamp: "2025-12-31T23:59:59.000Z".into(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_merge_is_ordered_union_current_first() {
        let current = snapshot(&["TSLA"], &["l1"], "1.0.0");
        let loaded = snapshot(&["AAPL", "TSLA"], &["l2"], "1.1.0");

        let merged = apply(&current, &loaded, MergeStrategy::Merge, now());
        assert_eq!(merged.watch_list, strings(&["TSLA", "AAPL"]));
        assert_eq!(merged.completed_lessons, strings(&["l1", "l2"]));
        assert_eq!(merged.version, "1.1.0");
        assert_eq!(merged.timestamp, "2026-05-04T12:00:00.000Z");
    }

    #[test]
    fn test_replace_keeps_loaded_verbatim_but_restamps() {
        let current = snapshot(&["TSLA"], &["l1"], "1.0.0");
        let loaded = snapshot(&["AAPL"], &[], "0.9.0");

        let replaced = apply(&current, &loaded, MergeStrategy::Replace, now());
        assert_eq!(replaced.watch_list, strings(&["AAPL"]));
        assert!(replaced.completed_lessons.is_empty());
        assert_eq!(replaced.version, "0.9.0");
        assert_eq!(replaced.timestamp, "2026-05-04T12:00:00.000Z");
    }

    #[test]
    fn test_union_collapses_internal_duplicates() {
        let out = union_ordered(&strings(&["a", "b", "a"]), &strings(&["c", "b", "c"]));
        assert_eq!(out, strings(&["a", "b", "c"]));
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Merge".parse::<MergeStrategy>().unwrap(), MergeStrategy::Merge);
        assert_eq!("replace".parse::<MergeStrategy>().unwrap(), MergeStrategy::Replace);
        assert!("overwrite".parse::<MergeStrategy>().is_err());
    }
}
