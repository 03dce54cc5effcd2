//! Load flow state machine
//!
//! ```text
//!   Idle ──receive──▶ Applying ──commit──▶ Done
//!    │                   ▲
//!    │ (current state    │ choose(strategy)
//!    │  not empty)       │
//!    └────receive──▶ PendingDecision ──cancel──▶ Cancelled
//! ```
//!
//! Transitions are pure: each consumes the flow and returns the next state
//! or a [`TransitionError`]. Only `Done` exposes a snapshot to apply.

use chrono::{DateTime, Utc};
use gtvault_core::StateSnapshot;
use thiserror::Error;

use crate::merge::{self, MergeStrategy};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadFlow {
    #[default]
    Idle,
    /// Loaded data is held back until the caller picks a strategy.
    PendingDecision {
        current: StateSnapshot,
        loaded: StateSnapshot,
    },
    /// The next state has been computed but not yet handed out.
    Applying { next: StateSnapshot },
    Done { applied: StateSnapshot },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {event} while {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl LoadFlow {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PendingDecision { .. } => "pending decision",
            Self::Applying { .. } => "applying",
            Self::Done { .. } => "done",
            Self::Cancelled => "cancelled",
        }
    }

    fn reject(&self, event: &'static str) -> TransitionError {
        TransitionError {
            state: self.name(),
            event,
        }
    }

    /// A decrypted snapshot arrived. Empty current state is replaced directly;
    /// anything else waits for a decision.
    pub fn receive(
        self,
        current: StateSnapshot,
        loaded: StateSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        match self {
            Self::Idle if current.is_empty() => Ok(Self::Applying {
                next: merge::replace(&loaded, now),
            }),
            Self::Idle => Ok(Self::PendingDecision { current, loaded }),
            other => Err(other.reject("receive")),
        }
    }

    pub fn choose(self, strategy: MergeStrategy, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        match self {
            Self::PendingDecision { current, loaded } => Ok(Self::Applying {
                next: merge::apply(&current, &loaded, strategy, now),
            }),
            other => Err(other.reject("choose")),
        }
    }

    pub fn cancel(self) -> Result<Self, TransitionError> {
        match self {
            Self::Idle | Self::PendingDecision { .. } => Ok(Self::Cancelled),
            other => Err(other.reject("cancel")),
        }
    }

    pub fn commit(self) -> Result<Self, TransitionError> {
        match self {
            Self::Applying { next } => Ok(Self::Done { applied: next }),
            other => Err(other.reject("commit")),
        }
    }

    /// The snapshot to install, once the flow has finished.
    pub fn applied(&self) -> Option<&StateSnapshot> {
        match self {
            Self::Done { applied } => Some(applied),
            _ => None,
        }
    }

    pub fn into_applied(self) -> Option<StateSnapshot> {
        match self {
            Self::Done { applied } => Some(applied),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingDecision { .. })
    }

    /// Loaded snapshot awaiting a decision, for previews.
    pub fn pending_snapshot(&self) -> Option<&StateSnapshot> {
        match self {
            Self::PendingDecision { loaded, .. } => Some(loaded),
            _ => None,
        }
    }
}
