//! Timer events.
//!
//! Every state change in the timer produces an [`Event`]. The engine
//! returns them from its commands; the timer service re-broadcasts them
//! so a UI layer can observe transitions without polling engine state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SessionKind, SessionRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    SessionStarted {
        kind: SessionKind,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// Periodic reconciliation while running.
    Tick {
        kind: SessionKind,
        remaining_ms: u64,
        total_ms: u64,
        at: DateTime<Utc>,
    },
    /// Natural expiry: the session ran its full planned duration.
    SessionCompleted {
        record: SessionRecord,
        next_kind: SessionKind,
        at: DateTime<Utc>,
    },
    /// User-initiated stop. The record carries Failed for an
    /// interrupted focus session, Completed for an interrupted break.
    SessionStopped {
        record: SessionRecord,
        at: DateTime<Utc>,
    },
    /// Reset back to a full idle timer. Carries the record of whatever
    /// session the reset interrupted, if any.
    TimerReset {
        record: Option<SessionRecord>,
        at: DateTime<Utc>,
    },
    /// A break was skipped. The record is present when the skip cut a
    /// running break short (treated as natural completion).
    BreakSkipped {
        record: Option<SessionRecord>,
        at: DateTime<Utc>,
    },
    /// The host app is being suspended; ticking stops until resume.
    Suspended {
        kind: SessionKind,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// Shielding could not be engaged; the session continues unshielded.
    BlockingUnavailable {
        reason: String,
        at: DateTime<Utc>,
    },
}
