//! # FocusShield Core Library
//!
//! Core business logic for FocusShield, a Pomodoro-style focus timer
//! that shields distracting apps during focus sessions. The GUI layer
//! and the platform integrations (app shielding, live-activity surface,
//! local notifications) are thin shells over this library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a wall-clock state machine -- remaining time is
//!   recomputed from a fixed session end instant, never decremented, so
//!   the countdown stays correct across arbitrary suspension gaps
//! - **Timer Service**: the async driver that owns the engine, runs the
//!   once-per-second tick task, and dispatches side effects to injected
//!   collaborators
//! - **Storage**: JSON key-value preferences plus an append-only
//!   session history with range and rolling-window statistics
//! - **Collaborator contracts**: [`BlockingGateway`], [`SnapshotSink`],
//!   and [`AlertScheduler`] are narrow traits the platform layer
//!   implements; every one of them is best-effort from the timer's
//!   point of view
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: core timer state machine
//! - [`SessionTimer`]: async service wired via dependency injection
//! - [`HistoryStore`]: session record persistence and aggregates
//! - [`TimerConfiguration`]: user-configurable durations and policy

pub mod blocking;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod live;
pub mod notify;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;

pub use blocking::{AppId, BlockingDirective, BlockingGateway, BlockingMode, NullGateway};
pub use config::TimerConfiguration;
pub use error::{BlockingError, ConfigError, CoreError, PersistenceError};
pub use events::Event;
pub use history::HistoryStore;
pub use live::{LiveSnapshot, NullSink, SnapshotSink};
pub use notify::{AlertScheduler, NullScheduler};
pub use session::{SessionKind, SessionRecord, SessionStatus};
pub use stats::RangeStats;
pub use storage::{JsonFileStore, MemoryStore, PreferenceStore};
pub use timer::{SessionTimer, TimerEngine, TimerPhase};
