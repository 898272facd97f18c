//! Async timer service.
//!
//! [`SessionTimer`] wraps the engine in a single mutex and drives it
//! with a once-per-second tick task. All collaborators -- shielding
//! gateway, snapshot sink, alert scheduler, preference store -- are
//! injected at construction; there are no ambient globals.
//!
//! Tick tasks cancel cooperatively through a generation counter: every
//! command that ends or replaces a countdown bumps the generation
//! first, and a tick task exits as soon as it observes a stale
//! generation. At most one tick task is live per service, and a new
//! session's task can never interleave with a stale one because the
//! bump happens before the engine transition.
//!
//! Gateway calls run on the blocking pool so a slow platform API cannot
//! delay tick cadence. Every gateway, sink, and store failure degrades:
//! the timer keeps counting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::blocking::{BlockingDirective, BlockingGateway};
use crate::config::TimerConfiguration;
use crate::error::{BlockingError, CoreError};
use crate::events::Event;
use crate::history::HistoryStore;
use crate::live::{LiveSnapshot, SnapshotSink};
use crate::notify::AlertScheduler;
use crate::session::{SessionKind, SessionRecord};
use crate::storage::PreferenceStore;

use super::engine::{TimerEngine, TimerPhase};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The focus-session timer, wired to its collaborators.
#[derive(Clone)]
pub struct SessionTimer {
    engine: Arc<Mutex<TimerEngine>>,
    gateway: Arc<dyn BlockingGateway>,
    sink: Arc<dyn SnapshotSink>,
    alerts: Arc<dyn AlertScheduler>,
    prefs: Arc<dyn PreferenceStore>,
    history: HistoryStore,
    /// Current tick-task generation; stale tasks exit on observing a bump.
    generation: Arc<AtomicU64>,
    events: broadcast::Sender<Event>,
    /// Publish every n-th tick to the snapshot sink (1 = every tick).
    publish_every_ticks: u64,
}

impl SessionTimer {
    pub fn new(
        gateway: Arc<dyn BlockingGateway>,
        sink: Arc<dyn SnapshotSink>,
        alerts: Arc<dyn AlertScheduler>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        let config = TimerConfiguration::load(prefs.as_ref());
        let history = HistoryStore::new(Arc::clone(&prefs));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine: Arc::new(Mutex::new(TimerEngine::new(config))),
            gateway,
            sink,
            alerts,
            prefs,
            history,
            generation: Arc::new(AtomicU64::new(0)),
            events,
            publish_every_ticks: 1,
        }
    }

    /// Thin snapshot publishes to every n-th tick. Phase transitions
    /// always publish regardless.
    pub fn with_publish_every_ticks(mut self, n: u64) -> Self {
        self.publish_every_ticks = n.max(1);
        self
    }

    /// Subscribe to timer events. Slow receivers may observe lag; the
    /// timer never waits for them.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.engine().phase()
    }

    pub fn session_kind(&self) -> SessionKind {
        self.engine().session_kind()
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.engine().snapshot()
    }

    pub fn config(&self) -> TimerConfiguration {
        self.engine().config().clone()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session of the current kind. Idempotent while running.
    ///
    /// Focus sessions engage shielding per the configured mode;
    /// permission denial or gateway failure degrades to an unshielded
    /// session and surfaces as [`Event::BlockingUnavailable`].
    pub async fn start(&self) -> Option<Event> {
        let now = Utc::now();
        let (event, directive, snapshot) = {
            let mut engine = self.engine();
            let event = engine.start(now)?;
            let config = engine.config();
            let directive = match engine.session_kind() {
                SessionKind::Focus => Some(BlockingDirective::for_mode(
                    config.blocking_mode,
                    &config.allow_list,
                )),
                _ => None,
            };
            (event, directive, engine.snapshot())
        };

        match directive {
            Some(directive) => self.engage_blocking(directive).await,
            None => self.release_blocking().await,
        }

        self.sink.publish(&snapshot);
        self.emit(event.clone());
        self.spawn_tick_task();
        Some(event)
    }

    /// User-initiated stop. Cancels the tick task, releases shielding,
    /// and appends the session record (Failed for focus, Completed for
    /// a break).
    pub async fn stop(&self) -> Option<Event> {
        self.bump_generation();
        let now = Utc::now();
        let (event, snapshot) = {
            let mut engine = self.engine();
            (engine.stop(now), engine.snapshot())
        };
        let event = event?;
        self.release_blocking().await;
        if let Event::SessionStopped { record, .. } = &event {
            self.append_record(record.clone());
        }
        self.sink.publish(&snapshot);
        self.emit(event.clone());
        Some(event)
    }

    /// Stop whatever is running and restore a full idle timer.
    pub async fn reset(&self) -> Option<Event> {
        self.bump_generation();
        let now = Utc::now();
        let (event, snapshot) = {
            let mut engine = self.engine();
            (engine.reset(now), engine.snapshot())
        };
        let event = event?;
        self.release_blocking().await;
        if let Event::TimerReset {
            record: Some(record),
            ..
        } = &event
        {
            self.append_record(record.clone());
        }
        self.sink.publish(&snapshot);
        self.emit(event.clone());
        Some(event)
    }

    /// Skip the current break. A running break completes as if it had
    /// expired naturally, including the completion alert and record.
    pub async fn skip_break(&self) -> Option<Event> {
        self.bump_generation();
        let now = Utc::now();
        let (event, snapshot) = {
            let mut engine = self.engine();
            (engine.skip_break(now), engine.snapshot())
        };
        let event = event?;
        if let Event::BreakSkipped {
            record: Some(record),
            ..
        } = &event
        {
            self.alerts.schedule_completion_alert(record.kind);
            self.append_record(record.clone());
        }
        self.sink.publish(&snapshot);
        self.emit(event.clone());
        Some(event)
    }

    /// The host app is going to the background: stop ticking and flush
    /// a final snapshot so the live surface can keep recomputing from
    /// the session end instant on its own.
    pub fn on_suspend(&self) -> Option<Event> {
        self.bump_generation();
        let now = Utc::now();
        let (event, snapshot) = {
            let mut engine = self.engine();
            (engine.on_suspend(now), engine.snapshot())
        };
        let event = event?;
        self.sink.publish(&snapshot);
        self.emit(event.clone());
        Some(event)
    }

    /// The host app returned to the foreground: reconcile immediately.
    /// A session that expired while suspended completes here; one still
    /// running gets its tick task back.
    pub async fn on_resume(&self) -> Option<Event> {
        let now = Utc::now();
        let (event, snapshot) = {
            let mut engine = self.engine();
            (engine.on_resume(now), engine.snapshot())
        };
        let event = event?;
        match &event {
            Event::SessionCompleted { record, .. } => {
                self.finish_session(record).await;
            }
            Event::Tick { .. } => {
                self.spawn_tick_task();
            }
            _ => {}
        }
        self.sink.publish(&snapshot);
        self.emit(event.clone());
        Some(event)
    }

    /// Validate, persist, and apply new settings. A running session
    /// keeps the durations it started with.
    ///
    /// # Errors
    /// Returns an error if validation fails or the settings cannot be
    /// persisted.
    pub fn update_config(&self, config: TimerConfiguration) -> Result<(), CoreError> {
        config.validate()?;
        config.save(self.prefs.as_ref())?;
        self.engine().set_config(config);
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn engine(&self) -> MutexGuard<'_, TimerEngine> {
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn emit(&self, event: Event) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn append_record(&self, record: SessionRecord) {
        if let Err(e) = self.history.append(record) {
            // Recreating a finished session is not meaningful; drop it.
            eprintln!("Warning: failed to append session record, dropping it: {e}");
        }
    }

    /// Side effects of a natural completion: release shielding after a
    /// focus session, alert, and append the record.
    async fn finish_session(&self, record: &SessionRecord) {
        if record.kind.is_focus() {
            self.release_blocking().await;
        }
        self.alerts.schedule_completion_alert(record.kind);
        self.append_record(record.clone());
    }

    /// Engage shielding for a focus session, degrading on any failure.
    async fn engage_blocking(&self, directive: BlockingDirective) {
        if let Some(warning) = directive.warning() {
            self.emit(Event::BlockingUnavailable {
                reason: warning.to_string(),
                at: Utc::now(),
            });
        }
        if !directive.engages_shield() {
            // Relaxed / empty whitelist: make sure nothing stays shielded.
            self.release_blocking().await;
            return;
        }

        if !self.gateway.has_permission() {
            let gateway = Arc::clone(&self.gateway);
            let granted = tokio::task::spawn_blocking(move || gateway.request_permission())
                .await
                .unwrap_or(Err(BlockingError::Gateway(
                    "permission request task failed".to_string(),
                )));
            match granted {
                Ok(true) => {}
                Ok(false) => {
                    self.emit(Event::BlockingUnavailable {
                        reason: BlockingError::PermissionDenied.to_string(),
                        at: Utc::now(),
                    });
                    return;
                }
                Err(e) => {
                    eprintln!("Warning: shielding permission request failed: {e}");
                    self.emit(Event::BlockingUnavailable {
                        reason: e.to_string(),
                        at: Utc::now(),
                    });
                    return;
                }
            }
        }

        let gateway = Arc::clone(&self.gateway);
        let result =
            tokio::task::spawn_blocking(move || gateway.start_blocking(&directive)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                eprintln!("Warning: failed to engage app shielding: {e}");
                self.emit(Event::BlockingUnavailable {
                    reason: e.to_string(),
                    at: Utc::now(),
                });
            }
            Err(e) => {
                eprintln!("Warning: shielding task failed: {e}");
            }
        }
    }

    /// Clear restrictions. Idempotent; failures are logged and dropped.
    async fn release_blocking(&self) {
        let gateway = Arc::clone(&self.gateway);
        match tokio::task::spawn_blocking(move || gateway.stop_blocking()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("Warning: failed to release app shielding: {e}"),
            Err(e) => eprintln!("Warning: shielding task failed: {e}"),
        }
    }

    /// Replace any live tick task with a fresh one for the session that
    /// just started or resumed.
    fn spawn_tick_task(&self) {
        let generation = self.bump_generation();
        let timer = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut ticks: u64 = 0;
            loop {
                interval.tick().await;
                // Cooperative cancel, checked before touching the engine.
                if timer.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                let now = Utc::now();
                let (event, snapshot) = {
                    let mut engine = timer.engine();
                    (engine.reconcile(now), engine.snapshot())
                };
                match event {
                    Some(event @ Event::SessionCompleted { .. }) => {
                        if let Event::SessionCompleted { record, .. } = &event {
                            timer.finish_session(record).await;
                        }
                        timer.sink.publish(&snapshot);
                        timer.emit(event);
                        return;
                    }
                    Some(event @ Event::Tick { .. }) => {
                        ticks += 1;
                        if ticks % timer.publish_every_ticks == 0 {
                            timer.sink.publish(&snapshot);
                        }
                        timer.emit(event);
                    }
                    // The engine left Running behind our back is not
                    // possible; None here means a command raced us and
                    // already ended the session.
                    _ => return,
                }
            }
        });
    }
}
