//! Timer engine implementation.
//!
//! The engine is a wall-clock-based state machine with no threads and
//! no I/O. Every command takes an explicit `now` timestamp, so the
//! whole lifecycle is testable with synthetic clocks, and the async
//! driver in [`super::service`] is a thin shell around it.
//!
//! ## Reconciliation
//!
//! Remaining time is never decremented. The session's absolute end
//! instant is fixed at start, and every tick -- and every
//! foreground-resume event -- recomputes
//! `remaining = clamp(end - now, 0, total)`. A session that expired
//! while the process was suspended completes on the first
//! reconciliation after resume, exactly as if the last tick had landed
//! on zero.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Running -> (Idle | Failed)
//! ```
//!
//! Natural expiry passes through `Finished` during bookkeeping and
//! settles on `Idle` with the next session kind primed; there is no
//! auto-chaining into the next session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TimerConfiguration;
use crate::events::Event;
use crate::live::LiveSnapshot;
use crate::session::{SessionKind, SessionRecord, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    /// Reserved: no public command currently reaches this phase.
    Paused,
    Finished,
    Failed,
}

/// Core timer state machine.
///
/// Owns the current session, remaining time, and the focus-session
/// counter that drives short-break/long-break cadence. All side
/// effects (shielding, persistence, snapshots, alerts) belong to the
/// caller, keyed off the returned [`Event`]s.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    config: TimerConfiguration,
    phase: TimerPhase,
    session_kind: SessionKind,
    total_ms: u64,
    remaining_ms: u64,
    /// Absolute end instant of the running session. The single source
    /// of truth for remaining time; `Some` exactly while Running.
    session_end: Option<DateTime<Utc>>,
    /// The in-progress record, opened at start and finalized on any
    /// terminal transition.
    active: Option<SessionRecord>,
    /// Monotone within a process lifetime; resets on restart.
    completed_focus_count: u32,
}

impl TimerEngine {
    pub fn new(config: TimerConfiguration) -> Self {
        let total_ms = config.duration_secs(SessionKind::Focus).saturating_mul(1000);
        Self {
            config,
            phase: TimerPhase::Idle,
            session_kind: SessionKind::Focus,
            total_ms,
            remaining_ms: total_ms,
            session_end: None,
            active: None,
            completed_focus_count: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn session_kind(&self) -> SessionKind {
        self.session_kind
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub fn completed_focus_count(&self) -> u32 {
        self.completed_focus_count
    }

    pub fn config(&self) -> &TimerConfiguration {
        &self.config
    }

    /// Render-ready projection for the live-activity surface.
    /// Remaining seconds round up so a running session never displays
    /// 0:00 before it actually completes.
    pub fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            remaining_secs: self.remaining_ms.div_ceil(1000),
            total_secs: self.total_ms / 1000,
            kind: self.session_kind,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session of the current kind. No-op while already
    /// Running -- duplicate UI dispatch must not restart the countdown.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase == TimerPhase::Running {
            return None;
        }
        let total_secs = self.config.duration_secs(self.session_kind);
        self.total_ms = total_secs.saturating_mul(1000);
        self.remaining_ms = self.total_ms;
        self.session_end = Some(now + Duration::seconds(total_secs as i64));
        self.active = Some(SessionRecord::begin(self.session_kind, total_secs, now));
        self.phase = TimerPhase::Running;
        Some(Event::SessionStarted {
            kind: self.session_kind,
            total_secs,
            at: now,
        })
    }

    /// Recompute remaining time from the stored end instant. Called on
    /// every tick and on every foreground resume.
    ///
    /// Returns a `Tick` while time remains, `SessionCompleted` exactly
    /// once when the end instant has passed, and `None` when nothing is
    /// running (repeated reconciliation after completion cannot re-fire
    /// the completion side effects).
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        let end = self.session_end?;
        let left = (end - now).num_milliseconds().max(0) as u64;
        self.remaining_ms = left.min(self.total_ms);
        if self.remaining_ms == 0 {
            return self.complete(now);
        }
        Some(Event::Tick {
            kind: self.session_kind,
            remaining_ms: self.remaining_ms,
            total_ms: self.total_ms,
            at: now,
        })
    }

    /// Explicit foreground-resume event. Identical to a tick: the gap
    /// is recovered entirely from the stored end instant.
    pub fn on_resume(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.reconcile(now)
    }

    /// Explicit suspend event. No state transition; flushes current
    /// remaining time so the caller can hand the surface a final
    /// snapshot before ticking stops.
    pub fn on_suspend(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        if let Some(end) = self.session_end {
            let left = (end - now).num_milliseconds().max(0) as u64;
            self.remaining_ms = left.min(self.total_ms);
        }
        Some(Event::Suspended {
            kind: self.session_kind,
            remaining_ms: self.remaining_ms,
            at: now,
        })
    }

    /// User-initiated stop. An interrupted focus session is a failure;
    /// an interrupted break still counts as completed rest. No-op when
    /// nothing is running.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        if let Some(end) = self.session_end {
            let left = (end - now).num_milliseconds().max(0) as u64;
            self.remaining_ms = left.min(self.total_ms);
        }
        let was_focus = self.session_kind.is_focus();
        let status = if was_focus {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };
        let record = self.active.take()?.finalize(status, now);
        self.session_end = None;
        self.phase = if was_focus {
            TimerPhase::Failed
        } else {
            TimerPhase::Idle
        };
        Some(Event::SessionStopped { record, at: now })
    }

    /// Stop whatever is running, then restore a full idle timer for the
    /// current kind.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let record = match self.stop(now) {
            Some(Event::SessionStopped { record, .. }) => Some(record),
            _ => None,
        };
        let total_secs = self.config.duration_secs(self.session_kind);
        self.total_ms = total_secs.saturating_mul(1000);
        self.remaining_ms = self.total_ms;
        self.session_end = None;
        self.active = None;
        self.phase = TimerPhase::Idle;
        Some(Event::TimerReset { record, at: now })
    }

    /// Skip the current break. A running break finishes as if it had
    /// expired naturally (the record completes); an idle break is
    /// simply bypassed. No-op during focus.
    pub fn skip_break(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.session_kind.is_focus() {
            return None;
        }
        let record = if self.phase == TimerPhase::Running {
            let record = self.active.take()?.finalize(SessionStatus::Completed, now);
            self.phase = TimerPhase::Finished;
            Some(record)
        } else {
            None
        };
        self.session_end = None;
        self.session_kind = SessionKind::Focus;
        self.prime_idle();
        Some(Event::BreakSkipped { record, at: now })
    }

    /// Replace the configuration. An idle timer re-primes its display
    /// durations immediately; a running session keeps the durations it
    /// started with.
    pub fn set_config(&mut self, config: TimerConfiguration) {
        self.config = config;
        if self.phase != TimerPhase::Running {
            self.prime_idle();
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Natural expiry. Finalizes the record, advances the session kind,
    /// and settles back on Idle with the next session primed.
    fn complete(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.phase = TimerPhase::Finished;
        let record = self.active.take()?.finalize(SessionStatus::Completed, now);
        let next_kind = self.advance_kind();
        self.session_kind = next_kind;
        self.session_end = None;
        self.prime_idle();
        Some(Event::SessionCompleted {
            record,
            next_kind,
            at: now,
        })
    }

    /// Kind after a natural completion. Every `sessions_before_long_break`-th
    /// focus completion earns a long break; breaks always hand back to focus.
    fn advance_kind(&mut self) -> SessionKind {
        if self.session_kind.is_focus() {
            self.completed_focus_count += 1;
            let cycle = self.config.sessions_before_long_break.max(1);
            if self.completed_focus_count % cycle == 0 {
                SessionKind::LongBreak
            } else {
                SessionKind::ShortBreak
            }
        } else {
            SessionKind::Focus
        }
    }

    fn prime_idle(&mut self) {
        self.total_ms = self
            .config
            .duration_secs(self.session_kind)
            .saturating_mul(1000);
        self.remaining_ms = self.total_ms;
        self.phase = TimerPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn engine() -> TimerEngine {
        TimerEngine::new(TimerConfiguration::default())
    }

    fn secs(s: i64) -> Duration {
        Duration::seconds(s)
    }

    #[test]
    fn fresh_start_has_full_remaining() {
        let mut eng = engine();
        eng.start(t0());
        assert_eq!(eng.phase(), TimerPhase::Running);
        assert_eq!(eng.remaining_ms(), 1500 * 1000);

        // Reconciling at the start instant changes nothing.
        let ev = eng.reconcile(t0());
        assert!(matches!(ev, Some(Event::Tick { remaining_ms, .. }) if remaining_ms == 1500 * 1000));
    }

    #[test]
    fn reconcile_tracks_elapsed_wall_clock() {
        let mut eng = engine();
        eng.start(t0());
        eng.reconcile(t0() + secs(600));
        assert_eq!(eng.remaining_ms(), 900 * 1000);

        // A later reconcile with a large suspension gap still lands on
        // end - now, not an accumulated delta.
        eng.reconcile(t0() + secs(1499));
        assert_eq!(eng.remaining_ms(), 1000);
    }

    #[test]
    fn expiry_fires_completion_exactly_once() {
        let mut eng = engine();
        eng.start(t0());
        let ev = eng.reconcile(t0() + secs(2000));
        match ev {
            Some(Event::SessionCompleted { record, next_kind, .. }) => {
                assert_eq!(record.status, SessionStatus::Completed);
                assert_eq!(record.kind, SessionKind::Focus);
                assert_eq!(record.planned_secs, 1500);
                assert_eq!(next_kind, SessionKind::ShortBreak);
            }
            other => panic!("expected SessionCompleted, got {other:?}"),
        }
        assert_eq!(eng.phase(), TimerPhase::Idle);
        assert_eq!(eng.session_kind(), SessionKind::ShortBreak);

        // Repeated reconciliation after completion is inert.
        assert!(eng.reconcile(t0() + secs(2001)).is_none());
        assert!(eng.reconcile(t0() + secs(5000)).is_none());
    }

    #[test]
    fn completion_primes_the_next_break_durations() {
        let mut eng = engine();
        eng.start(t0());
        eng.reconcile(t0() + secs(1500));
        assert_eq!(eng.session_kind(), SessionKind::ShortBreak);
        assert_eq!(eng.total_ms(), 300 * 1000);
        assert_eq!(eng.remaining_ms(), 300 * 1000);
    }

    #[test]
    fn long_break_every_fourth_focus_completion() {
        let mut eng = engine();
        let mut expectations = Vec::new();
        let mut now = t0();
        for completion in 1..=8u32 {
            eng.start(now);
            now = now + secs(1500);
            let ev = eng.reconcile(now);
            let Some(Event::SessionCompleted { next_kind, .. }) = ev else {
                panic!("focus completion {completion} did not fire");
            };
            expectations.push(next_kind);
            // Skip the break so the next start is a focus session again.
            eng.skip_break(now);
            now = now + secs(10);
        }
        use SessionKind::{LongBreak, ShortBreak};
        assert_eq!(
            expectations,
            vec![
                ShortBreak, ShortBreak, ShortBreak, LongBreak,
                ShortBreak, ShortBreak, ShortBreak, LongBreak,
            ]
        );
        assert_eq!(eng.completed_focus_count(), 8);
    }

    #[test]
    fn stop_during_focus_fails_the_session() {
        let mut eng = engine();
        eng.start(t0());
        let ev = eng.stop(t0() + secs(60));
        match ev {
            Some(Event::SessionStopped { record, .. }) => {
                assert_eq!(record.status, SessionStatus::Failed);
                assert_eq!(record.actual_secs(), 60);
            }
            other => panic!("expected SessionStopped, got {other:?}"),
        }
        assert_eq!(eng.phase(), TimerPhase::Failed);
        // The kind is not advanced by a failure.
        assert_eq!(eng.session_kind(), SessionKind::Focus);
    }

    #[test]
    fn stop_during_break_still_completes_the_rest() {
        let mut eng = engine();
        eng.start(t0());
        eng.reconcile(t0() + secs(1500)); // focus done, short break primed
        eng.start(t0() + secs(1510));
        let ev = eng.stop(t0() + secs(1610));
        match ev {
            Some(Event::SessionStopped { record, .. }) => {
                assert_eq!(record.kind, SessionKind::ShortBreak);
                assert_eq!(record.status, SessionStatus::Completed);
            }
            other => panic!("expected SessionStopped, got {other:?}"),
        }
        assert_eq!(eng.phase(), TimerPhase::Idle);
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let mut eng = engine();
        assert!(eng.stop(t0()).is_none());
    }

    #[test]
    fn double_start_is_a_no_op() {
        let mut eng = engine();
        assert!(eng.start(t0()).is_some());
        let end_before = eng.session_end;
        assert!(eng.start(t0() + secs(5)).is_none());
        assert_eq!(eng.session_end, end_before);
        assert_eq!(eng.remaining_ms(), 1500 * 1000);
    }

    #[test]
    fn start_is_allowed_again_after_a_failed_stop() {
        let mut eng = engine();
        eng.start(t0());
        eng.stop(t0() + secs(30));
        assert_eq!(eng.phase(), TimerPhase::Failed);
        assert!(eng.start(t0() + secs(60)).is_some());
        assert_eq!(eng.phase(), TimerPhase::Running);
    }

    #[test]
    fn reset_restores_a_full_idle_timer() {
        let mut eng = engine();
        eng.start(t0());
        eng.reconcile(t0() + secs(700));
        let ev = eng.reset(t0() + secs(700));
        match ev {
            Some(Event::TimerReset { record: Some(record), .. }) => {
                assert_eq!(record.status, SessionStatus::Failed);
            }
            other => panic!("expected TimerReset with a record, got {other:?}"),
        }
        assert_eq!(eng.phase(), TimerPhase::Idle);
        assert_eq!(eng.remaining_ms(), 1500 * 1000);

        // Reset while idle carries no record.
        let ev = eng.reset(t0() + secs(800));
        assert!(matches!(ev, Some(Event::TimerReset { record: None, .. })));
    }

    #[test]
    fn skip_break_during_focus_is_a_no_op() {
        let mut eng = engine();
        eng.start(t0());
        assert!(eng.skip_break(t0()).is_none());
    }

    #[test]
    fn skip_running_break_completes_it_and_returns_to_focus() {
        let mut eng = engine();
        eng.start(t0());
        eng.reconcile(t0() + secs(1500));
        eng.start(t0() + secs(1500));
        let ev = eng.skip_break(t0() + secs(1600));
        match ev {
            Some(Event::BreakSkipped { record: Some(record), .. }) => {
                assert_eq!(record.kind, SessionKind::ShortBreak);
                assert_eq!(record.status, SessionStatus::Completed);
            }
            other => panic!("expected BreakSkipped with a record, got {other:?}"),
        }
        assert_eq!(eng.session_kind(), SessionKind::Focus);
        assert_eq!(eng.phase(), TimerPhase::Idle);
        assert_eq!(eng.remaining_ms(), 1500 * 1000);
    }

    #[test]
    fn skip_idle_break_just_advances_the_kind() {
        let mut eng = engine();
        eng.start(t0());
        eng.reconcile(t0() + secs(1500)); // short break primed, idle
        let ev = eng.skip_break(t0() + secs(1501));
        assert!(matches!(ev, Some(Event::BreakSkipped { record: None, .. })));
        assert_eq!(eng.session_kind(), SessionKind::Focus);
    }

    #[test]
    fn suspend_flushes_remaining_without_transition() {
        let mut eng = engine();
        eng.start(t0());
        let ev = eng.on_suspend(t0() + secs(100));
        assert!(matches!(
            ev,
            Some(Event::Suspended { remaining_ms, .. }) if remaining_ms == 1400 * 1000
        ));
        assert_eq!(eng.phase(), TimerPhase::Running);
        assert!(eng.on_suspend(t0() + secs(100)).is_some());

        // Suspend while idle is silent.
        let mut idle = engine();
        assert!(idle.on_suspend(t0()).is_none());
    }

    #[test]
    fn resume_after_expiry_completes_the_suspended_session() {
        let mut eng = engine();
        eng.start(t0());
        eng.on_suspend(t0() + secs(100));
        // Process resumes well after the end instant.
        let ev = eng.on_resume(t0() + secs(4000));
        assert!(matches!(ev, Some(Event::SessionCompleted { .. })));
        assert_eq!(eng.session_kind(), SessionKind::ShortBreak);
        // And only once.
        assert!(eng.on_resume(t0() + secs(4001)).is_none());
    }

    #[test]
    fn snapshot_rounds_remaining_up() {
        let mut eng = engine();
        eng.start(t0());
        eng.reconcile(t0() + Duration::milliseconds(1_499_500));
        let snap = eng.snapshot();
        assert_eq!(snap.remaining_secs, 1); // 500ms left still shows 0:01
        assert_eq!(snap.total_secs, 1500);
        assert_eq!(snap.kind, SessionKind::Focus);
    }

    #[test]
    fn set_config_reprimes_idle_timer_only() {
        let mut eng = engine();
        let mut cfg = TimerConfiguration::default();
        cfg.focus_secs = 600;
        eng.set_config(cfg.clone());
        assert_eq!(eng.remaining_ms(), 600 * 1000);

        eng.start(t0());
        let mut shorter = cfg.clone();
        shorter.focus_secs = 60;
        eng.set_config(shorter);
        // Running session keeps the durations it started with.
        assert_eq!(eng.total_ms(), 600 * 1000);
        assert!(matches!(
            eng.reconcile(t0() + secs(30)),
            Some(Event::Tick { .. })
        ));
    }

    /// The end-to-end script from the behavior contract: full focus,
    /// then a break stopped early.
    #[test]
    fn focus_then_interrupted_break_scenario() {
        let mut eng = engine();

        // Start Focus -> remaining 1500.
        eng.start(t0());
        assert_eq!(eng.remaining_ms(), 1500 * 1000);

        // Natural expiry -> Completed record, next kind ShortBreak.
        let ev = eng.reconcile(t0() + secs(1500));
        let Some(Event::SessionCompleted { record, next_kind, .. }) = ev else {
            panic!("focus session did not complete");
        };
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.planned_secs, 1500);
        assert_eq!(next_kind, SessionKind::ShortBreak);

        // Start ShortBreak -> remaining 300.
        eng.start(t0() + secs(1500));
        assert_eq!(eng.remaining_ms(), 300 * 1000);

        // Stop it early at remaining=200 -> Completed, phase Idle.
        eng.reconcile(t0() + secs(1600));
        assert_eq!(eng.remaining_ms(), 200 * 1000);
        let ev = eng.stop(t0() + secs(1600));
        let Some(Event::SessionStopped { record, .. }) = ev else {
            panic!("break stop did not produce a record");
        };
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(eng.phase(), TimerPhase::Idle);
    }

    mod reconciliation_props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// remaining == planned - elapsed while within the session.
            #[test]
            fn partial_elapse(d in 1u64..=86_400, frac in 0.0f64..1.0) {
                let e = ((d as f64) * frac) as u64;
                prop_assume!(e < d);
                let mut cfg = TimerConfiguration::default();
                cfg.focus_secs = d;
                let mut eng = TimerEngine::new(cfg);
                eng.start(t0());
                let ev = eng.reconcile(t0() + Duration::seconds(e as i64));
                prop_assert!(matches!(ev, Some(Event::Tick { .. })), "expected Some(Event::Tick), got {:?}", ev);
                prop_assert_eq!(eng.remaining_ms(), (d - e) * 1000);
            }

            /// Any elapse >= planned completes, exactly once.
            #[test]
            fn over_elapse(d in 1u64..=86_400, extra in 0u64..=86_400) {
                let mut cfg = TimerConfiguration::default();
                cfg.focus_secs = d;
                let mut eng = TimerEngine::new(cfg);
                eng.start(t0());
                let at = t0() + Duration::seconds((d + extra) as i64);
                let ev = eng.reconcile(at);
                prop_assert!(matches!(ev, Some(Event::SessionCompleted { .. })), "expected Some(Event::SessionCompleted), got {:?}", ev);
                prop_assert!(eng.reconcile(at + Duration::seconds(1)).is_none());
            }

            /// Remaining never exceeds total, even for a `now` before start.
            #[test]
            fn clock_skew_clamps_to_total(d in 1u64..=86_400, skew in 0i64..=3_600) {
                let mut cfg = TimerConfiguration::default();
                cfg.focus_secs = d;
                let mut eng = TimerEngine::new(cfg);
                eng.start(t0());
                eng.reconcile(t0() - Duration::seconds(skew));
                prop_assert_eq!(eng.remaining_ms(), d * 1000);
            }
        }
    }
}
