//! Aggregates over session history.
//!
//! Linear filters over the record log: outcome counts for a range,
//! rolling weekly/monthly windows, and per-day session counts for the
//! activity chart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::history::HistoryStore;
use crate::session::{SessionRecord, SessionStatus};

/// Outcome counts for a set of records.
///
/// `total` includes in-progress records; `completed + failed` covers the
/// finalized ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeStats {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
}

impl RangeStats {
    pub fn over(records: &[SessionRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            match record.status {
                SessionStatus::Completed => stats.completed += 1,
                SessionStatus::Failed => stats.failed += 1,
                SessionStatus::InProgress => {}
            }
        }
        stats
    }

    /// Completed share of finalized sessions, in [0, 1].
    pub fn completion_rate(&self) -> f64 {
        let finalized = self.completed + self.failed;
        if finalized == 0 {
            return 0.0;
        }
        self.completed as f64 / finalized as f64
    }
}

impl HistoryStore {
    /// Outcome counts for records started in `[start, end)`.
    ///
    /// # Errors
    /// Returns an error if the history cannot be read.
    pub fn stats_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RangeStats, PersistenceError> {
        Ok(RangeStats::over(&self.records_between(start, end)?))
    }

    /// Outcome counts for the trailing `days` days. Weekly stats use 7,
    /// monthly 30.
    ///
    /// # Errors
    /// Returns an error if the history cannot be read.
    pub fn stats_last_days(&self, days: i64) -> Result<RangeStats, PersistenceError> {
        let now = Utc::now();
        self.stats_between(now - Duration::days(days), now + Duration::seconds(1))
    }

    /// Session counts per UTC calendar day for the past `days` days,
    /// most recent day first.
    ///
    /// # Errors
    /// Returns an error if the history cannot be read.
    pub fn daily_counts(
        &self,
        days: u32,
    ) -> Result<Vec<(DateTime<Utc>, u64)>, PersistenceError> {
        let records = self.all()?;
        let today = Utc::now().date_naive();
        let mut counts = Vec::with_capacity(days as usize);
        for offset in 0..days {
            let day = today - Duration::days(offset as i64);
            let count = records
                .iter()
                .filter(|r| r.started_at.date_naive() == day)
                .count() as u64;
            let day_start = day
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or_else(Utc::now);
            counts.push((day_start, count));
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use crate::session::SessionKind;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn finalized(status: SessionStatus, started_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord::begin(SessionKind::Focus, 1500, started_at)
            .finalize(status, started_at + Duration::seconds(60))
    }

    #[test]
    fn counts_by_status() {
        let now = Utc::now();
        let records = vec![
            finalized(SessionStatus::Completed, now),
            finalized(SessionStatus::Completed, now),
            finalized(SessionStatus::Failed, now),
            SessionRecord::begin(SessionKind::Focus, 1500, now),
        ];
        let stats = RangeStats::over(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn completion_rate_ignores_in_progress() {
        let now = Utc::now();
        let records = vec![
            finalized(SessionStatus::Completed, now),
            finalized(SessionStatus::Failed, now),
            SessionRecord::begin(SessionKind::Focus, 1500, now),
        ];
        let stats = RangeStats::over(&records);
        assert!((stats.completion_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn completion_rate_of_empty_history_is_zero() {
        assert_eq!(RangeStats::default().completion_rate(), 0.0);
    }

    #[test]
    fn weekly_window_excludes_older_records() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        history
            .append(finalized(SessionStatus::Completed, now - Duration::days(1)))
            .unwrap();
        history
            .append(finalized(SessionStatus::Failed, now - Duration::days(10)))
            .unwrap();

        let weekly = history.stats_last_days(7).unwrap();
        assert_eq!(weekly.total, 1);
        assert_eq!(weekly.completed, 1);

        let monthly = history.stats_last_days(30).unwrap();
        assert_eq!(monthly.total, 2);
        assert_eq!(monthly.failed, 1);
    }

    #[test]
    fn daily_counts_runs_newest_first() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        history.append(finalized(SessionStatus::Completed, now)).unwrap();
        history.append(finalized(SessionStatus::Completed, now)).unwrap();
        history
            .append(finalized(SessionStatus::Failed, now - Duration::days(1)))
            .unwrap();

        let counts = history.daily_counts(3).unwrap();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0].1, 2);
        assert_eq!(counts[1].1, 1);
        assert_eq!(counts[2].1, 0);
        assert!(counts[0].0 > counts[1].0);
    }
}
