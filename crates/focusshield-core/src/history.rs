//! Session history store.
//!
//! An append-only log of finalized (and, transiently, in-progress)
//! session records, persisted as one JSON-encoded sequence under the
//! `sessionHistory` key. Appends are read-modify-write behind the
//! store's API; the timer service is the only writer.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::error::PersistenceError;
use crate::session::SessionRecord;
use crate::storage::{self, keys, PreferenceStore};

#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn PreferenceStore>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// All records, oldest first. An absent key is an empty history.
    ///
    /// # Errors
    /// Returns an error if the stored sequence cannot be read or decoded.
    pub fn all(&self) -> Result<Vec<SessionRecord>, PersistenceError> {
        Ok(storage::get_json(self.store.as_ref(), keys::SESSION_HISTORY)?.unwrap_or_default())
    }

    /// Append one record to the log.
    ///
    /// # Errors
    /// Returns an error if the read or write fails. The caller decides
    /// whether to drop the record; this store never retries.
    pub fn append(&self, record: SessionRecord) -> Result<(), PersistenceError> {
        let mut records = self.all()?;
        records.push(record);
        storage::set_json(self.store.as_ref(), keys::SESSION_HISTORY, &records)
    }

    /// Records whose start time falls in `[start, end)`.
    ///
    /// # Errors
    /// Returns an error if the history cannot be read.
    pub fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>, PersistenceError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.started_at >= start && r.started_at < end)
            .collect())
    }

    /// Records started on the given calendar day (UTC).
    ///
    /// # Errors
    /// Returns an error if the history cannot be read.
    pub fn records_on(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, PersistenceError> {
        let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
        self.records_between(start, start + Duration::days(1))
    }

    /// Empty the history. Only ever triggered by explicit user action.
    ///
    /// # Errors
    /// Returns an error if the store delete fails.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store.remove(keys::SESSION_HISTORY)
    }
}
