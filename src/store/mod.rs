//! Member and attendance persistence.
//!
//! [`AttendanceStore`] is the port the service talks to; [`SqliteStore`] is
//! the pooled sqlx adapter used in production.

mod schema;
mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::attendance::{AttendanceEvent, EventWithMember};
use crate::model::member::Member;

pub use sqlite::SqliteStore;

/// Storage form of a calendar date (`YYYY-MM-DD`).
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Create tables and bring older layouts up to date. Safe on every start.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Insert the member unless the register number is already known. An
    /// existing row is never overwritten.
    async fn upsert_member(&self, member: &Member) -> Result<(), StoreError>;

    async fn find_event(
        &self,
        regno: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceEvent>, StoreError>;

    /// Record the member as present and return the new event id.
    ///
    /// Fails with [`StoreError::AlreadyMarked`] when an event for the same
    /// register number and date already exists.
    async fn insert_event(&self, regno: &str, date: NaiveDate, time: &str)
    -> Result<i64, StoreError>;

    /// Events joined with their member. A single date comes back in id order;
    /// the full listing is newest date first, id order within a date.
    async fn list_events_with_member(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<EventWithMember>, StoreError>;

    async fn list_members(&self) -> Result<Vec<Member>, StoreError>;

    /// Every event, newest date first.
    async fn list_events(&self) -> Result<Vec<AttendanceEvent>, StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("attendance already recorded for {regno} on {date}")]
    AlreadyMarked { regno: String, date: NaiveDate },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
