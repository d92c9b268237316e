use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use super::{AttendanceStore, StoreError, date_key, schema};
use crate::model::attendance::{AttendanceEvent, EventWithMember};
use crate::model::member::Member;

const EVENT_WITH_MEMBER_COLUMNS: &str = r#"
    SELECT attendance.id, attendance.regno, members.name, members.designation,
           members.department, members.year, attendance.date, attendance.time
    FROM attendance
    JOIN members ON attendance.regno = members.regno
"#;

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for SqliteStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        schema::ensure_schema(&self.pool).await
    }

    async fn upsert_member(&self, member: &Member) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO members (regno, name, designation, department, year)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member.regno)
        .bind(&member.name)
        .bind(&member.designation)
        .bind(&member.department)
        .bind(&member.year)
        .execute(&self.pool)
        .await?;

        debug!(regno = %member.regno, created = result.rows_affected() == 1, "Member upserted");
        Ok(())
    }

    async fn find_event(
        &self,
        regno: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceEvent>, StoreError> {
        let event = sqlx::query_as::<_, AttendanceEvent>(
            r#"
            SELECT id, regno, date, time, present
            FROM attendance
            WHERE regno = ? AND date = ?
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(regno)
        .bind(date_key(date))
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn insert_event(
        &self,
        regno: &str,
        date: NaiveDate,
        time: &str,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO attendance (regno, date, time, present) VALUES (?, ?, ?, 1)",
        )
        .bind(regno)
        .bind(date_key(date))
        .bind(time)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::AlreadyMarked {
                    regno: regno.to_string(),
                    date,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_events_with_member(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<EventWithMember>, StoreError> {
        let rows = match date {
            Some(date) => {
                let sql = format!(
                    "{EVENT_WITH_MEMBER_COLUMNS} WHERE attendance.date = ? ORDER BY attendance.id ASC"
                );
                sqlx::query_as::<_, EventWithMember>(&sql)
                    .bind(date_key(date))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "{EVENT_WITH_MEMBER_COLUMNS} ORDER BY attendance.date DESC, attendance.id ASC"
                );
                sqlx::query_as::<_, EventWithMember>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    async fn list_members(&self) -> Result<Vec<Member>, StoreError> {
        let members = sqlx::query_as::<_, Member>(
            "SELECT regno, name, designation, department, year FROM members ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn list_events(&self) -> Result<Vec<AttendanceEvent>, StoreError> {
        let events = sqlx::query_as::<_, AttendanceEvent>(
            "SELECT id, regno, date, time, present FROM attendance ORDER BY date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use rstest::*;
    use speculoos::prelude::*;

    fn member(regno: &str, name: &str) -> Member {
        Member {
            regno: regno.to_string(),
            name: name.to_string(),
            designation: Some("Member".to_string()),
            department: Some("CSE".to_string()),
            year: Some("3".to_string()),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[fixture]
    async fn store() -> SqliteStore {
        let store = SqliteStore::new(memory_pool().await);
        store.ensure_schema().await.unwrap();
        store
    }

    #[rstest]
    #[tokio::test]
    async fn upsert_keeps_the_first_profile(#[future] store: SqliteStore) {
        let store = store.await;
        store.upsert_member(&member("REG1", "Alice")).await.unwrap();

        let mut changed = member("REG1", "Someone Else");
        changed.department = Some("ECE".to_string());
        store.upsert_member(&changed).await.unwrap();

        let members = store.list_members().await.unwrap();
        assert_that!(members).is_equal_to(vec![member("REG1", "Alice")]);
    }

    #[rstest]
    #[tokio::test]
    async fn insert_then_find(#[future] store: SqliteStore) {
        let store = store.await;
        store.upsert_member(&member("REG1", "Alice")).await.unwrap();

        assert_that!(store.find_event("REG1", day(1)).await.unwrap()).is_none();

        let id = store.insert_event("REG1", day(1), "9:00:00 AM").await.unwrap();
        let found = store.find_event("REG1", day(1)).await.unwrap();

        assert_that!(found).is_equal_to(Some(AttendanceEvent {
            id,
            regno: "REG1".to_string(),
            date: "2026-03-01".to_string(),
            time: Some("9:00:00 AM".to_string()),
            present: true,
        }));
        assert_that!(store.find_event("REG1", day(2)).await.unwrap()).is_none();
    }

    #[rstest]
    #[tokio::test]
    async fn second_insert_same_day_is_rejected(#[future] store: SqliteStore) {
        let store = store.await;
        store.upsert_member(&member("REG1", "Alice")).await.unwrap();
        store.insert_event("REG1", day(1), "9:00:00 AM").await.unwrap();

        let err = store
            .insert_event("REG1", day(1), "9:05:00 AM")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AlreadyMarked { .. }));
        assert_that!(store.list_events().await.unwrap()).has_length(1);
    }

    #[rstest]
    #[tokio::test]
    async fn listings_follow_date_and_id_order(#[future] store: SqliteStore) {
        let store = store.await;
        for (regno, name) in [("REG1", "Alice"), ("REG2", "Bob")] {
            store.upsert_member(&member(regno, name)).await.unwrap();
        }
        let first = store.insert_event("REG2", day(1), "8:00:00 AM").await.unwrap();
        let second = store.insert_event("REG1", day(1), "8:30:00 AM").await.unwrap();
        let third = store.insert_event("REG1", day(2), "8:00:00 AM").await.unwrap();

        let ids = |rows: Vec<EventWithMember>| rows.into_iter().map(|r| r.id).collect::<Vec<_>>();

        let one_day = store.list_events_with_member(Some(day(1))).await.unwrap();
        assert_that!(one_day[0].name.as_str()).is_equal_to("Bob");
        assert_that!(ids(one_day)).is_equal_to(vec![first, second]);

        let all = store.list_events_with_member(None).await.unwrap();
        assert_that!(ids(all)).is_equal_to(vec![third, first, second]);

        let raw: Vec<i64> = store.list_events().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_that!(raw).is_equal_to(vec![third, second, first]);
    }

    #[rstest]
    #[tokio::test]
    async fn empty_day_lists_nothing(#[future] store: SqliteStore) {
        let store = store.await;
        let rows = store.list_events_with_member(Some(day(9))).await.unwrap();
        assert_that!(rows).is_empty();
    }
}
