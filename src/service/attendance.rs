use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, error, info};

use super::clock::{Clock, LocalClock, display_time};
use crate::error::Result;
use crate::model::attendance::AttendanceEvent;
use crate::models::{DateReport, MarkDetail, MarkResult, MemberPayload, ReportEntry, TableDump};
use crate::store::{AttendanceStore, StoreError};

pub const CSV_HEADER: [&str; 8] = [
    "id",
    "regno",
    "name",
    "designation",
    "department",
    "year",
    "date",
    "time",
];

/// Attendance for one date rendered as CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub date: NaiveDate,
    pub body: String,
}

impl CsvExport {
    pub fn filename(&self) -> String {
        format!("attendance_{}.csv", self.date.format("%Y-%m-%d"))
    }
}

/// Marks members present at most once per calendar day and reads the
/// recorded attendance back. Holds no state of its own; every call goes to
/// the store.
pub struct AttendanceService<S, C = LocalClock> {
    store: Arc<S>,
    clock: C,
}

impl<S, C> AttendanceService<S, C>
where
    S: AttendanceStore,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self { store, clock }
    }

    /// Server-local calendar date.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }

    /// Record today's attendance for the member the submitted fields name,
    /// creating the member on first sight.
    ///
    /// Missing `regno` or `name` is not an error: the result comes back with
    /// `ok = false`, the submission echoed as given, and nothing is written.
    pub async fn mark(&self, submitted: Value) -> Result<MarkResult> {
        let payload = MemberPayload::from_value(&submitted);
        let Some(member) = payload.to_member() else {
            debug!(?payload, "Rejected mark without regno or name");
            return Ok(MarkResult {
                ok: false,
                message: "Invalid data: regno and name required".to_string(),
                detail: MarkDetail::Rejected { data: submitted },
            });
        };

        let now = self.clock.now();
        let today = now.date();
        let time = display_time(now.time());

        self.store
            .upsert_member(&member)
            .await
            .inspect_err(|e| store_failed("upsert_member", &member.regno, today, e))?;

        let existing = self
            .store
            .find_event(&member.regno, today)
            .await
            .inspect_err(|e| store_failed("find_event", &member.regno, today, e))?;
        if let Some(existing) = existing {
            return Ok(already_marked(member.regno, member.name, today, existing));
        }

        match self.store.insert_event(&member.regno, today, &time).await {
            Ok(attendance_id) => {
                info!(regno = %member.regno, attendance_id, date = %today, "Attendance marked");
                Ok(MarkResult {
                    ok: true,
                    message: format!("Attendance marked for {} on {}.", member.name, today),
                    detail: MarkDetail::Recorded {
                        regno: member.regno,
                        name: member.name,
                        attendance_id,
                        is_new: true,
                        time: Some(time),
                    },
                })
            }
            // Lost a race with a concurrent mark for the same member and day.
            Err(err @ StoreError::AlreadyMarked { .. }) => {
                let winner = self
                    .store
                    .find_event(&member.regno, today)
                    .await
                    .inspect_err(|e| store_failed("find_event", &member.regno, today, e))?;
                match winner {
                    Some(existing) => Ok(already_marked(member.regno, member.name, today, existing)),
                    None => {
                        store_failed("insert_event", &member.regno, today, &err);
                        Err(err.into())
                    }
                }
            }
            Err(e) => {
                store_failed("insert_event", &member.regno, today, &e);
                Err(e.into())
            }
        }
    }

    /// Every recorded event grouped by date, newest date first and in id
    /// order within a date.
    pub async fn report_by_date(&self) -> Result<DateReport> {
        let rows = self.store.list_events_with_member(None).await?;

        let mut report = DateReport::default();
        for row in rows {
            report.push(
                row.date,
                ReportEntry {
                    name: row.name,
                    regno: row.regno,
                    time: row.time,
                },
            );
        }
        Ok(report)
    }

    /// Attendance for `date` as CSV, one row per event in id order. A date
    /// without events yields only the header.
    pub async fn export_csv(&self, date: NaiveDate) -> Result<CsvExport> {
        let rows = self.store.list_events_with_member(Some(date)).await?;

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for row in &rows {
            writer.write_record([
                row.id.to_string().as_str(),
                row.regno.as_str(),
                row.name.as_str(),
                row.designation.as_deref().unwrap_or_default(),
                row.department.as_deref().unwrap_or_default(),
                row.year.as_deref().unwrap_or_default(),
                row.date.as_str(),
                row.time.as_deref().unwrap_or_default(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush csv writer: {}", e.error()))?;
        let body = String::from_utf8(bytes).context("csv export is not valid utf-8")?;

        debug!(date = %date, rows = rows.len(), "CSV export rendered");
        Ok(CsvExport { date, body })
    }

    /// Both tables, untouched, for inspection.
    pub async fn dump(&self) -> Result<TableDump> {
        let members = self.store.list_members().await?;
        let events = self.store.list_events().await?;

        Ok(TableDump {
            members: members.into_iter().map(|m| m.into_tuple()).collect(),
            attendance: events.into_iter().map(AttendanceEvent::into_tuple).collect(),
        })
    }
}

fn store_failed(operation: &str, regno: &str, date: NaiveDate, e: &StoreError) {
    error!(operation, regno, date = %date, error = %e, "Store operation failed");
}

fn already_marked(
    regno: String,
    name: String,
    today: NaiveDate,
    existing: AttendanceEvent,
) -> MarkResult {
    debug!(regno = %regno, attendance_id = existing.id, "Attendance already marked today");
    MarkResult {
        ok: true,
        message: format!("{name} has already marked attendance for {today}!"),
        detail: MarkDetail::Recorded {
            regno,
            name,
            attendance_id: existing.id,
            is_new: false,
            time: existing.time,
        },
    }
}
