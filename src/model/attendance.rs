use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One member marked present on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEvent {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "REG123")]
    pub regno: String,
    #[schema(example = "2026-01-01", format = "date")]
    pub date: String,
    /// Absent on rows written before the column existed.
    #[schema(example = "3:45:12 PM", nullable = true)]
    pub time: Option<String>,
    pub present: bool,
}

impl AttendanceEvent {
    pub fn into_tuple(self) -> (i64, String, String, Option<String>, bool) {
        (self.id, self.regno, self.date, self.time, self.present)
    }
}

/// Event joined with the profile of the member it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct EventWithMember {
    pub id: i64,
    pub regno: String,
    pub name: String,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub date: String,
    pub time: Option<String>,
}
