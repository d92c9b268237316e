use crate::model::attendance::AttendanceEvent;
use crate::model::member::Member;
use crate::models::{MemberPayload, ReportEntry};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance

Records members of an organization as present, at most once per calendar day.

### Key Features
- **Mark attendance** from a JSON payload or by uploading a picture of a member's QR code
- **Members** are created on their first mark and never overwritten afterwards
- **Reports** grouped by date, a per-day CSV export, and a raw dump of both tables

### QR payloads
Either a JSON object (`regno`/`register_no`/`registerNo`/`registerno`, `name`,
`designation`, `department`, `year`) or the comma-separated form
`regno,name,designation,department,year`.

---
Built with **Rust**, **Actix Web**, **SQLx** and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::mark_attendance,
        crate::api::attendance::scan_image,
        crate::api::attendance::db_dump,
        crate::api::attendance::export_csv,
        crate::api::attendance::check_attendance
    ),
    components(
        schemas(
            MemberPayload,
            Member,
            AttendanceEvent,
            ReportEntry
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance marking and reporting APIs"),
    )
)]
pub struct ApiDoc;
