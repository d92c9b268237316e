use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_DISPOSITION;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use utoipa::IntoParams;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{MarkResult, MemberPayload, ScanResponse};
use crate::qr::{DecoderChain, parse_qr_text};
use crate::service::{AttendanceService, LocalClock};
use crate::store::SqliteStore;

pub type AppService = AttendanceService<SqliteStore, LocalClock>;

/// Multipart field holding the uploaded picture.
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Day to export as `YYYY-MM-DD`, today when omitted
    pub date: Option<String>,
}

fn mark_status(result: &MarkResult) -> StatusCode {
    if result.ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// Mark attendance
#[utoipa::path(
    post,
    path = "/mark_attendance",
    request_body = MemberPayload,
    responses(
        (status = 200, description = "Marked, or already marked today", body = Object, example = json!({
            "ok": true,
            "message": "Attendance marked for Alice Example on 2026-01-01.",
            "regno": "REG123",
            "name": "Alice Example",
            "attendance_id": 1,
            "is_new": true,
            "time": "3:45:12 PM"
        })),
        (status = 400, description = "regno or name missing", body = Object, example = json!({
            "ok": false,
            "message": "Invalid data: regno and name required",
            "data": { "name": "Alice Example" }
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    service: web::Data<AppService>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    debug!(payload = %body.0, "Received mark request");

    let result = service.mark(body.into_inner()).await?;

    Ok(HttpResponse::build(mark_status(&result)).json(result))
}

/// Scan a QR image and mark attendance
#[utoipa::path(
    post,
    path = "/scan",
    request_body(content = String, description = "Multipart form with an `image` file", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "QR decoded and attendance marked", body = Object, example = json!({
            "message": "Attendance marked for Alice Example on 2026-01-01.",
            "decoded": { "regno": "REG123", "name": "Alice Example", "designation": "Member", "department": "CSE", "year": "3" },
            "attendance_id": 1,
            "is_new": true,
            "time": "3:45:12 PM"
        })),
        (status = 400, description = "No image, no QR code, or QR without regno/name", body = Object, example = json!({
            "message": "QR decoded but missing required fields",
            "decoded": { "raw": "hello" }
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn scan_image(
    service: web::Data<AppService>,
    decoder: web::Data<DecoderChain>,
    config: web::Data<Config>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let image = read_upload(payload, IMAGE_FIELD, config.max_upload_bytes)
        .await?
        .ok_or_else(|| AppError::invalid_input("No image uploaded"))?;

    let text = decoder
        .decode(&image)
        .await
        .ok_or(AppError::DecodeFailure)?;
    debug!(qr_text = %text, "QR decoded");

    let decoded = parse_qr_text(&text);
    if !MemberPayload::from_value(&decoded).has_required_fields() {
        return Err(AppError::MalformedPayload { decoded });
    }

    let result = service.mark(decoded.clone()).await?;
    let status = mark_status(&result);

    Ok(HttpResponse::build(status).json(ScanResponse::new(result, decoded)))
}

/// Bytes of the named multipart field, or `None` when the form lacks it.
async fn read_upload(
    mut payload: Multipart,
    field_name: &str,
    limit: usize,
) -> Result<Option<Vec<u8>>> {
    let upload_error = |e: actix_multipart::MultipartError| {
        AppError::invalid_input(format!("Invalid upload: {e}"))
    };

    while let Some(mut field) = payload.try_next().await.map_err(upload_error)? {
        if field.content_disposition().get_name() != Some(field_name) {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(upload_error)? {
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::invalid_input(format!(
                    "Image larger than {limit} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(Some(bytes));
    }

    Ok(None)
}

/// Dump raw tables
#[utoipa::path(
    get,
    path = "/db_dump",
    responses(
        (status = 200, description = "Members and attendance rows as arrays", body = Object, example = json!({
            "members": [["REG123", "Alice Example", "Member", "CSE", "3"]],
            "attendance": [[1, "REG123", "2026-01-01", "3:45:12 PM", true]]
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn db_dump(service: web::Data<AppService>) -> Result<HttpResponse> {
    let dump = service.dump().await?;
    Ok(HttpResponse::Ok().json(dump))
}

/// Export one day as CSV
#[utoipa::path(
    get,
    path = "/export_csv",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String,
            example = json!("id,regno,name,designation,department,year,date,time\n1,REG123,Alice Example,Member,CSE,3,2026-01-01,3:45:12 PM\n")),
        (status = 400, description = "date is not YYYY-MM-DD"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn export_csv(
    service: web::Data<AppService>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse> {
    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::invalid_input(format!("Invalid date {raw:?}, expected YYYY-MM-DD")))?,
        None => service.today(),
    };

    let export = service.export_csv(date).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename()),
        ))
        .body(export.body))
}

/// Attendance grouped by date
#[utoipa::path(
    get,
    path = "/check_attendance",
    responses(
        (status = 200, description = "Date to members present, newest date first", body = Object, example = json!({
            "2026-01-02": [{ "name": "Alice Example", "regno": "REG123", "time": "9:01:44 AM" }],
            "2026-01-01": [{ "name": "Alice Example", "regno": "REG123", "time": "3:45:12 PM" }]
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_attendance(service: web::Data<AppService>) -> Result<HttpResponse> {
    let report = service.report_by_date().await?;
    Ok(HttpResponse::Ok().json(report))
}
