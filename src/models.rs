use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::model::member::Member;

/// Accepted spellings of the register number, first non-empty one wins.
pub const REGNO_ALIASES: [&str; 4] = ["regno", "register_no", "registerNo", "registerno"];

/// Member fields as submitted by a client or read from a QR code, before
/// validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "regno": "REG123",
    "name": "Alice Example",
    "designation": "Member",
    "department": "CSE",
    "year": "3"
}))]
pub struct MemberPayload {
    /// Also accepted as `register_no`, `registerNo` or `registerno`
    #[schema(example = "REG123")]
    pub regno: Option<String>,
    #[schema(example = "Alice Example")]
    pub name: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
}

impl MemberPayload {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            regno: REGNO_ALIASES.iter().find_map(|key| text_field(map, key)),
            name: text_field(map, "name"),
            designation: text_field(map, "designation"),
            department: text_field(map, "department"),
            year: text_field(map, "year"),
        }
    }

    /// Anything other than a JSON object yields an empty payload.
    pub fn from_value(value: &Value) -> Self {
        value.as_object().map(Self::from_map).unwrap_or_default()
    }

    pub fn has_required_fields(&self) -> bool {
        self.regno.is_some() && self.name.is_some()
    }

    /// The member record this payload describes, if it names one.
    pub fn to_member(&self) -> Option<Member> {
        Some(Member {
            regno: self.regno.clone()?,
            name: self.name.clone()?,
            designation: self.designation.clone(),
            department: self.department.clone(),
            year: self.year.clone(),
        })
    }
}

/// Trimmed text of a scalar field; blanks and nulls count as missing.
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match map.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Outcome of a mark attempt. `ok` is false only for rejected input;
/// callers must check it rather than look for missing fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkResult {
    pub ok: bool,
    pub message: String,
    #[serde(flatten)]
    pub detail: MarkDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkDetail {
    Recorded {
        regno: String,
        name: String,
        attendance_id: i64,
        is_new: bool,
        time: Option<String>,
    },
    /// Carries the submission exactly as received.
    Rejected {
        data: Value,
    },
}

impl MarkResult {
    pub fn attendance_id(&self) -> Option<i64> {
        match &self.detail {
            MarkDetail::Recorded { attendance_id, .. } => Some(*attendance_id),
            MarkDetail::Rejected { .. } => None,
        }
    }

    pub fn is_new(&self) -> Option<bool> {
        match &self.detail {
            MarkDetail::Recorded { is_new, .. } => Some(*is_new),
            MarkDetail::Rejected { .. } => None,
        }
    }

    pub fn time(&self) -> Option<&str> {
        match &self.detail {
            MarkDetail::Recorded { time, .. } => time.as_deref(),
            MarkDetail::Rejected { .. } => None,
        }
    }
}

/// Reply to an image scan: the mark outcome plus what the QR code held.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub message: String,
    pub decoded: Value,
    pub attendance_id: Option<i64>,
    pub is_new: Option<bool>,
    pub time: Option<String>,
}

impl ScanResponse {
    pub fn new(result: MarkResult, decoded: Value) -> Self {
        Self {
            attendance_id: result.attendance_id(),
            is_new: result.is_new(),
            time: result.time().map(str::to_string),
            message: result.message,
            decoded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportEntry {
    #[schema(example = "Alice Example")]
    pub name: String,
    #[schema(example = "REG123")]
    pub regno: String,
    #[schema(example = "3:45:12 PM", nullable = true)]
    pub time: Option<String>,
}

/// Attendance grouped by date, newest date first. Serialized as a JSON
/// object whose keys keep that order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DateReport {
    days: Vec<(String, Vec<ReportEntry>)>,
}

impl DateReport {
    /// Appends to the current day when `date` matches it, otherwise opens a
    /// new one. Rows must arrive grouped by date.
    pub fn push(&mut self, date: String, entry: ReportEntry) {
        match self.days.last_mut() {
            Some((current, entries)) if *current == date => entries.push(entry),
            _ => self.days.push((date, vec![entry])),
        }
    }
}

#[cfg(test)]
impl DateReport {
    pub fn get(&self, date: &str) -> Option<&[ReportEntry]> {
        self.days
            .iter()
            .find(|(day, _)| day == date)
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.days.iter().map(|(day, _)| day.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl Serialize for DateReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (day, entries) in &self.days {
            map.serialize_entry(day, entries)?;
        }
        map.end()
    }
}

pub type MemberRow = (String, String, Option<String>, Option<String>, Option<String>);
pub type EventRow = (i64, String, String, Option<String>, bool);

/// Raw contents of both tables as positional rows.
#[derive(Debug, Default, Serialize)]
pub struct TableDump {
    pub members: Vec<MemberRow>,
    pub attendance: Vec<EventRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use serde_json::json;
    use speculoos::prelude::*;

    #[rstest]
    #[case(json!({"regno": "REG1", "name": "A"}))]
    #[case(json!({"register_no": "REG1", "name": "A"}))]
    #[case(json!({"registerNo": "REG1", "name": "A"}))]
    #[case(json!({"registerno": "REG1", "name": "A"}))]
    #[case(json!({"regno": "", "register_no": "REG1", "name": "A"}))]
    #[case(json!({"regno": null, "registerno": " REG1 ", "name": "A"}))]
    fn register_number_aliases(#[case] input: Value) {
        let payload = MemberPayload::from_value(&input);
        assert_that!(payload.regno).is_equal_to(Some("REG1".to_string()));
    }

    #[test]
    fn first_alias_wins() {
        let payload = MemberPayload::from_value(&json!({
            "registerno": "LAST",
            "regno": "FIRST",
            "name": "A"
        }));
        assert_that!(payload.regno.as_deref()).is_equal_to(Some("FIRST"));
    }

    #[test]
    fn numeric_fields_are_stringified() {
        let payload = MemberPayload::from_value(&json!({"regno": 42, "name": "A", "year": 3}));

        assert_that!(payload.regno.as_deref()).is_equal_to(Some("42"));
        assert_that!(payload.year.as_deref()).is_equal_to(Some("3"));
    }

    #[rstest]
    #[case(json!({"name": "A"}))]
    #[case(json!({"regno": "REG1"}))]
    #[case(json!({"regno": "REG1", "name": "   "}))]
    #[case(json!(["REG1", "A"]))]
    #[case(json!("REG1,A"))]
    fn incomplete_payloads_have_no_member(#[case] input: Value) {
        let payload = MemberPayload::from_value(&input);

        assert_that!(payload.has_required_fields()).is_false();
        assert_that!(payload.to_member()).is_none();
    }

    #[test]
    fn report_serializes_in_push_order() {
        let entry = |name: &str| ReportEntry {
            name: name.to_string(),
            regno: name.to_uppercase(),
            time: None,
        };
        let mut report = DateReport::default();
        report.push("2026-02-01".to_string(), entry("b"));
        report.push("2026-02-01".to_string(), entry("a"));
        report.push("2026-01-01".to_string(), entry("c"));

        let text = serde_json::to_string(&report).unwrap();
        let newer = text.find("2026-02-01").unwrap();
        let older = text.find("2026-01-01").unwrap();
        assert_that!(newer).is_less_than(older);
        assert_that!(report.get("2026-02-01").map(<[_]>::len)).is_equal_to(Some(2));
    }

    #[test]
    fn mark_result_flattens_detail() {
        let result = MarkResult {
            ok: true,
            message: "done".to_string(),
            detail: MarkDetail::Recorded {
                regno: "REG1".to_string(),
                name: "A".to_string(),
                attendance_id: 7,
                is_new: true,
                time: Some("9:00:00 AM".to_string()),
            },
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_that!(value["attendance_id"].as_i64()).is_equal_to(Some(7));
        assert_that!(value["is_new"].as_bool()).is_equal_to(Some(true));
        assert_that!(value["ok"].as_bool()).is_equal_to(Some(true));
    }
}
