use serde_json::{Map, Value, json};

/// Field order of the comma-separated QR format.
const CSV_FIELDS: [&str; 5] = ["regno", "name", "designation", "department", "year"];

/// Shape decoded QR text into a candidate payload object.
///
/// A JSON object is taken as is. Otherwise the text is read as
/// `regno,name,designation,department,year` (parts beyond the fifth are
/// ignored). Text that fits neither comes back unguessed, under `raw` for a
/// single part or `raw_parts` for two to four.
pub fn parse_qr_text(text: &str) -> Value {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Value::Object(map);
    }

    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    match parts.len() {
        n if n >= CSV_FIELDS.len() => {
            let map: Map<String, Value> = CSV_FIELDS
                .iter()
                .zip(&parts)
                .map(|(key, part)| (key.to_string(), Value::String(part.to_string())))
                .collect();
            Value::Object(map)
        }
        1 => json!({ "raw": text }),
        _ => json!({ "raw_parts": parts }),
    }
}
