//! Response envelopes built from storage rows.

use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};

use crate::storage::{ListenerRow, ResultRow};

pub const TARGET_ID_KEY: &str = "targetId";
pub const TARGET_NAME_KEY: &str = "targetName";
pub const UPDATED_AT_KEY: &str = "updatedAt";

/// `responseTime` format, local time.
const RESPONSE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time formatted for `responseTime`.
pub fn response_time() -> String {
    Local::now().format(RESPONSE_TIME_FORMAT).to_string()
}

impl ResultRow {
    /// Flatten into one object: the reserved keys first, then every payload
    /// key on top. Payload keys overwrite reserved ones of the same name.
    pub fn flatten(self) -> Map<String, JsonValue> {
        let mut object = Map::new();
        object.insert(TARGET_ID_KEY.to_string(), self.target_id.into());
        object.insert(TARGET_NAME_KEY.to_string(), self.target_name.into());
        object.insert(UPDATED_AT_KEY.to_string(), self.updated_at.into());

        for (key, value) in self.payload {
            object.insert(key, value);
        }

        object
    }
}

/// `{ responseTime, <category>: { version, data: [...] } }`
pub fn category_envelope(
    category: &str,
    version: &str,
    rows: Vec<ResultRow>,
    response_time: String,
) -> JsonValue {
    let data: Vec<JsonValue> = rows
        .into_iter()
        .map(|row| JsonValue::Object(row.flatten()))
        .collect();

    let mut envelope = Map::new();
    envelope.insert("responseTime".to_string(), response_time.into());
    envelope.insert(
        category.to_string(),
        json!({ "version": version, "data": data }),
    );

    JsonValue::Object(envelope)
}

/// `{ responseTime, <listener>: { <category>: { version, data: [...] } } }`
///
/// Rows are grouped under the category each one reports, in first-seen order.
/// Rows with an empty category name are skipped. With no rows the listener
/// maps to an empty object.
pub fn listener_envelope(
    listener_id: &str,
    version: &str,
    rows: Vec<ListenerRow>,
    response_time: String,
) -> JsonValue {
    let mut categories = Map::new();

    for ListenerRow { category_name, row } in rows {
        if category_name.is_empty() {
            continue;
        }

        let section = categories
            .entry(category_name)
            .or_insert_with(|| json!({ "version": version, "data": [] }));

        if let Some(data) = section.get_mut("data").and_then(JsonValue::as_array_mut) {
            data.push(JsonValue::Object(row.flatten()));
        }
    }

    let mut envelope = Map::new();
    envelope.insert("responseTime".to_string(), response_time.into());
    envelope.insert(listener_id.to_string(), JsonValue::Object(categories));

    JsonValue::Object(envelope)
}

/// Single target lookup: the flattened row itself.
pub fn target_object(row: ResultRow) -> JsonValue {
    JsonValue::Object(row.flatten())
}

/// Schema lookup response.
#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub category: String,
    pub version: String,
    pub schema: JsonValue,
}
