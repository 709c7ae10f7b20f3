use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::bucket::DataType;

/// A typed custom-property value as recorded with an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDataValue {
    Boolean(bool),
    Number(f64),
    Date(DateTime<Utc>),
    String(String),
    Array(Vec<serde_json::Value>),
}

impl EventDataValue {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Number(_) => DataType::Number,
            Self::Date(_) => DataType::Date,
            Self::String(_) => DataType::String,
            Self::Array(_) => DataType::Array,
        }
    }

    /// Text form kept in `string_value`. Numbers always carry four fraction
    /// digits so the bucketing step can strip `.0000` from integral values.
    pub fn string_value(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => format!("{n:.4}"),
            Self::Date(at) => at.to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::String(s) => s.clone(),
            Self::Array(items) => serde_json::Value::Array(items.clone()).to_string(),
        }
    }

    pub fn number_value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn date_value(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(at) => Some(*at),
            _ => None,
        }
    }
}

/// One stored property of one event, mirroring the `event_data` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDataRecord {
    pub website_id: String,
    /// Identifier of the event the property belongs to.
    pub event_id: String,
    pub event_name: String,
    pub data_key: String,
    pub value: EventDataValue,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn numbers_are_stored_with_four_fraction_digits() {
        assert_eq!(EventDataValue::Number(12.0).string_value(), "12.0000");
        assert_eq!(EventDataValue::Number(2.5).string_value(), "2.5000");
        assert_eq!(EventDataValue::Number(12.0).data_type(), DataType::Number);
    }

    #[test]
    fn dates_keep_both_text_and_timestamp() {
        let at = Utc
            .with_ymd_and_hms(2024, 5, 1, 8, 30, 0)
            .single()
            .expect("valid");
        let value = EventDataValue::Date(at);
        assert_eq!(value.string_value(), "2024-05-01T08:30:00.000Z");
        assert_eq!(value.date_value(), Some(at));
        assert_eq!(value.number_value(), None);
    }

    #[test]
    fn arrays_are_serialized_as_json() {
        let value = EventDataValue::Array(vec![serde_json::json!("a"), serde_json::json!(1)]);
        assert_eq!(value.string_value(), r#"["a",1]"#);
        assert_eq!(value.data_type(), DataType::Array);
    }
}
