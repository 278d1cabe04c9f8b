//! Message records
//!
//! A record is the generic field mapping a message is stored as:
//!
//! ```text
//! {
//!   "created_at": "2024-01-01 00:00:00.123456",
//!   "message_name": "UserRegistered",
//!   "metadata": { ... },
//!   "payload": { ... },
//!   "uuid": "…"
//! }
//! ```
//!
//! Keys are emitted in sorted order, so the same state always encodes to the
//! same bytes.

use eventfile_core::value::NotRepresentable;
use eventfile_core::{Message, Metadata, Timestamp, TimestampError, Value};
use uuid::Uuid;

/// Record field holding the message id
pub const FIELD_UUID: &str = "uuid";
/// Record field holding the message name
pub const FIELD_MESSAGE_NAME: &str = "message_name";
/// Record field holding the payload object
pub const FIELD_PAYLOAD: &str = "payload";
/// Record field holding the metadata object
pub const FIELD_METADATA: &str = "metadata";
/// Record field holding the creation instant
pub const FIELD_CREATED_AT: &str = "created_at";

/// Failure to read a record out of its JSON form
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// `created_at` is absent or not a string
    #[error("record has no created_at")]
    MissingTimestamp,

    /// `created_at` is present but not in the fixed format
    #[error("invalid created_at: {0}")]
    InvalidTimestamp(#[from] TimestampError),

    /// Any other missing or ill-typed field
    #[error("{0}")]
    Malformed(String),

    /// A value the file format cannot hold
    #[error(transparent)]
    NotRepresentable(#[from] NotRepresentable),
}

/// Generic form of a message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    /// Message id
    pub uuid: Uuid,
    /// Message name
    pub message_name: String,
    /// Payload fields
    pub payload: Metadata,
    /// Metadata fields
    pub metadata: Metadata,
    /// Creation instant
    pub created_at: Timestamp,
}

impl MessageRecord {
    /// Render as a JSON object with `created_at` in the fixed text format
    pub fn to_json(&self) -> Result<serde_json::Value, RecordError> {
        let created_at = self.created_at.format()?;
        let mut object = serde_json::Map::new();
        object.insert(
            FIELD_CREATED_AT.to_string(),
            serde_json::Value::String(created_at),
        );
        object.insert(
            FIELD_MESSAGE_NAME.to_string(),
            serde_json::Value::String(self.message_name.clone()),
        );
        object.insert(
            FIELD_METADATA.to_string(),
            Value::Object(self.metadata.clone()).to_json()?,
        );
        object.insert(
            FIELD_PAYLOAD.to_string(),
            Value::Object(self.payload.clone()).to_json()?,
        );
        object.insert(
            FIELD_UUID.to_string(),
            serde_json::Value::String(self.uuid.to_string()),
        );
        Ok(serde_json::Value::Object(object))
    }

    /// Read a record from its JSON object form
    ///
    /// An empty JSON array is accepted wherever an object is expected, since
    /// some writers cannot tell an empty map from an empty list.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, RecordError> {
        let object = json
            .as_object()
            .ok_or_else(|| RecordError::Malformed("record is not an object".to_string()))?;

        let created_at = match object.get(FIELD_CREATED_AT) {
            Some(serde_json::Value::String(text)) => Timestamp::parse(text)?,
            _ => return Err(RecordError::MissingTimestamp),
        };

        let message_name = object
            .get(FIELD_MESSAGE_NAME)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| missing(FIELD_MESSAGE_NAME, "a string"))?
            .to_string();

        let uuid = object
            .get(FIELD_UUID)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| missing(FIELD_UUID, "a string"))?;
        let uuid = Uuid::parse_str(uuid).map_err(|e| {
            RecordError::Malformed(format!("field \"{}\" is not a valid uuid: {}", FIELD_UUID, e))
        })?;

        Ok(MessageRecord {
            uuid,
            payload: mapping(object.get(FIELD_PAYLOAD), FIELD_PAYLOAD)?,
            metadata: mapping(object.get(FIELD_METADATA), FIELD_METADATA)?,
            message_name,
            created_at,
        })
    }

    /// Rebuild the generic message this record describes
    pub fn into_message(self) -> Message {
        Message::from_parts(
            self.uuid,
            self.message_name,
            self.payload,
            self.metadata,
            self.created_at,
        )
    }
}

fn missing(field: &str, expected: &str) -> RecordError {
    RecordError::Malformed(format!("field \"{}\" must be {}", field, expected))
}

/// Read an object field into a metadata mapping
pub(crate) fn mapping(
    json: Option<&serde_json::Value>,
    field: &str,
) -> Result<Metadata, RecordError> {
    match json {
        Some(serde_json::Value::Object(_)) => match json.cloned().map(Value::from) {
            Some(Value::Object(fields)) => Ok(fields),
            _ => Err(missing(field, "an object")),
        },
        Some(serde_json::Value::Array(items)) if items.is_empty() => Ok(Metadata::new()),
        _ => Err(missing(field, "an object")),
    }
}

/// Converts messages into records
///
/// Conversion is total: every message has a record. Whether the record can
/// be written is decided later, by [`MessageRecord::to_json`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageConverter;

impl MessageConverter {
    /// Create a converter
    pub fn new() -> Self {
        MessageConverter
    }

    /// Generic record of a message
    pub fn to_record(&self, message: &Message) -> MessageRecord {
        MessageRecord {
            uuid: message.uuid(),
            message_name: message.message_name().to_string(),
            payload: message.payload().clone(),
            metadata: message.metadata().clone(),
            created_at: message.created_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Message {
        let mut payload = Metadata::new();
        payload.insert("id".to_string(), Value::from("u1"));
        Message::new("UserRegistered", payload)
            .with_added_metadata("_aggregate_version", 1i64)
            .with_created_at(Timestamp::from_micros(1_704_067_200_123_456))
    }

    #[test]
    fn test_record_json_layout() {
        let record = MessageConverter::new().to_record(&sample());
        let json = record.to_json().unwrap();
        assert_eq!(json["created_at"], "2024-01-01 00:00:00.123456");
        assert_eq!(json["message_name"], "UserRegistered");
        assert_eq!(json["payload"], json!({"id": "u1"}));
        assert_eq!(json["metadata"], json!({"_aggregate_version": 1}));

        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["created_at", "message_name", "metadata", "payload", "uuid"]
        );
    }

    #[test]
    fn test_record_rebuilds_identical_message() {
        let original = sample();
        let json = MessageConverter::new().to_record(&original).to_json().unwrap();
        let rebuilt = MessageRecord::from_json(&json).unwrap().into_message();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_bytes_payload_not_representable() {
        let message = Message::new("Blob", Metadata::new())
            .with_added_metadata("raw", Value::Bytes(vec![1, 2]));
        let err = MessageConverter::new()
            .to_record(&message)
            .to_json()
            .unwrap_err();
        assert!(matches!(err, RecordError::NotRepresentable(_)));
        assert!(err.to_string().contains("$.raw"));
    }

    #[test]
    fn test_missing_created_at() {
        let json = json!({
            "message_name": "UserRegistered",
            "uuid": "2b0d2d1c-3c54-4a4e-9b57-3a4c3c7b0c11",
            "payload": {},
            "metadata": {}
        });
        assert_eq!(
            MessageRecord::from_json(&json).unwrap_err(),
            RecordError::MissingTimestamp
        );
    }

    #[test]
    fn test_bad_created_at() {
        let json = json!({
            "created_at": "2024-01-01T00:00:00Z",
            "message_name": "UserRegistered",
            "uuid": "2b0d2d1c-3c54-4a4e-9b57-3a4c3c7b0c11",
            "payload": {},
            "metadata": {}
        });
        assert!(matches!(
            MessageRecord::from_json(&json).unwrap_err(),
            RecordError::InvalidTimestamp(_)
        ));
    }

    #[test]
    fn test_payload_must_be_object() {
        let json = json!({
            "created_at": "2024-01-01 00:00:00.000000",
            "message_name": "UserRegistered",
            "uuid": "2b0d2d1c-3c54-4a4e-9b57-3a4c3c7b0c11",
            "payload": "u1",
            "metadata": {}
        });
        let err = MessageRecord::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("\"payload\""));
    }

    #[test]
    fn test_empty_array_reads_as_empty_mapping() {
        let json = json!({
            "created_at": "2024-01-01 00:00:00.000000",
            "message_name": "Ping",
            "uuid": "2b0d2d1c-3c54-4a4e-9b57-3a4c3c7b0c11",
            "payload": [],
            "metadata": []
        });
        let record = MessageRecord::from_json(&json).unwrap();
        assert!(record.payload.is_empty());
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn test_invalid_uuid() {
        let json = json!({
            "created_at": "2024-01-01 00:00:00.000000",
            "message_name": "Ping",
            "uuid": "not-a-uuid",
            "payload": {},
            "metadata": {}
        });
        assert!(MessageRecord::from_json(&json)
            .unwrap_err()
            .to_string()
            .contains("valid uuid"));
    }
}
