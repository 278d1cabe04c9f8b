//! Backing file document
//!
//! The whole store is one JSON object with three sections:
//!
//! ```text
//! {
//!   "events":        { "<stream>": [ <record>, ... ], ... },
//!   "event_streams": { "<stream>": { <stream metadata> }, ... },
//!   "projections":   { "<name>": <opaque value>, ... }
//! }
//! ```
//!
//! ## Decoding rules
//!
//! - An empty (or whitespace-only) file is an empty store
//! - A missing or `null` section is an empty section
//! - Invalid JSON, a non-object document or an ill-shaped section is a
//!   persistence failure
//! - A missing or malformed `created_at` is a persistence failure
//! - Unknown message names and ill-shaped records fail through the factory
//!
//! There is no partial load: the first failing record fails the whole decode.

use crate::codec::{MessageConverter, MessageFactory, MessageRecord, RecordError};
use crate::encoding::EncodeOptions;
use eventfile_core::{Error, Message, Result, StreamName, Value};
use eventfile_memory::StoreSnapshot;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Section holding the messages of every stream
pub const SECTION_EVENTS: &str = "events";
/// Section holding the metadata of every stream
pub const SECTION_EVENT_STREAMS: &str = "event_streams";
/// Section holding projection data
pub const SECTION_PROJECTIONS: &str = "projections";

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Converts whole store snapshots to and from backing file bytes
#[derive(Clone)]
pub struct DocumentCodec {
    factory: Arc<dyn MessageFactory>,
    converter: MessageConverter,
    options: EncodeOptions,
}

impl fmt::Debug for DocumentCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCodec")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DocumentCodec {
    /// Codec rebuilding messages through `factory`
    pub fn new(factory: Arc<dyn MessageFactory>, options: EncodeOptions) -> Self {
        DocumentCodec {
            factory,
            converter: MessageConverter::new(),
            options,
        }
    }

    /// Encoding options used by [`DocumentCodec::encode`]
    pub fn options(&self) -> EncodeOptions {
        self.options
    }

    // ========================================================================
    // Decode
    // ========================================================================

    /// Decode file bytes read from `path`
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> Result<StoreSnapshot> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::persistence(path, format!("file is not valid UTF-8: {}", e)))?;
        if text.trim().is_empty() {
            return Ok(StoreSnapshot::new());
        }

        let document: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::persistence(path, format!("invalid JSON: {}", e)))?;
        let document = document
            .as_object()
            .ok_or_else(|| Error::persistence(path, "document is not a JSON object"))?;

        let mut snapshot = StoreSnapshot::new();

        for (stream, records) in section(path, document, SECTION_EVENTS)?.into_iter().flatten() {
            let name = stream_name(path, stream)?;
            let records = match records {
                serde_json::Value::Array(records) => records,
                _ => {
                    return Err(Error::persistence(
                        path,
                        format!("events of stream \"{}\" are not a list", stream),
                    ))
                }
            };
            let messages = records
                .iter()
                .enumerate()
                .map(|(position, json)| self.decode_record(path, stream, position, json))
                .collect::<Result<Vec<_>>>()?;
            snapshot.events.insert(name, messages);
        }

        for (stream, metadata) in section(path, document, SECTION_EVENT_STREAMS)?
            .into_iter()
            .flatten()
        {
            let name = stream_name(path, stream)?;
            let metadata = crate::codec::record::mapping(Some(metadata), "metadata").map_err(
                |e| Error::persistence(path, format!("stream \"{}\": {}", stream, e)),
            )?;
            snapshot.event_streams.insert(name, metadata);
        }

        for (name, data) in section(path, document, SECTION_PROJECTIONS)?
            .into_iter()
            .flatten()
        {
            snapshot
                .projections
                .insert(name.clone(), Value::from(data.clone()));
        }

        snapshot.normalize();
        Ok(snapshot)
    }

    fn decode_record(
        &self,
        path: &Path,
        stream: &str,
        position: usize,
        json: &serde_json::Value,
    ) -> Result<Message> {
        let at = || format!("stream \"{}\" event {}", stream, position + 1);
        let record = MessageRecord::from_json(json).map_err(|e| match e {
            RecordError::MissingTimestamp | RecordError::InvalidTimestamp(_) => {
                Error::persistence(path, format!("{}: {}", at(), e))
            }
            other => Error::malformed(format!("{}: {}", at(), other)),
        })?;
        let message_name = record.message_name.clone();
        self.factory.create_message_from_record(&message_name, record)
    }

    // ========================================================================
    // Encode
    // ========================================================================

    /// Encode a snapshot into file bytes destined for `path`
    ///
    /// Fails with a persistence error if any value cannot be written.
    pub fn encode(&self, path: &Path, snapshot: &StoreSnapshot) -> Result<Vec<u8>> {
        let document = self.to_document(snapshot).map_err(|reason| {
            Error::persistence(path, format!("encoding failed: {}", reason))
        })?;
        let text = self
            .options
            .encode(&document)
            .map_err(|e| Error::persistence(path, format!("encoding failed: {}", e)))?;
        Ok(text.into_bytes())
    }

    fn to_document(&self, snapshot: &StoreSnapshot) -> std::result::Result<serde_json::Value, String> {
        let mut events = JsonMap::new();
        for (stream, messages) in &snapshot.events {
            let records = messages
                .iter()
                .enumerate()
                .map(|(position, message)| {
                    self.converter.to_record(message).to_json().map_err(|e| {
                        format!("stream \"{}\" event {}: {}", stream, position + 1, e)
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            events.insert(stream.to_string(), serde_json::Value::Array(records));
        }

        let mut event_streams = JsonMap::new();
        for (stream, metadata) in &snapshot.event_streams {
            let json = Value::Object(metadata.clone())
                .to_json()
                .map_err(|e| format!("metadata of stream \"{}\": {}", stream, e))?;
            event_streams.insert(stream.to_string(), json);
        }

        let mut projections = JsonMap::new();
        for (name, data) in &snapshot.projections {
            let json = data
                .to_json()
                .map_err(|e| format!("projection \"{}\": {}", name, e))?;
            projections.insert(name.clone(), json);
        }

        let mut document = JsonMap::new();
        document.insert(SECTION_EVENTS.to_string(), serde_json::Value::Object(events));
        document.insert(
            SECTION_EVENT_STREAMS.to_string(),
            serde_json::Value::Object(event_streams),
        );
        document.insert(
            SECTION_PROJECTIONS.to_string(),
            serde_json::Value::Object(projections),
        );
        Ok(serde_json::Value::Object(document))
    }
}

fn section<'a>(path: &Path, document: &'a JsonMap, key: &str) -> Result<Option<&'a JsonMap>> {
    match document.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) => Ok(Some(map)),
        Some(serde_json::Value::Array(items)) if items.is_empty() => Ok(None),
        Some(_) => Err(Error::persistence(
            path,
            format!("section \"{}\" is not an object", key),
        )),
    }
}

fn stream_name(path: &Path, name: &str) -> Result<StreamName> {
    StreamName::try_new(name).ok_or_else(|| Error::persistence(path, "empty stream name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EventRegistry, GenericMessageFactory};
    use eventfile_core::{Metadata, Timestamp};

    fn codec() -> DocumentCodec {
        DocumentCodec::new(Arc::new(GenericMessageFactory), EncodeOptions::default())
    }

    fn path() -> &'static Path {
        Path::new("/tmp/store.json")
    }

    fn user_registered() -> Message {
        let mut payload = Metadata::new();
        payload.insert("id".to_string(), Value::from("u1"));
        Message::new("UserRegistered", payload)
            .with_created_at(Timestamp::from_micros(1_704_067_200_123_456))
    }

    fn sample_snapshot() -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new();
        let name = StreamName::new("user-u1");
        snapshot.events.insert(name.clone(), vec![user_registered()]);
        let mut md = Metadata::new();
        md.insert("owner".to_string(), Value::from("ops"));
        snapshot.event_streams.insert(name, md);
        snapshot
            .projections
            .insert("users".to_string(), Value::from(serde_json::json!({"count": 1})));
        snapshot
    }

    #[test]
    fn test_empty_and_blank_files_are_empty_stores() {
        assert!(codec().decode(path(), b"").unwrap().is_empty());
        assert!(codec().decode(path(), b"  \n\t").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_persistence_error() {
        let err = codec().decode(path(), b"{not json").unwrap_err();
        assert!(err.is_persistence());
    }

    #[test]
    fn test_non_object_document_is_persistence_error() {
        let err = codec().decode(path(), b"[1, 2]").unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let snapshot = codec().decode(path(), b"{}").unwrap();
        assert!(snapshot.is_empty());

        let snapshot = codec()
            .decode(path(), br#"{"event_streams": {"orphan": {}}}"#)
            .unwrap();
        assert_eq!(snapshot.stream_count(), 1);
        assert!(snapshot.events[&StreamName::new("orphan")].is_empty());
    }

    #[test]
    fn test_round_trip() {
        let snapshot = sample_snapshot();
        let bytes = codec().encode(path(), &snapshot).unwrap();
        assert_eq!(codec().decode(path(), &bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_encoding_is_stable() {
        let snapshot = sample_snapshot();
        let first = codec().encode(path(), &snapshot).unwrap();
        let second = codec().encode(path(), &snapshot).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sections_and_created_at_layout() {
        let bytes = codec().encode(path(), &sample_snapshot()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json["events"]["user-u1"][0]["created_at"],
            "2024-01-01 00:00:00.123456"
        );
        assert_eq!(json["event_streams"]["user-u1"]["owner"], "ops");
        assert_eq!(json["projections"]["users"]["count"], 1);
    }

    #[test]
    fn test_bytes_value_fails_encode() {
        let mut snapshot = sample_snapshot();
        snapshot
            .projections
            .insert("blob".to_string(), Value::Bytes(vec![0xff]));
        let err = codec().encode(path(), &snapshot).unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("projection \"blob\""));
    }

    #[test]
    fn test_nan_fails_encode() {
        let mut snapshot = StoreSnapshot::new();
        let message = Message::new("Measured", Metadata::new())
            .with_added_metadata("reading", f64::NAN);
        snapshot
            .events
            .insert(StreamName::new("sensor-1"), vec![message]);
        snapshot.normalize();
        assert!(codec().encode(path(), &snapshot).unwrap_err().is_persistence());
    }

    #[test]
    fn test_malformed_timestamp_is_persistence_error() {
        let doc = br#"{"events": {"s": [{
            "created_at": "yesterday",
            "message_name": "Ping",
            "uuid": "2b0d2d1c-3c54-4a4e-9b57-3a4c3c7b0c11",
            "payload": {}, "metadata": {}
        }]}}"#;
        let err = codec().decode(path(), doc).unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("stream \"s\" event 1"));
    }

    #[test]
    fn test_missing_payload_is_malformed_record() {
        let doc = br#"{"events": {"s": [{
            "created_at": "2024-01-01 00:00:00.000000",
            "message_name": "Ping",
            "uuid": "2b0d2d1c-3c54-4a4e-9b57-3a4c3c7b0c11",
            "metadata": {}
        }]}}"#;
        let err = codec().decode(path(), doc).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
    }

    #[test]
    fn test_unknown_event_type_with_registry() {
        let strict = DocumentCodec::new(Arc::new(EventRegistry::new()), EncodeOptions::default());
        let bytes = codec().encode(path(), &sample_snapshot()).unwrap();
        let err = strict.decode(path(), &bytes).unwrap_err();
        assert!(matches!(err, Error::UnknownEventType(name) if name == "UserRegistered"));
    }

    #[test]
    fn test_events_must_be_a_list() {
        let err = codec()
            .decode(path(), br#"{"events": {"s": {"0": {}}}}"#)
            .unwrap_err();
        assert!(err.is_persistence());
    }
}
