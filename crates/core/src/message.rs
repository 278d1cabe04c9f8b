//! Message (event) type
//!
//! Messages are immutable records in a stream. Each message includes:
//! - A UUID identifying this occurrence
//! - A message name identifying its type (`UserRegistered`)
//! - A payload mapping
//! - A metadata mapping (causation, correlation, aggregate version, ...)
//! - The UTC instant it was created, with microsecond precision
//!
//! Typed domain events implement [`DomainEvent`] and convert to and from
//! this generic envelope.

use crate::contract::Timestamp;
use crate::error::{Error, Result};
use crate::types::Metadata;
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// An event in a stream
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    uuid: Uuid,
    message_name: String,
    payload: Metadata,
    metadata: Metadata,
    created_at: Timestamp,
}

impl Message {
    /// Create a new message stamped with a fresh UUID and the current time
    pub fn new(message_name: impl Into<String>, payload: Metadata) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            message_name: message_name.into(),
            payload,
            metadata: Metadata::new(),
            created_at: Timestamp::now(),
        }
    }

    /// Reassemble a message from all of its parts
    pub fn from_parts(
        uuid: Uuid,
        message_name: impl Into<String>,
        payload: Metadata,
        metadata: Metadata,
        created_at: Timestamp,
    ) -> Self {
        Self {
            uuid,
            message_name: message_name.into(),
            payload,
            metadata,
            created_at,
        }
    }

    /// Unique id of this message
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Type name of this message
    pub fn message_name(&self) -> &str {
        &self.message_name
    }

    /// Payload mapping
    pub fn payload(&self) -> &Metadata {
        &self.payload
    }

    /// Metadata mapping
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Creation instant (UTC, microseconds)
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Copy of this message with one metadata field added or replaced
    pub fn with_added_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Copy of this message with its metadata replaced
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Copy of this message with a different creation instant
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }

    /// Decode the payload as a typed event
    pub fn payload_as<T: DomainEvent>(&self) -> Result<T> {
        T::from_message(self)
    }
}

/// A typed domain event carried inside a [`Message`]
///
/// The payload type is serialized with serde and must serialize to a JSON
/// object.
///
/// ```
/// use eventfile_core::DomainEvent;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct UserRegistered {
///     id: String,
/// }
///
/// impl DomainEvent for UserRegistered {
///     const MESSAGE_NAME: &'static str = "UserRegistered";
/// }
///
/// let message = UserRegistered { id: "u1".into() }.to_message().unwrap();
/// assert_eq!(message.message_name(), "UserRegistered");
/// ```
pub trait DomainEvent: Serialize + DeserializeOwned + Sized {
    /// Message name this type is stored under
    const MESSAGE_NAME: &'static str;

    /// Wrap this event in a new message
    fn to_message(&self) -> Result<Message> {
        Ok(Message::new(Self::MESSAGE_NAME, payload_from(self)?))
    }

    /// Decode this event from a message payload
    fn from_message(message: &Message) -> Result<Self> {
        if message.message_name() != Self::MESSAGE_NAME {
            return Err(Error::malformed(format!(
                "expected message \"{}\", got \"{}\"",
                Self::MESSAGE_NAME,
                message.message_name()
            )));
        }
        payload_into(Self::MESSAGE_NAME, message.payload())
    }
}

/// Serialize a typed payload into a field mapping
pub fn payload_from<T: Serialize>(event: &T) -> Result<Metadata> {
    let json = serde_json::to_value(event)
        .map_err(|e| Error::malformed(format!("payload serialization failed: {}", e)))?;
    match Value::from(json) {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::malformed(format!(
            "payload must serialize to an object, got {}",
            other.type_name()
        ))),
    }
}

/// Deserialize a field mapping into a typed payload
pub fn payload_into<T: DeserializeOwned>(message_name: &str, payload: &Metadata) -> Result<T> {
    let json = Value::Object(payload.clone())
        .to_json()
        .map_err(|e| Error::malformed(format!("{}: {}", message_name, e)))?;
    serde_json::from_value(json)
        .map_err(|e| Error::malformed(format!("{} payload: {}", message_name, e)))
}
