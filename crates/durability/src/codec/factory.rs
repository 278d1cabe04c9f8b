//! Message factories
//!
//! A factory turns a record read from the backing file back into a message.
//! [`EventRegistry`] only accepts names registered up front and checks that
//! each payload decodes into its event type. [`GenericMessageFactory`]
//! accepts any name and is the default for fixture-style stores.

use super::record::MessageRecord;
use eventfile_core::message::payload_into;
use eventfile_core::{DomainEvent, Error, Message, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Rebuilds messages from records, by message name
pub trait MessageFactory: Send + Sync {
    /// Rebuild the message stored under `message_name`
    ///
    /// # Errors
    ///
    /// - `UnknownEventType` if the factory cannot build `message_name`
    /// - `MalformedRecord` if the record does not fit the event
    fn create_message_from_record(
        &self,
        message_name: &str,
        record: MessageRecord,
    ) -> Result<Message>;
}

fn check_name(message_name: &str, record: &MessageRecord) -> Result<()> {
    if record.message_name != message_name {
        return Err(Error::malformed(format!(
            "record is named \"{}\" but was rebuilt as \"{}\"",
            record.message_name, message_name
        )));
    }
    Ok(())
}

/// Factory that accepts every message name
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericMessageFactory;

impl MessageFactory for GenericMessageFactory {
    fn create_message_from_record(
        &self,
        message_name: &str,
        record: MessageRecord,
    ) -> Result<Message> {
        check_name(message_name, &record)?;
        Ok(record.into_message())
    }
}

type Rebuild = Box<dyn Fn(MessageRecord) -> Result<Message> + Send + Sync>;

/// Factory with an explicit table of known message names
///
/// ```
/// use eventfile_durability::EventRegistry;
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
/// let registry = EventRegistry::new().register_event::<UserRegistered>();
/// assert!(registry.contains("UserRegistered"));
/// ```
#[derive(Default)]
pub struct EventRegistry {
    entries: BTreeMap<String, Rebuild>,
}

impl EventRegistry {
    /// Registry with no entries
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rebuild function for `message_name`, replacing any earlier one
    pub fn register<F>(mut self, message_name: impl Into<String>, rebuild: F) -> Self
    where
        F: Fn(MessageRecord) -> Result<Message> + Send + Sync + 'static,
    {
        self.entries.insert(message_name.into(), Box::new(rebuild));
        self
    }

    /// Register a typed domain event under its message name
    ///
    /// Records are only accepted if their payload decodes into `T`.
    pub fn register_event<T: DomainEvent + 'static>(self) -> Self {
        self.register(T::MESSAGE_NAME, |record| {
            payload_into::<T>(T::MESSAGE_NAME, &record.payload)?;
            Ok(record.into_message())
        })
    }

    /// Whether `message_name` is registered
    pub fn contains(&self, message_name: &str) -> bool {
        self.entries.contains_key(message_name)
    }

    /// Registered message names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MessageFactory for EventRegistry {
    fn create_message_from_record(
        &self,
        message_name: &str,
        record: MessageRecord,
    ) -> Result<Message> {
        let rebuild = self
            .entries
            .get(message_name)
            .ok_or_else(|| Error::UnknownEventType(message_name.to_string()))?;
        check_name(message_name, &record)?;
        rebuild(record)
    }
}
