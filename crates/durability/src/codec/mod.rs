//! Event codec
//!
//! Converts messages to the generic records stored in the backing file and
//! rebuilds messages from those records through a [`MessageFactory`].

pub mod factory;
pub mod record;

pub use factory::{EventRegistry, GenericMessageFactory, MessageFactory};
pub use record::{MessageConverter, MessageRecord, RecordError};
