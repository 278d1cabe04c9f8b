//! Metadata matcher
//!
//! A conjunction of criteria applied to message metadata, message properties
//! or stream metadata. Used by `load`, `load_reverse` and the stream name
//! enumerations.
//!
//! ```
//! use eventfile_core::{FieldType, MetadataMatcher, Operator, Value};
//!
//! let matcher = MetadataMatcher::new()
//!     .with_metadata_match("_aggregate_version", Operator::GreaterThan, Value::Int(2), FieldType::Metadata)
//!     .unwrap();
//! assert_eq!(matcher.len(), 1);
//! ```

use crate::error::{Error, Result};
use crate::message::Message;
use crate::types::Metadata;
use crate::value::Value;
use regex::Regex;
use std::cmp::Ordering;

/// Message properties that can be matched with [`FieldType::MessageProperty`]
pub const MESSAGE_PROPERTIES: [&str; 3] = ["uuid", "message_name", "created_at"];

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Equals,
    /// `!=`
    NotEquals,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEquals,
    /// `<`
    LowerThan,
    /// `<=`
    LowerThanEquals,
    /// Value is one of an array
    In,
    /// Value is none of an array
    NotIn,
    /// String value matches a regex
    Regex,
}

/// Where a criterion looks up its field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Message or stream metadata
    Metadata,
    /// Built-in message property (`uuid`, `message_name`, `created_at`)
    MessageProperty,
}

#[derive(Debug, Clone)]
struct Criterion {
    field: String,
    operator: Operator,
    value: Value,
    field_type: FieldType,
    pattern: Option<Regex>,
}

impl Criterion {
    fn matches(&self, actual: Option<Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.operator {
            Operator::Equals => actual == self.value,
            Operator::NotEquals => actual != self.value,
            Operator::GreaterThan => self.compare(&actual, |o| o == Ordering::Greater),
            Operator::GreaterThanEquals => self.compare(&actual, |o| o != Ordering::Less),
            Operator::LowerThan => self.compare(&actual, |o| o == Ordering::Less),
            Operator::LowerThanEquals => self.compare(&actual, |o| o != Ordering::Greater),
            Operator::In => self.candidates().iter().any(|c| *c == actual),
            Operator::NotIn => !self.candidates().iter().any(|c| *c == actual),
            Operator::Regex => match (&self.pattern, actual.as_str()) {
                (Some(re), Some(s)) => re.is_match(s),
                _ => false,
            },
        }
    }

    fn compare(&self, actual: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
        actual
            .partial_cmp_loose(&self.value)
            .map(accept)
            .unwrap_or(false)
    }

    fn candidates(&self) -> &[Value] {
        self.value.as_array().unwrap_or(&[])
    }
}

/// Conjunction of metadata criteria
#[derive(Debug, Clone, Default)]
pub struct MetadataMatcher {
    criteria: Vec<Criterion>,
}

impl MetadataMatcher {
    /// Matcher without criteria (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `In`/`NotIn` is not given an array, if `Regex` is
    /// not given a valid pattern string, or if a message property is unknown.
    pub fn with_metadata_match(
        mut self,
        field: impl Into<String>,
        operator: Operator,
        value: Value,
        field_type: FieldType,
    ) -> Result<Self> {
        let field = field.into();

        if field_type == FieldType::MessageProperty && !MESSAGE_PROPERTIES.contains(&field.as_str())
        {
            return Err(Error::InvalidArgument(format!(
                "Unknown message property \"{}\"",
                field
            )));
        }

        let pattern = match operator {
            Operator::In | Operator::NotIn if value.as_array().is_none() => {
                return Err(Error::InvalidArgument(format!(
                    "Value for operator {:?} must be an array",
                    operator
                )));
            }
            Operator::Regex => {
                let source = value.as_str().ok_or_else(|| {
                    Error::InvalidArgument("Value for operator Regex must be a string".to_string())
                })?;
                Some(Regex::new(source).map_err(|e| {
                    Error::InvalidArgument(format!("Invalid regex pattern given: {}", e))
                })?)
            }
            _ => None,
        };

        self.criteria.push(Criterion {
            field,
            operator,
            value,
            field_type,
            pattern,
        });
        Ok(self)
    }

    /// Number of criteria
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// True if there are no criteria
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Check a message against every criterion
    pub fn matches_message(&self, message: &Message) -> bool {
        self.criteria.iter().all(|c| {
            let actual = match c.field_type {
                FieldType::Metadata => message.metadata().get(&c.field).cloned(),
                FieldType::MessageProperty => message_property(message, &c.field),
            };
            c.matches(actual)
        })
    }

    /// Check stream metadata; message property criteria do not apply
    pub fn matches_metadata(&self, metadata: &Metadata) -> bool {
        self.criteria
            .iter()
            .filter(|c| c.field_type == FieldType::Metadata)
            .all(|c| c.matches(metadata.get(&c.field).cloned()))
    }
}

fn message_property(message: &Message, property: &str) -> Option<Value> {
    match property {
        "uuid" => Some(Value::String(message.uuid().to_string())),
        "message_name" => Some(Value::from(message.message_name())),
        "created_at" => message.created_at().format().ok().map(Value::String),
        _ => None,
    }
}
