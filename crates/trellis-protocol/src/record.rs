//! Record model exchanged with `hook` plugins.
//!
//! On the wire a record is a JSON object whose `_id` field packs the
//! record type and key as `"<type>/<key>"`; every other field is an
//! attribute. Hooks receive the decoded record, may mutate it, and the
//! dispatcher re-encodes the mutated value into the response.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::CodecError;

/// Typed record identifier split out of the wire `_id` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordId {
    record_type: String,
    key: String,
}

impl RecordId {
    /// Builds an identifier from its parts.
    #[must_use]
    pub fn new(record_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            key: key.into(),
        }
    }

    /// Parses a wire identifier of the form `<type>/<key>`.
    ///
    /// The key may itself contain `/`; only the first separator splits the
    /// type from the key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedRecord`] when the separator is absent
    /// or the type segment is empty.
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        let Some((record_type, key)) = raw.split_once('/') else {
            return Err(CodecError::malformed_record(format!(
                "record id '{raw}' is missing the '/' separator"
            )));
        };
        if record_type.is_empty() {
            return Err(CodecError::malformed_record(format!(
                "record id '{raw}' has an empty type segment"
            )));
        }
        Ok(Self::new(record_type, key))
    }

    /// The record type segment, used as the hook resolution key.
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// The key segment identifying the individual record.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.record_type, self.key)
    }
}

/// Decoded record handed to `hook` plugins.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    attributes: Map<String, Value>,
}

impl Record {
    /// Builds a record with no attributes.
    #[must_use]
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            attributes: Map::new(),
        }
    }

    /// Decodes a record from its wire value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedRecord`] when the value is not an
    /// object, lacks a string `_id`, or carries a malformed identifier.
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        let Value::Object(fields) = value else {
            return Err(CodecError::malformed_record(
                "record value must be a JSON object",
            ));
        };
        let id = match fields.get("_id") {
            Some(Value::String(raw)) => RecordId::parse(raw)?,
            Some(_) => {
                return Err(CodecError::malformed_record(
                    "record '_id' must be a string",
                ));
            }
            None => {
                return Err(CodecError::malformed_record(
                    "record is missing the '_id' field",
                ));
            }
        };
        let attributes = fields
            .iter()
            .filter(|(name, _)| name.as_str() != "_id")
            .map(|(name, attribute)| (name.clone(), attribute.clone()))
            .collect();
        Ok(Self { id, attributes })
    }

    /// Decodes an optional record; `None` and JSON `null` decode to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedRecord`] when a present, non-null
    /// value fails to decode.
    pub fn from_value_or_none(value: Option<&Value>) -> Result<Option<Self>, CodecError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(present) => Self::from_value(present).map(Some),
        }
    }

    /// Re-encodes the record into its wire value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut fields = Map::with_capacity(self.attributes.len() + 1);
        fields.insert("_id".to_owned(), Value::String(self.id.to_string()));
        for (name, attribute) in &self.attributes {
            fields.insert(name.clone(), attribute.clone());
        }
        Value::Object(fields)
    }

    /// The record identifier.
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Reads an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Writes an attribute, replacing any existing value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Iterates the record's attributes.
    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }
}
