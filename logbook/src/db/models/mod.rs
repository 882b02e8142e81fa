//! Record kinds persisted by the repositories.
//!
//! Every kind is built from a raw field mapping (a request body, usually) by its
//! `from_fields` factory. Factories are pure: they copy the required keys, stamp
//! `created` with the current time, and fail with [`EntityError::MissingField`] when a
//! required key is absent. Presence of every required key is checked before any value is
//! decoded, so a missing key wins over a malformed one. Values are not range-checked.
//!
//! # Identity
//!
//! Entities carry no local identifier. A persisted record is addressed by the
//! [`DocumentRef`](crate::db::store::DocumentRef) the store assigned to it, and reads
//! return both together as [`Stored`].
//!
//! # Kinds
//!
//! - [`accounts::Account`]: keyed by `uid`, collection `users`
//! - [`entries::Entry`]: no unique key, collection `entries`
//! - [`labels::Label`]: no unique key, collection `tags`

pub mod accounts;
pub mod entries;
pub mod labels;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::db::store::{DocumentRef, FieldFilter, Fields};

/// Errors raised while building an entity from raw fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for field `{field}`: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("`{0}` must not be empty")]
    EmptyKey(&'static str),
}

/// A record kind that can be stored in a document collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Collection the kind is stored in
    const COLLECTION: &'static str;

    /// Field whose equality identifies "the same" record, if the kind declares one
    const UNIQUE_KEY: Option<&'static str> = None;

    /// This entity's value for [`Entity::UNIQUE_KEY`].
    fn unique_key_value(&self) -> Option<&str> {
        None
    }

    /// Filter selecting documents with this entity's unique key value.
    fn unique_key(&self) -> Option<FieldFilter> {
        Some(FieldFilter::eq(Self::UNIQUE_KEY?, self.unique_key_value()?))
    }

    fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            // Entities are plain structs; anything else is a programming error
            other => unreachable!("entity serialized to a non-object: {other:?}"),
        }
    }

    fn from_document(reference: &DocumentRef, fields: Fields) -> crate::db::errors::Result<Self> {
        serde_json::from_value(Value::Object(fields)).map_err(|e| crate::db::errors::DbError::Malformed {
            reference: reference.to_string(),
            message: e.to_string(),
        })
    }
}

/// An entity paired with the reference of the document it was read from or written to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<E> {
    pub reference: DocumentRef,
    pub entity: E,
}

/// Fail with `MissingField` for the first of `keys` absent from `fields`.
pub(crate) fn require_present(fields: &Fields, keys: &[&'static str]) -> Result<(), EntityError> {
    match keys.iter().find(|key| !fields.contains_key(**key)) {
        Some(key) => Err(EntityError::MissingField(*key)),
        None => Ok(()),
    }
}

/// Read a required field, distinguishing "absent" from "present but the wrong shape".
pub(crate) fn required<T: DeserializeOwned>(fields: &Fields, key: &'static str) -> Result<T, EntityError> {
    let value = fields.get(key).ok_or(EntityError::MissingField(key))?;
    serde_json::from_value(value.clone()).map_err(|e| EntityError::InvalidField {
        field: key,
        message: e.to_string(),
    })
}

/// Like [`required`] for timestamps, accepting either RFC 3339 or a bare `YYYY-MM-DD` date.
pub(crate) fn required_timestamp(fields: &Fields, key: &'static str) -> Result<DateTime<Utc>, EntityError> {
    let raw: String = required(fields, key)?;
    parse_timestamp(&raw).ok_or_else(|| EntityError::InvalidField {
        field: key,
        message: format!("`{raw}` is neither an RFC 3339 timestamp nor a YYYY-MM-DD date"),
    })
}

/// Like [`required`] for whole numbers. Any JSON number is accepted; fractions are
/// truncated toward zero.
pub(crate) fn required_whole_number(fields: &Fields, key: &'static str) -> Result<i64, EntityError> {
    let value = fields.get(key).ok_or(EntityError::MissingField(key))?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|n| n.trunc() as i64))
        .ok_or_else(|| EntityError::InvalidField {
            field: key,
            message: format!("expected a number, got `{value}`"),
        })
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Serde adapter so stored documents written with bare dates still decode.
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`")))
}

fn non_empty(key: &'static str, value: String) -> Result<String, EntityError> {
    if value.is_empty() {
        Err(EntityError::EmptyKey(key))
    } else {
        Ok(value)
    }
}
