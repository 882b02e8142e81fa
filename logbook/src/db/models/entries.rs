//! Activity entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Entity, EntityError, deserialize_timestamp, non_empty, require_present, required, required_timestamp};
use crate::db::store::Fields;

/// Stored in `entries`. No unique key: every construction is a new row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// uid of the owning account
    pub owner: String,
    pub created: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start: DateTime<Utc>,
    /// Label references
    pub tags: Vec<String>,
    pub note: String,
}

impl Entry {
    pub const REQUIRED_FIELDS: [&'static str; 3] = ["start", "tags", "note"];

    pub fn from_fields(owner: impl Into<String>, fields: &Fields) -> Result<Self, EntityError> {
        let owner = non_empty("owner", owner.into())?;
        require_present(fields, &Self::REQUIRED_FIELDS)?;
        Ok(Self {
            owner,
            created: Utc::now(),
            start: required_timestamp(fields, "start")?,
            tags: required(fields, "tags")?,
            note: required(fields, "note")?,
        })
    }
}

impl Entity for Entry {
    const COLLECTION: &'static str = "entries";
}
