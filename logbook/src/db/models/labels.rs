use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Entity, EntityError, non_empty, require_present, required};
use crate::db::store::Fields;

/// Stored in `tags`. Referenced by name from [`super::entries::Entry::tags`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub owner: String,
    pub created: DateTime<Utc>,
    pub name: String,
    /// Display color token, usually a hex code such as `#ff8800`
    pub color: String,
}

impl Label {
    pub const REQUIRED_FIELDS: [&'static str; 2] = ["name", "color"];

    pub fn from_fields(owner: impl Into<String>, fields: &Fields) -> Result<Self, EntityError> {
        let owner = non_empty("owner", owner.into())?;
        require_present(fields, &Self::REQUIRED_FIELDS)?;
        Ok(Self {
            owner,
            created: Utc::now(),
            name: required(fields, "name")?,
            color: required(fields, "color")?,
        })
    }
}

impl Entity for Label {
    const COLLECTION: &'static str = "tags";
}
