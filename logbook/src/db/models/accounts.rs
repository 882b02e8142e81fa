//! Account records, one per identity-provider subject.
//!
//! `expYears` accepts any JSON number and keeps its integer part, so `4.5` is stored as `4`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    Entity, EntityError, deserialize_timestamp, non_empty, require_present, required, required_timestamp,
    required_whole_number,
};
use crate::db::store::Fields;

/// Stored in `users`, unique by `uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Subject identifier issued by the identity provider
    pub uid: String,
    pub created: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub birth: DateTime<Utc>,
    pub exp_years: i64,
    pub email: String,
}

impl Account {
    pub const REQUIRED_FIELDS: [&'static str; 3] = ["birth", "expYears", "email"];

    /// Build an account for `uid` from a raw field mapping.
    ///
    /// `uid` is not read from `fields`: it comes from the verified token, so an account can
    /// never be constructed without its key.
    pub fn from_fields(uid: impl Into<String>, fields: &Fields) -> Result<Self, EntityError> {
        let uid = non_empty("uid", uid.into())?;
        require_present(fields, &Self::REQUIRED_FIELDS)?;
        Ok(Self {
            uid,
            created: Utc::now(),
            birth: required_timestamp(fields, "birth")?,
            exp_years: required_whole_number(fields, "expYears")?,
            email: required(fields, "email")?,
        })
    }
}

impl Entity for Account {
    const COLLECTION: &'static str = "users";
    const UNIQUE_KEY: Option<&'static str> = Some("uid");

    fn unique_key_value(&self) -> Option<&str> {
        Some(self.uid.as_str())
    }
}
