use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{entries::EntryResponse, labels::LabelResponse};
use crate::db::models::accounts::Account;

/// Body of `PUT /accounts/current`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    #[schema(example = "1990-05-17")]
    pub birth: String,
    /// Years of experience
    pub exp_years: i64,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountSaved {
    #[schema(example = "users/550e8400-e29b-41d4-a716-446655440000")]
    pub reference: String,
    pub uid: String,
}

/// An account together with everything it owns.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountResponse {
    pub reference: String,
    pub account: Account,
    pub entries: Vec<EntryResponse>,
    pub labels: Vec<LabelResponse>,
}
