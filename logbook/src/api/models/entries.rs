use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{Stored, entries::Entry};

/// Body of `POST /entries`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EntryRequest {
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    #[schema(example = "2024-06-01T08:00:00Z")]
    pub start: String,
    /// Label names
    pub tags: Vec<String>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntryResponse {
    #[schema(example = "entries/550e8400-e29b-41d4-a716-446655440000")]
    pub reference: String,
    pub entry: Entry,
}

impl From<Stored<Entry>> for EntryResponse {
    fn from(stored: Stored<Entry>) -> Self {
        Self {
            reference: stored.reference.to_string(),
            entry: stored.entity,
        }
    }
}
