use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{Stored, labels::Label};

/// Body of `POST /labels`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LabelRequest {
    pub name: String,
    #[schema(example = "#ff8800")]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LabelResponse {
    #[schema(example = "tags/550e8400-e29b-41d4-a716-446655440000")]
    pub reference: String,
    pub label: Label,
}

impl From<Stored<Label>> for LabelResponse {
    fn from(stored: Stored<Label>) -> Self {
        Self {
            reference: stored.reference.to_string(),
            label: stored.entity,
        }
    }
}
