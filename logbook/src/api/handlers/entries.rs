use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::entries::{EntryRequest, EntryResponse},
    auth::{SessionQuery, VerifiedUser},
    db::{handlers::Entries, models::entries::Entry, store::Fields},
    errors::Result,
};

/// Record an activity entry for the caller.
#[utoipa::path(
    post,
    path = "/entries",
    tag = "entries",
    summary = "Create entry",
    params(SessionQuery),
    request_body = EntryRequest,
    responses(
        (status = 201, description = "Entry created", body = EntryResponse),
        (status = 400, description = "A required field is missing or has the wrong type"),
        (status = 401, description = "Invalid user session"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all, fields(uid = %user.uid))]
pub async fn create_entry(
    State(state): State<AppState>,
    user: VerifiedUser,
    body: std::result::Result<Json<Fields>, JsonRejection>,
) -> Result<(StatusCode, Json<EntryResponse>)> {
    let Json(body) = body?;
    let entry = Entry::from_fields(user.uid, &body)?;
    let reference = Entries::new(state.store.clone()).add(&entry).await?;

    Ok((
        StatusCode::CREATED,
        Json(EntryResponse {
            reference: reference.to_string(),
            entry,
        }),
    ))
}

/// List the caller's entries, oldest first.
#[utoipa::path(
    get,
    path = "/entries",
    tag = "entries",
    summary = "List entries",
    params(SessionQuery),
    responses(
        (status = 200, description = "The caller's entries", body = Vec<EntryResponse>),
        (status = 401, description = "Invalid user session"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all, fields(uid = %user.uid))]
pub async fn list_entries(State(state): State<AppState>, user: VerifiedUser) -> Result<Json<Vec<EntryResponse>>> {
    let entries = Entries::new(state.store.clone()).list_where("owner", &user.uid).await?;
    Ok(Json(entries.into_iter().map(EntryResponse::from).collect()))
}
