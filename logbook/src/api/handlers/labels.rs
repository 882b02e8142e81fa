use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::labels::{LabelRequest, LabelResponse},
    auth::{SessionQuery, VerifiedUser},
    db::{handlers::Labels, models::labels::Label, store::Fields},
    errors::Result,
};

#[utoipa::path(
    post,
    path = "/labels",
    tag = "labels",
    summary = "Create label",
    params(SessionQuery),
    request_body = LabelRequest,
    responses(
        (status = 201, description = "Label created", body = LabelResponse),
        (status = 400, description = "A required field is missing or has the wrong type"),
        (status = 401, description = "Invalid user session"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all, fields(uid = %user.uid))]
pub async fn create_label(
    State(state): State<AppState>,
    user: VerifiedUser,
    body: std::result::Result<Json<Fields>, JsonRejection>,
) -> Result<(StatusCode, Json<LabelResponse>)> {
    let Json(body) = body?;
    let label = Label::from_fields(user.uid, &body)?;
    let reference = Labels::new(state.store.clone()).add(&label).await?;

    Ok((
        StatusCode::CREATED,
        Json(LabelResponse {
            reference: reference.to_string(),
            label,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/labels",
    tag = "labels",
    summary = "List labels",
    params(SessionQuery),
    responses(
        (status = 200, description = "The caller's labels", body = Vec<LabelResponse>),
        (status = 401, description = "Invalid user session"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all, fields(uid = %user.uid))]
pub async fn list_labels(State(state): State<AppState>, user: VerifiedUser) -> Result<Json<Vec<LabelResponse>>> {
    let labels = Labels::new(state.store.clone()).list_where("owner", &user.uid).await?;
    Ok(Json(labels.into_iter().map(LabelResponse::from).collect()))
}
