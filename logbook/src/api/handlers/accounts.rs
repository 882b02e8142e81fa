use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    AppState,
    api::models::accounts::{AccountRequest, AccountResponse, AccountSaved},
    auth::{SessionQuery, VerifiedUser},
    db::{
        handlers::{Accounts, Entries, Labels},
        models::accounts::Account,
        store::Fields,
    },
    errors::{Error, Result},
};

/// Create or replace the caller's account.
///
/// The uid always comes from the token; a `uid` key in the body is ignored.
#[utoipa::path(
    put,
    path = "/accounts/current",
    tag = "accounts",
    summary = "Save current account",
    params(SessionQuery),
    request_body = AccountRequest,
    responses(
        (status = 200, description = "Account created or updated", body = AccountSaved),
        (status = 400, description = "A required field is missing or has the wrong type"),
        (status = 401, description = "Invalid user session"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all, fields(uid = %user.uid))]
pub async fn upsert_current_account(
    State(state): State<AppState>,
    user: VerifiedUser,
    body: std::result::Result<Json<Fields>, JsonRejection>,
) -> Result<Json<AccountSaved>> {
    let Json(body) = body?;
    let account = Account::from_fields(user.uid, &body)?;
    let reference = Accounts::new(state.store.clone()).update_or_add(&account).await?;

    Ok(Json(AccountSaved {
        reference: reference.to_string(),
        uid: account.uid,
    }))
}

/// Read the caller's account with its entries and labels.
#[utoipa::path(
    get,
    path = "/accounts/current",
    tag = "accounts",
    summary = "Get current account",
    params(SessionQuery),
    responses(
        (status = 200, description = "The caller's account", body = AccountResponse),
        (status = 401, description = "Invalid user session"),
        (status = 404, description = "No account exists for the caller"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all, fields(uid = %user.uid))]
pub async fn get_current_account(State(state): State<AppState>, user: VerifiedUser) -> Result<Json<AccountResponse>> {
    let Some(stored) = Accounts::new(state.store.clone()).by_unique_key(&user.uid).await? else {
        return Err(Error::NotFound {
            resource: "Account".to_string(),
            id: user.uid,
        });
    };

    let entries = Entries::new(state.store.clone()).list_where("owner", &user.uid).await?;
    let labels = Labels::new(state.store.clone()).list_where("owner", &user.uid).await?;

    Ok(Json(AccountResponse {
        reference: stored.reference.to_string(),
        account: stored.entity,
        entries: entries.into_iter().map(Into::into).collect(),
        labels: labels.into_iter().map(Into::into).collect(),
    }))
}
