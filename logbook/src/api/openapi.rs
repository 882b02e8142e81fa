//! OpenAPI document served at `/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::{
    api::{
        handlers,
        models::{
            accounts::{AccountRequest, AccountResponse, AccountSaved},
            entries::{EntryRequest, EntryResponse},
            labels::{LabelRequest, LabelResponse},
        },
    },
    db::models::{accounts::Account, entries::Entry, labels::Label},
};

/// Documents the `id_token` query parameter as the session credential.
struct IdTokenAddon;

impl Modify for IdTokenAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "IdToken",
                SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::with_description(
                    "id_token",
                    "Identity token issued by the configured provider",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "logbook", description = "Accounts, activity entries and labels behind an identity provider"),
    paths(
        handlers::auth::verified_id_token,
        handlers::accounts::upsert_current_account,
        handlers::accounts::get_current_account,
        handlers::entries::create_entry,
        handlers::entries::list_entries,
        handlers::labels::create_label,
        handlers::labels::list_labels,
    ),
    components(schemas(
        AccountRequest,
        AccountSaved,
        AccountResponse,
        EntryRequest,
        EntryResponse,
        LabelRequest,
        LabelResponse,
        Account,
        Entry,
        Label,
    )),
    modifiers(&IdTokenAddon),
    security(("IdToken" = [])),
    tags(
        (name = "auth", description = "Identity token verification"),
        (name = "accounts", description = "The caller's account"),
        (name = "entries", description = "Activity entries"),
        (name = "labels", description = "Labels attached to entries"),
    )
)]
pub struct ApiDoc;
