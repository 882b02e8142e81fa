use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::IntoParams;

use super::verifier::AuthRejected;
use crate::{AppState, errors::Error};

/// Query parameters carrying the caller's session.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionQuery {
    /// Identity token issued by the provider
    #[serde(default)]
    pub id_token: String,
    /// When present, must equal the uid the token was issued for
    pub uid: Option<String>,
}

/// The caller, as established by a verified identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: String,
}

impl FromRequestParts<AppState> for VerifiedUser {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // An unparseable query string carries no usable session either
        let Query(session) = Query::<SessionQuery>::try_from_uri(&parts.uri).map_err(|_| AuthRejected::Missing)?;

        let uid = state.verifier.verify(&session.id_token).await?;

        if let Some(presented) = session.uid
            && presented != uid
        {
            return Err(AuthRejected::UidMismatch { presented }.into());
        }

        debug!(%uid, "Authenticated request");
        Ok(Self { uid })
    }
}
