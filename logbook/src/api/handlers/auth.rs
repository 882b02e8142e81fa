use crate::auth::{SessionQuery, VerifiedUser};

/// Verify an identity token and return the uid it was issued for.
#[utoipa::path(
    get,
    path = "/verified_id_token",
    tag = "auth",
    summary = "Verify identity token",
    params(SessionQuery),
    responses(
        (status = 200, description = "Token is valid; body is the uid", body = String, content_type = "text/plain"),
        (status = 401, description = "Invalid user session", body = String, content_type = "text/plain"),
    )
)]
#[tracing::instrument(skip_all, fields(uid = %user.uid))]
pub async fn verified_id_token(user: VerifiedUser) -> String {
    user.uid
}
