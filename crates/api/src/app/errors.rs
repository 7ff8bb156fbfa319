use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use disclose_access::AccessError;

/// Map the access-control taxonomy onto HTTP statuses.
///
/// Storage failures deny by failing the request; they never degrade into a
/// permissive response.
pub fn access_error_to_response(err: AccessError) -> axum::response::Response {
    match err {
        AccessError::NotAuthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "not_authenticated", "not authenticated")
        }
        AccessError::NotAuthorized => json_error(
            StatusCode::FORBIDDEN,
            "not_authorized",
            "you don't have permission to perform this action",
        ),
        AccessError::AlreadyMember => json_error(
            StatusCode::CONFLICT,
            "already_member",
            "user is already a member of this company",
        ),
        AccessError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        AccessError::InvalidTransition(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition", msg)
        }
        AccessError::InviteFailed(msg) => json_error(StatusCode::BAD_GATEWAY, "invite_failed", msg),
        AccessError::Storage(e) => {
            tracing::error!(error = ?e, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "storage failure, retry later",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
