use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dalkit_data::{DataError, GuardError, Rejection};

/// Helper to create a JSON error response with a standard
/// `{ "error": message }` body.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

/// Outward HTTP error for dalkit handlers.
///
/// The concurrency-protocol variants carry no payload: each one maps to
/// exactly one status/message pair, and clients are expected to branch on
/// those, so the pairs are part of the API contract.
pub enum ApiError {
    /// 428 — mutating request without an `If-Match` precondition.
    PreconditionRequired,
    /// 404
    NotFound,
    /// 410 — the resource is soft-deleted.
    Gone,
    /// 412 — the client's tag no longer matches the stored tag.
    PreconditionFailed,
    /// 409 — lost the write race; re-fetch and retry deliberately.
    Stale,
    /// 409 — constraint violation, with a short detail.
    Conflict(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PreconditionRequired => StatusCode::PRECONDITION_REQUIRED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Gone => StatusCode::GONE,
            ApiError::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            ApiError::Stale | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::PreconditionRequired => "Update requires If-Match header.".to_string(),
            ApiError::NotFound => "Not Found.".to_string(),
            ApiError::Gone => "Gone.".to_string(),
            ApiError::PreconditionFailed => "Precondition Failed.".to_string(),
            ApiError::Stale => "Stale Data.".to_string(),
            ApiError::Conflict(detail) => format!("Conflict. {detail}"),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.message())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status(), self.message())
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::PreconditionRequired => ApiError::PreconditionRequired,
            Rejection::NotFound => ApiError::NotFound,
            Rejection::Gone => ApiError::Gone,
            Rejection::PreconditionFailed => ApiError::PreconditionFailed,
            Rejection::Stale => ApiError::Stale,
        }
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(_) => ApiError::NotFound,
            DataError::Constraint { message, .. } => ApiError::Conflict(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Rejected(rejection) => rejection.into(),
            GuardError::Data(data) => data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_outcome_pairs() {
        let cases = [
            (
                ApiError::PreconditionRequired,
                StatusCode::PRECONDITION_REQUIRED,
                "Update requires If-Match header.",
            ),
            (ApiError::NotFound, StatusCode::NOT_FOUND, "Not Found."),
            (ApiError::Gone, StatusCode::GONE, "Gone."),
            (
                ApiError::PreconditionFailed,
                StatusCode::PRECONDITION_FAILED,
                "Precondition Failed.",
            ),
            (ApiError::Stale, StatusCode::CONFLICT, "Stale Data."),
        ];
        for (err, status, message) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.message(), message);
        }
    }

    #[test]
    fn conflict_carries_detail() {
        let err = ApiError::from(DataError::Constraint {
            kind: dalkit_data::ConstraintKind::Unique,
            message: "duplicate key".into(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "Conflict. duplicate key");
    }

    #[test]
    fn rejections_map_one_to_one() {
        assert_eq!(
            ApiError::from(Rejection::Stale).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(Rejection::Gone).status(),
            StatusCode::GONE
        );
    }

    #[tokio::test]
    async fn response_body_is_error_json() {
        let resp = ApiError::NotFound.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Not Found.");
    }
}
