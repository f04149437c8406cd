use actix_web::{HttpResponse, ResponseError};

pub type Result<T> = std::result::Result<T, ApiError>;

/// Request-level errors surfaced to API clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("movie {0} not found")]
    MovieNotFound(u32),

    #[error("no shards reachable")]
    ShardsUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::UserNotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "user_not_found",
                "error_description": self.to_string()
            })),
            ApiError::MovieNotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "movie_not_found",
                "error_description": self.to_string()
            })),
            ApiError::InvalidRequest(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "invalid_request",
                "error_description": msg
            })),
            ApiError::ShardsUnavailable => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "shards_unavailable",
                    "error_description": "No workers answered within the deadline"
                }))
            }
            ApiError::Internal(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "internal_error",
                "error_description": "Internal server error"
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::UserNotFound(999_999_999).error_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::InvalidRequest("bad".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ShardsUnavailable.error_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Internal("boom".into()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
