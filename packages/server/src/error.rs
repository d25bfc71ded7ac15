use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use hashbin_common::EngineFailure;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable error description.
    #[schema(example = "File not found.")]
    pub error: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request, e.g. a missing multipart part.
    BadRequest(String),
    /// Missing or rejected Basic credentials.
    Unauthorized,
    NotFound(String),
    /// The storage engine reported a failure.
    Engine(EngineFailure),
    Internal(String),
}

const AUTH_REALM: &str = "Basic realm=\"Login Required\"";

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody { error: msg }),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "Could not verify your access level for that URL. \
                        You have to login with proper credentials"
                        .into(),
                },
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody { error: msg }),
            AppError::Engine(failure) => {
                let status = match failure {
                    EngineFailure::SaveError | EngineFailure::MetadataError => {
                        StatusCode::BAD_REQUEST
                    }
                    EngineFailure::DeleteError | EngineFailure::ReadError => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (
                    status,
                    ErrorBody {
                        error: failure.to_string(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Internal Server Error".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let challenge = matches!(self, AppError::Unauthorized);

        let (status, body) = self.status_and_body();

        if challenge {
            (status, [(header::WWW_AUTHENTICATE, AUTH_REALM)], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<EngineFailure> for AppError {
    fn from(failure: EngineFailure) -> Self {
        AppError::Engine(failure)
    }
}
