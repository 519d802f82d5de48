use actix_web::http::header::WWW_AUTHENTICATE;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::api::{ErrorMessage, FieldError};
use crate::auth::AuthError;
use crate::books_service::BookServiceError;

/// Error returned by handlers, rendered as the JSON error envelope
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    NotFound { message: String, path: String },

    #[error("Validation failed. Error count: {}", errors.len())]
    Validation {
        errors: Vec<FieldError>,
        path: String,
    },

    #[error("{message}")]
    BadRequest { message: String, path: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{message}")]
    Internal { message: String, path: String },
}

impl ApiError {
    pub fn internal(message: &str, path: &str) -> Self {
        Self::Internal {
            message: message.to_string(),
            path: path.to_string(),
        }
    }

    pub fn from_service(err: BookServiceError, path: &str) -> Self {
        match err {
            BookServiceError::NotFound(_) => Self::NotFound {
                message: err.to_string(),
                path: path.to_string(),
            },
            BookServiceError::Repository(err) => {
                tracing::error!("Book repository failure on {}: {}", path, err);
                Self::internal("Book repository failure", path)
            }
        }
    }

    pub fn from_auth(err: AuthError, path: &str) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) => Self::Unauthorized,
            AuthError::MissingRole(..) => Self::Forbidden,
            AuthError::Unavailable(err) => {
                tracing::error!("Token verification failed on {}: {}", path, err);
                Self::internal("Token verification failed", path)
            }
        }
    }

    pub fn validation(errors: Vec<FieldError>, path: &str) -> Self {
        Self::Validation {
            errors,
            path: path.to_string(),
        }
    }

    pub fn bad_request(message: String, path: &str) -> Self {
        Self::BadRequest {
            message,
            path: path.to_string(),
        }
    }

    fn to_message(&self) -> Option<ErrorMessage> {
        let (message, path, errors) = match self {
            ApiError::Unauthorized | ApiError::Forbidden => return None,
            ApiError::Validation { errors, path } => {
                (self.to_string(), path, Some(errors.clone()))
            }
            ApiError::NotFound { message, path }
            | ApiError::BadRequest { message, path }
            | ApiError::Internal { message, path } => (message.clone(), path, None),
        };

        let status = self.status_code();
        Some(ErrorMessage {
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or_default().to_string(),
            message,
            path: path.clone(),
            errors,
        })
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if let ApiError::Unauthorized = self {
            response.insert_header((WWW_AUTHENTICATE, "Bearer"));
        }
        match self.to_message() {
            Some(message) => response.json(message),
            None => response.finish(),
        }
    }
}
