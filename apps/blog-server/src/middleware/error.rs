//! Error handling - every failure ends up as an HTML error page or a redirect.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use askama_actix::Template;

use blogicum_core::error::{DomainError, RepoError};
use blogicum_core::ports::MediaError;

use crate::views::{CsrfFailurePage, ForbiddenPage, NotFoundPage, ServerErrorPage};

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Forbidden")]
    Forbidden,
    /// Missing or mismatched CSRF token.
    #[error("CSRF verification failed")]
    Csrf,
    /// Anonymous request to a page that needs a user; carries the path to
    /// return to after logging in.
    #[error("Login required for {0}")]
    LoginRequired(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Login page URL that comes back to `next` afterwards.
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/auth/login/?next={}", encoded)
}

fn html(status: StatusCode, page: &impl Template) -> HttpResponse {
    match page.render() {
        Ok(body) => HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(e) => {
            tracing::error!("Failed to render error page: {}", e);
            HttpResponse::build(status).body(status.to_string())
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden | AppError::Csrf => StatusCode::FORBIDDEN,
            AppError::LoginRequired(_) => StatusCode::FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound(detail) => {
                tracing::debug!("Not found: {}", detail);
                html(self.status_code(), &NotFoundPage::default())
            }
            AppError::Forbidden => html(self.status_code(), &ForbiddenPage::default()),
            AppError::Csrf => html(self.status_code(), &CsrfFailurePage::default()),
            AppError::LoginRequired(next) => HttpResponse::Found()
                .insert_header((header::LOCATION, login_url(next)))
                .finish(),
            AppError::BadRequest(detail) | AppError::Conflict(detail) => {
                HttpResponse::build(self.status_code())
                    .content_type("text/plain; charset=utf-8")
                    .body(detail.clone())
            }
            AppError::Internal(detail) => {
                // Log internal errors
                tracing::error!("Internal error: {}", detail);
                html(self.status_code(), &ServerErrorPage::default())
            }
        }
    }
}

// Conversion from domain errors
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, key } => {
                AppError::NotFound(format!("{} '{}'", entity_type, key))
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Constraint(msg) => AppError::Conflict(msg),
            RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            RepoError::Query(msg) => {
                tracing::error!("Database query error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedType(name) => {
                AppError::BadRequest(format!("Unsupported file: {}", name))
            }
            MediaError::Io(msg) => AppError::Internal(format!("Media storage: {}", msg)),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Internal(format!("Template rendering failed: {}", err))
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
