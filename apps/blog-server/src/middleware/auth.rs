//! Authentication extractors.
//!
//! The login handler stores a JWT in the HttpOnly `access_token` cookie;
//! API-style clients may send it as a `Bearer` token instead.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use std::future::{Ready, ready};
use uuid::Uuid;

use blogicum_core::Viewer;
use blogicum_core::ports::{AuthError, TokenClaims};

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Name of the cookie carrying the access token.
pub const AUTH_COOKIE: &str = "access_token";

/// Authenticated user identity extractor.
///
/// Anonymous requests are redirected to the login page with `next` set to
/// the requested path:
/// ```ignore
/// async fn create_post(identity: Identity) -> AppResult<HttpResponse> {
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl Identity {
    pub fn viewer(&self) -> Viewer {
        Viewer::user(self.user_id)
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Raw token from the cookie, falling back to the Authorization header.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(AUTH_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Validate whatever token the request carries.
pub fn authenticate(req: &HttpRequest) -> Result<Identity, AuthError> {
    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        tracing::error!("AppState not found in app data");
        AuthError::InvalidToken("Server configuration error".to_string())
    })?;

    let token = bearer_token(req).ok_or(AuthError::MissingAuth)?;

    state
        .tokens
        .validate_token(&token)
        .map(Identity::from)
        .inspect_err(|e| tracing::warn!("Rejected access token: {}", e))
}

/// Path and query of the request, used as the post-login destination.
fn requested_path(req: &HttpRequest) -> String {
    match req.uri().path_and_query() {
        Some(pq) => pq.as_str().to_string(),
        None => req.path().to_string(),
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(|_| AppError::LoginRequired(requested_path(req))))
    }
}
