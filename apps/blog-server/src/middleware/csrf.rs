/// CSRF (Cross-Site Request Forgery) protection
///
/// Double-submit cookie: the middleware makes sure every client holds a
/// random `csrftoken` cookie and exposes its value to templates, every
/// state-changing form echoes it back in a hidden `csrf_token` field, and
/// handlers compare the two before touching any data.
///
/// Usage in templates:
/// ```html,ignore
/// <form method="post">
///     <input type="hidden" name="csrf_token" value="{{ client.get_csrf_token() }}">
///     <!-- other form fields -->
/// </form>
/// ```
///
/// Usage in handlers:
/// ```rust,ignore
/// async fn handler(req: HttpRequest, form: web::Form<MyFormData>) -> AppResult<HttpResponse> {
///     validate_csrf_token(&req, &form.csrf_token)?;
///     // Process form...
/// }
/// ```
use actix_web::{
    Error, HttpMessage, HttpRequest,
    cookie::{Cookie, SameSite},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use rand::{Rng, distributions::Alphanumeric};
use std::future::{Future, Ready, ready};
use std::pin::Pin;

use crate::middleware::error::AppError;

pub const CSRF_TOKEN_LENGTH: usize = 32;
pub const CSRF_COOKIE: &str = "csrftoken";

/// Token for the current request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(pub String);

/// Generate a new CSRF token
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn is_well_formed(token: &str) -> bool {
    token.len() == CSRF_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Validate CSRF token from form data
///
/// Call this at the beginning of any handler that processes state-changing requests.
pub fn validate_csrf_token(req: &HttpRequest, provided_token: &str) -> Result<(), AppError> {
    let expected = req
        .cookie(CSRF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| is_well_formed(t))
        .ok_or_else(|| {
            tracing::warn!("CSRF cookie missing");
            AppError::Csrf
        })?;

    if provided_token != expected {
        tracing::warn!("CSRF token validation failed");
        return Err(AppError::Csrf);
    }

    Ok(())
}

/// Middleware issuing the `csrftoken` cookie.
pub struct CsrfMiddleware;

impl<S, B> Transform<S, ServiceRequest> for CsrfMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = CsrfService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CsrfService { service }))
    }
}

pub struct CsrfService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for CsrfService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let existing = req
            .cookie(CSRF_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| is_well_formed(t));

        let (token, issued) = match existing {
            Some(token) => (token, false),
            None => (generate_csrf_token(), true),
        };

        req.extensions_mut().insert(CsrfToken(token.clone()));

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;

            if issued {
                let cookie = Cookie::build(CSRF_COOKIE, token)
                    .path("/")
                    .same_site(SameSite::Lax)
                    .finish();
                if let Err(e) = res.response_mut().add_cookie(&cookie) {
                    tracing::error!("Failed to set CSRF cookie: {}", e);
                }
            }

            Ok(res)
        })
    }
}
