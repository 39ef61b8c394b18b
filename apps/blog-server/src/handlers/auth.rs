//! Authentication handlers: sign-up, login and logout.
//!
//! A successful login stores a JWT in the HttpOnly `access_token` cookie;
//! logging out drops it.

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{HttpRequest, HttpResponse, web};
use askama_actix::TemplateToResponse;
use serde::Deserialize;

use blogicum_core::domain::User;
use blogicum_core::error::RepoError;
use blogicum_shared::errors::NON_FIELD;
use blogicum_shared::{FormErrors, LoginForm, RegistrationForm};

use super::{CsrfForm, profile_url, redirect};
use crate::middleware::ClientCtx;
use crate::middleware::auth::AUTH_COOKIE;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;
use crate::views::{LoggedOutPage, LoginPage, RegistrationPage};

const BAD_CREDENTIALS: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.map(str::trim)
        .filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

/// Cookie holding a freshly issued token for `user`.
pub(crate) fn session_cookie(state: &AppState, user: &User) -> AppResult<Cookie<'static>> {
    let token = state
        .tokens
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(state.tokens.expiration_seconds()))
        .finish())
}

/// GET /auth/login/
pub async fn login_form(client: ClientCtx, query: web::Query<NextQuery>) -> HttpResponse {
    LoginPage {
        client,
        username: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
        errors: FormErrors::new(),
    }
    .to_response()
}

/// POST /auth/login/
pub async fn login(
    client: ClientCtx,
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &form.csrf_token)?;
    let form = form.into_inner();
    let next = safe_next(form.next.as_deref()).unwrap_or_default().to_string();

    let rejected = |errors: FormErrors| {
        LoginPage {
            client: client.clone(),
            username: form.username.clone(),
            next: next.clone(),
            errors,
        }
        .to_response()
    };

    if let Err(errors) = form.check() {
        return Ok(rejected(errors));
    }

    let user = match state.users.find_by_username(form.username.trim()).await? {
        Some(user) => user,
        None => {
            tracing::info!(username = %form.username, "Login for unknown user");
            let mut errors = FormErrors::new();
            errors.add(NON_FIELD, BAD_CREDENTIALS);
            return Ok(rejected(errors));
        }
    };

    let valid = state
        .passwords
        .verify(&form.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        tracing::info!(username = %user.username, "Login with wrong password");
        let mut errors = FormErrors::new();
        errors.add(NON_FIELD, BAD_CREDENTIALS);
        return Ok(rejected(errors));
    }

    let cookie = session_cookie(&state, &user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    let target = if next.is_empty() { "/" } else { next.as_str() };
    let mut res = redirect(target);
    res.add_cookie(&cookie)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(res)
}

/// POST /auth/logout/
pub async fn logout(
    client: ClientCtx,
    req: HttpRequest,
    form: web::Form<CsrfForm>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &form.csrf_token)?;

    if client.is_user() {
        tracing::info!(username = %client.get_name(), "User logged out");
    }

    let mut res = LoggedOutPage {
        client: client.as_guest(),
    }
    .to_response();

    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    res.add_cookie(&cookie)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(res)
}

/// GET /auth/registration/
pub async fn registration_form(client: ClientCtx) -> HttpResponse {
    RegistrationPage {
        client,
        username: String::new(),
        email: String::new(),
        errors: FormErrors::new(),
    }
    .to_response()
}

/// POST /auth/registration/
pub async fn register(
    client: ClientCtx,
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<RegistrationForm>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &form.csrf_token)?;
    let form = form.into_inner();

    let rejected = |errors: FormErrors| {
        RegistrationPage {
            client: client.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            errors,
        }
        .to_response()
    };

    let mut errors = match form.check() {
        Ok(()) => FormErrors::new(),
        Err(errors) => errors,
    };
    if state.users.find_by_username(&form.username).await?.is_some() {
        errors.add("username", USERNAME_TAKEN);
    }
    if !errors.is_empty() {
        return Ok(rejected(errors));
    }

    let password_hash = state
        .passwords
        .hash(&form.password1)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = match state
        .users
        .insert(User::new(form.username.clone(), form.email.clone(), password_hash))
        .await
    {
        Ok(user) => user,
        // Lost a race with another sign-up for the same name.
        Err(RepoError::Constraint(_)) => {
            let mut errors = FormErrors::new();
            errors.add("username", USERNAME_TAKEN);
            return Ok(rejected(errors));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    let cookie = session_cookie(&state, &user)?;
    let mut res = redirect(&profile_url(&user.username));
    res.add_cookie(&cookie)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(res)
}
