//! Author profiles.

use actix_web::{HttpRequest, HttpResponse, web};
use askama_actix::TemplateToResponse;
use chrono::Utc;

use blogicum_core::domain::User;
use blogicum_core::error::RepoError;
use blogicum_core::{DomainError, FeedQuery, FeedScope};
use blogicum_shared::{FormErrors, ProfileForm};

use super::auth::session_cookie;
use super::{PageQuery, profile_url, redirect};
use crate::middleware::ClientCtx;
use crate::middleware::auth::Identity;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;
use crate::views::{PostView, ProfileEditPage, ProfilePage, ProfileView};

const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// GET /profile/{username}/
///
/// The owner sees every post of theirs, drafts and scheduled ones included;
/// everybody else gets the public feed of that author.
pub async fn profile(
    client: ClientCtx,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("user", &username))?;

    let now = Utc::now();
    let viewer = client.viewer();
    let feed = state
        .posts
        .feed(
            &FeedQuery::new(viewer, FeedScope::Author(user.id), now),
            query.request(),
            state.settings.posts_per_page,
        )
        .await?;

    Ok(ProfilePage {
        client,
        is_own: viewer.owns(user.id),
        profile: ProfileView::from(&user),
        page: feed.map(|card| PostView::new(card, viewer, now)),
    }
    .to_response())
}

async fn current_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    // A valid token for a deleted account.
    state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("user", identity.user_id).into())
}

fn edit_page(client: ClientCtx, form: ProfileForm, errors: FormErrors) -> HttpResponse {
    ProfileEditPage {
        client,
        username: form.username,
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        errors,
    }
    .to_response()
}

/// GET /profile/edit_profile/
pub async fn edit_form(
    identity: Identity,
    client: ClientCtx,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let user = current_user(&state, &identity).await?;
    let form = ProfileForm {
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        csrf_token: String::new(),
    };
    Ok(edit_page(client, form, FormErrors::new()))
}

/// POST /profile/edit_profile/
pub async fn edit(
    identity: Identity,
    client: ClientCtx,
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<ProfileForm>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &form.csrf_token)?;
    let form = form.into_inner();
    let mut user = current_user(&state, &identity).await?;

    let mut errors = match form.check() {
        Ok(()) => FormErrors::new(),
        Err(errors) => errors,
    };
    if form.username != user.username {
        if let Some(other) = state.users.find_by_username(&form.username).await? {
            if other.id != user.id {
                errors.add("username", USERNAME_TAKEN);
            }
        }
    }
    if !errors.is_empty() {
        return Ok(edit_page(client, form, errors));
    }

    user.username = form.username.clone();
    user.first_name = form.first_name.clone();
    user.last_name = form.last_name.clone();
    user.email = form.email.clone();
    user.updated_at = Utc::now();

    let user = match state.users.update(user).await {
        Ok(user) => user,
        Err(RepoError::Constraint(_)) => {
            let mut errors = FormErrors::new();
            errors.add("username", USERNAME_TAKEN);
            return Ok(edit_page(client, form, errors));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = %user.id, "Profile updated");

    // The token carries the username, so it is reissued.
    let cookie = session_cookie(&state, &user)?;
    let mut res = redirect(&profile_url(&user.username));
    res.add_cookie(&cookie)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(res)
}
