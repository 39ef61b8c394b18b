//! HTTP handlers and route configuration.

mod auth;
mod blog;
mod comments;
mod health;
mod posts;
mod profile;

use actix_multipart::form::MultipartFormConfig;
use actix_web::{HttpResponse, http::header, web};
use askama_actix::Template;
use serde::Deserialize;
use uuid::Uuid;

use blogicum_core::{OwnershipDecision, PageRequest, Viewer};

use crate::config::BlogSettings;
use crate::middleware::ClientCtx;
use crate::middleware::error::{AppError, AppResult};
use crate::views::NotFoundPage;

/// Upper bound for a whole post form, image included.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        // A path segment that doesn't parse (e.g. a non-UUID post id) is a missing page.
        web::PathConfig::default()
            .error_handler(|err, _| AppError::NotFound(err.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        MultipartFormConfig::default()
            .total_limit(MAX_UPLOAD_BYTES)
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(health::health_check))
    .route("/", web::get().to(blog::index))
    .route("/category/{slug}/", web::get().to(blog::category_posts))
    .service(
        web::scope("/posts")
            .service(
                web::resource("/create/")
                    .route(web::get().to(posts::create_form))
                    .route(web::post().to(posts::create)),
            )
            .route("/{post_id}/", web::get().to(blog::post_detail))
            .service(
                web::resource("/{post_id}/edit/")
                    .route(web::get().to(posts::edit_form))
                    .route(web::post().to(posts::edit)),
            )
            .service(
                web::resource("/{post_id}/delete/")
                    .route(web::get().to(posts::delete_confirm))
                    .route(web::post().to(posts::delete)),
            )
            .route("/{post_id}/add_comment/", web::post().to(comments::add))
            .service(
                web::resource("/{post_id}/{comment_id}/edit_comment/")
                    .route(web::get().to(comments::edit_form))
                    .route(web::post().to(comments::edit)),
            )
            .service(
                web::resource("/{post_id}/{comment_id}/delete_comment/")
                    .route(web::get().to(comments::delete_confirm))
                    .route(web::post().to(comments::delete)),
            ),
    )
    .service(
        web::scope("/profile")
            // Registered before the catch-all username route.
            .service(
                web::resource("/edit_profile/")
                    .route(web::get().to(profile::edit_form))
                    .route(web::post().to(profile::edit)),
            )
            .route("/{username}/", web::get().to(profile::profile)),
    )
    .service(
        web::scope("/auth")
            .service(
                web::resource("/login/")
                    .route(web::get().to(auth::login_form))
                    .route(web::post().to(auth::login)),
            )
            // Logging out changes state, so it is a form post; any other
            // method is a missing page.
            .service(
                web::resource("/logout/")
                    .route(web::post().to(auth::logout))
                    .default_service(web::to(not_found)),
            )
            .service(
                web::resource("/registration/")
                    .route(web::get().to(auth::registration_form))
                    .route(web::post().to(auth::register)),
            ),
    );
}

/// Fallback for every unmatched route.
pub async fn not_found(client: ClientCtx) -> AppResult<HttpResponse> {
    let body = NotFoundPage { client }.render()?;
    Ok(HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// `?page=` of the paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref())
    }
}

/// Body of the confirm-delete forms: nothing but the CSRF token.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CsrfForm {
    pub csrf_token: String,
}

/// 302 to `location`.
pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub(crate) fn post_url(post_id: Uuid) -> String {
    format!("/posts/{}/", post_id)
}

/// Usernames may hold non-ASCII letters, `@` and `+`, so the segment is
/// percent-encoded.
pub(crate) fn profile_url(username: &str) -> String {
    let segment: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}/", segment)
}

/// Apply the configured ownership policy to a post or comment owned by
/// `owner_id`. `Ok(None)` means the viewer is the owner and may proceed;
/// `Ok(Some(_))` is the redirect to send instead.
pub(crate) fn ensure_owner(
    settings: &BlogSettings,
    viewer: Viewer,
    owner_id: Uuid,
    post_id: Uuid,
) -> AppResult<Option<HttpResponse>> {
    match settings.ownership_policy.decide(viewer, owner_id) {
        OwnershipDecision::Allow => Ok(None),
        OwnershipDecision::RedirectToDetail => Ok(Some(redirect(&post_url(post_id)))),
        OwnershipDecision::Forbid => Err(AppError::Forbidden),
        OwnershipDecision::NotFound => Err(AppError::NotFound(format!(
            "post {} is not editable by this user",
            post_id
        ))),
    }
}
