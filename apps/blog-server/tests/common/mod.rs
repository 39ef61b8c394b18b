//! Shared setup for the HTTP-level tests: an in-memory store, a throwaway
//! media directory, and helpers for cookies, forms and fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::test;
use chrono::{DateTime, TimeDelta, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use blog_server::config::BlogSettings;
use blog_server::middleware::auth::AUTH_COOKIE;
use blog_server::middleware::csrf::CSRF_COOKIE;
use blog_server::state::AppState;
use blogicum_core::domain::{Category, Comment, Location, Post, User};
use blogicum_infra::{Argon2PasswordService, InMemoryStore, JwtConfig, JwtTokenService, LocalMediaStore};

/// Value used for both the CSRF cookie and the form field.
pub const CSRF: &str = "TestCsrfToken0123456789abcdefghi";

pub const PASSWORD: &str = "correct-horse-battery";

/// Build the same `App` the binary serves, minus logging and static files.
#[macro_export]
macro_rules! init_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(blog_server::middleware::csrf::CsrfMiddleware)
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(blog_server::handlers::configure_routes)
                .default_service(actix_web::web::to(blog_server::handlers::not_found)),
        )
        .await
    };
}

pub struct TestApp {
    pub state: AppState,
    pub media_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(BlogSettings::default()).await
    }

    pub async fn with_settings(settings: BlogSettings) -> Self {
        let media_dir = tempfile::tempdir().expect("temp dir");
        let media = LocalMediaStore::new(media_dir.path())
            .await
            .expect("media store");
        let tokens = JwtTokenService::new(JwtConfig {
            secret: "integration-test-secret".to_string(),
            ..JwtConfig::default()
        });

        let state = AppState::in_memory(
            &InMemoryStore::new(),
            Arc::new(media),
            Arc::new(tokens),
            Arc::new(Argon2PasswordService::new()),
            settings,
        );

        Self { state, media_dir }
    }

    /// A user that can't log in with a password; tests authenticate with
    /// [`TestApp::auth_cookie`] instead.
    pub async fn user(&self, username: &str) -> User {
        self.state
            .users
            .insert(User::new(
                username.to_string(),
                format!("{}@example.com", username),
                "not-a-real-hash".to_string(),
            ))
            .await
            .expect("insert user")
    }

    /// A user with [`PASSWORD`] as the password.
    pub async fn user_with_password(&self, username: &str) -> User {
        let hash = self.state.passwords.hash(PASSWORD).expect("hash");
        self.state
            .users
            .insert(User::new(username.to_string(), String::new(), hash))
            .await
            .expect("insert user")
    }

    pub async fn category(&self, slug: &str, published: bool) -> Category {
        let mut category = Category::new(format!("Category {}", slug), String::new(), slug.to_string());
        category.is_published = published;
        self.state
            .categories
            .insert(category)
            .await
            .expect("insert category")
    }

    pub async fn location(&self, name: &str, published: bool) -> Location {
        let mut location = Location::new(name.to_string());
        location.is_published = published;
        self.state
            .locations
            .insert(location)
            .await
            .expect("insert location")
    }

    pub async fn post(
        &self,
        author: &User,
        category: &Category,
        title: &str,
        pub_date: DateTime<Utc>,
        is_published: bool,
    ) -> Post {
        let mut post = Post::new(author.id, title.to_string(), "Some text".to_string(), pub_date);
        post.category_id = Some(category.id);
        post.is_published = is_published;
        self.state.posts.insert(post).await.expect("insert post")
    }

    /// Published, dated an hour ago, in `category`.
    pub async fn public_post(&self, author: &User, category: &Category, title: &str) -> Post {
        self.post(author, category, title, Utc::now() - TimeDelta::hours(1), true)
            .await
    }

    pub async fn comment(&self, author: &User, post: &Post, text: &str) -> Comment {
        self.state
            .comments
            .insert(Comment::new(post.id, author.id, text.to_string()))
            .await
            .expect("insert comment")
    }

    pub fn auth_cookie(&self, user: &User) -> Cookie<'static> {
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username)
            .expect("token");
        Cookie::new(AUTH_COOKIE, token)
    }
}

pub fn csrf_cookie() -> Cookie<'static> {
    Cookie::new(CSRF_COOKIE, CSRF)
}

pub fn location_of<B>(res: &ServiceResponse<B>) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn response_cookie<B>(res: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.into_owned())
}

pub async fn body_text(res: ServiceResponse) -> String {
    let bytes = test::read_body(res).await;
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Number of post cards rendered on a feed page.
pub fn card_count(body: &str) -> usize {
    body.matches("class=\"post-card\"").count()
}

pub const BOUNDARY: &str = "blogicum-test-boundary";

/// Hand-built `multipart/form-data` body; returns the content type and bytes.
pub fn multipart(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub fn random_id() -> Uuid {
    Uuid::new_v4()
}
