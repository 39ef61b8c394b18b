mod common;

use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::test;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use blog_server::config::BlogSettings;
use blogicum_core::domain::{Post, PostCard};
use blogicum_core::error::RepoError;
use blogicum_core::ports::{BaseRepository, PostRepository};
use blogicum_core::{FeedQuery, FeedScope, OwnershipPolicy, Page, PageRequest, Viewer};
use common::{CSRF, TestApp, body_text, csrf_cookie, location_of, multipart};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really an image";

#[actix_rt::test]
async fn anonymous_create_redirects_to_login() {
    let app = TestApp::new().await;
    let srv = init_app!(app.state);

    let res = test::call_service(
        &srv,
        test::TestRequest::get().uri("/posts/create/").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/auth/login/?next=%2Fposts%2Fcreate%2F");
}

#[actix_rt::test]
async fn create_form_lists_published_choices() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    app.category("travel", true).await;
    app.category("secret", false).await;
    app.location("Moscow", true).await;
    app.location("Atlantis", false).await;

    let srv = init_app!(app.state);
    let req = test::TestRequest::get()
        .uri("/posts/create/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_text(res).await;
    assert!(body.contains(&format!("value=\"{}\"", CSRF)));
    assert!(body.contains("multipart/form-data"));
    assert!(body.contains("Category travel"));
    assert!(!body.contains("Category secret"));
    assert!(body.contains("Moscow"));
    assert!(!body.contains("Atlantis"));
}

#[actix_rt::test]
async fn create_post_with_image() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let cat = app.category("travel", true).await;
    let loc = app.location("Moscow", true).await;

    let srv = init_app!(app.state);
    let cat_id = cat.id.to_string();
    let loc_id = loc.id.to_string();
    let (content_type, body) = multipart(
        &[
            ("csrf_token", CSRF),
            ("title", "Winter in Moscow"),
            ("text", "Snow everywhere."),
            ("pub_date", "2024-01-15T10:30"),
            ("category", cat_id.as_str()),
            ("location", loc_id.as_str()),
            ("is_published", "on"),
        ],
        Some(("photo.png", PNG_BYTES)),
    );
    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/profile/leo/");

    let feed = app
        .state
        .posts
        .feed(
            &FeedQuery::new(Viewer::user(author.id), FeedScope::Author(author.id), Utc::now()),
            PageRequest::new(1),
            10,
        )
        .await
        .unwrap();
    assert_eq!(feed.total, 1);

    let post = &feed.items[0].post;
    assert_eq!(post.title, "Winter in Moscow");
    assert_eq!(post.author_id, author.id);
    assert_eq!(post.category_id, Some(cat.id));
    assert_eq!(post.location_id, Some(loc.id));
    assert!(post.is_published);

    let image = post.image.as_deref().expect("stored image");
    assert!(image.starts_with("images/"));
    assert!(image.ends_with(".png"));
    assert!(app.media_dir.path().join(image).exists());
}

#[actix_rt::test]
async fn invalid_post_form_is_redisplayed() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    app.category("travel", true).await;

    let srv = init_app!(app.state);
    let (content_type, body) = multipart(
        &[
            ("csrf_token", CSRF),
            ("title", ""),
            ("text", "Kept text"),
            ("pub_date", "yesterday"),
            ("category", ""),
        ],
        None,
    );
    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_text(res).await;
    assert!(body.contains("This field is required."));
    assert!(body.contains("Kept text"));

    let feed = app
        .state
        .posts
        .feed(
            &FeedQuery::new(Viewer::user(author.id), FeedScope::Author(author.id), Utc::now()),
            PageRequest::new(1),
            10,
        )
        .await
        .unwrap();
    assert_eq!(feed.total, 0);
}

#[actix_rt::test]
async fn unknown_category_and_bad_image_are_field_errors() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;

    let srv = init_app!(app.state);
    let missing = common::random_id().to_string();
    let (content_type, body) = multipart(
        &[
            ("csrf_token", CSRF),
            ("title", "Title"),
            ("text", "Text"),
            ("pub_date", "2024-01-15T10:30"),
            ("category", missing.as_str()),
        ],
        Some(("notes.txt", &b"plain text"[..])),
    );
    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_text(res).await;
    assert!(body.contains("Select a valid choice."));
    assert!(body.contains("Upload a valid image."));
}

#[actix_rt::test]
async fn create_without_csrf_token_is_forbidden() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let cat = app.category("travel", true).await;

    let srv = init_app!(app.state);
    let cat_id = cat.id.to_string();
    let (content_type, body) = multipart(
        &[
            ("title", "Title"),
            ("text", "Text"),
            ("pub_date", "2024-01-15T10:30"),
            ("category", cat_id.as_str()),
        ],
        None,
    );
    let req = test::TestRequest::post()
        .uri("/posts/create/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(body_text(res).await.contains("CSRF verification failed"));
}

#[actix_rt::test]
async fn non_owner_edit_redirects_to_detail() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let stranger = app.user("anna").await;
    let cat = app.category("travel", true).await;
    let post = app.public_post(&author, &cat, "original-title").await;

    let srv = init_app!(app.state);
    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(app.auth_cookie(&stranger))
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), format!("/posts/{}/", post.id));

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/delete/", post.id))
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&stranger))
        .set_form([("csrf_token", CSRF)])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), format!("/posts/{}/", post.id));
    assert!(app.state.posts.find_by_id(post.id).await.unwrap().is_some());
}

#[actix_rt::test]
async fn strict_policies_reject_non_owners() {
    for (policy, status) in [
        (OwnershipPolicy::Forbid, StatusCode::FORBIDDEN),
        (OwnershipPolicy::NotFound, StatusCode::NOT_FOUND),
    ] {
        let app = TestApp::with_settings(BlogSettings {
            ownership_policy: policy,
            ..BlogSettings::default()
        })
        .await;
        let author = app.user("leo").await;
        let stranger = app.user("anna").await;
        let cat = app.category("travel", true).await;
        let post = app.public_post(&author, &cat, "title").await;

        let srv = init_app!(app.state);
        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(app.auth_cookie(&stranger))
            .to_request();
        assert_eq!(test::call_service(&srv, req).await.status(), status);
    }
}

#[actix_rt::test]
async fn owner_edits_post_and_keeps_image() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let cat = app.category("travel", true).await;
    let mut post = app.public_post(&author, &cat, "old-title").await;
    post.image = Some("images/kept.png".to_string());
    let post = app.state.posts.update(post).await.unwrap();

    let srv = init_app!(app.state);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("old-title"));

    let cat_id = cat.id.to_string();
    let (content_type, body) = multipart(
        &[
            ("csrf_token", CSRF),
            ("title", "new-title"),
            ("text", "Updated"),
            ("pub_date", "2024-02-01T08:00"),
            ("category", cat_id.as_str()),
        ],
        None,
    );
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), format!("/posts/{}/", post.id));

    let updated = app.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "new-title");
    // Unchecked checkbox means unpublished.
    assert!(!updated.is_published);
    assert_eq!(updated.image.as_deref(), Some("images/kept.png"));
}

#[actix_rt::test]
async fn owner_deletes_post_with_its_comments() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let reader = app.user("anna").await;
    let cat = app.category("travel", true).await;
    let post = app.public_post(&author, &cat, "doomed-title").await;
    let comment = app.comment(&reader, &post, "soon gone").await;

    let srv = init_app!(app.state);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/delete/", post.id))
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("doomed-title"));

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/delete/", post.id))
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .set_form([("csrf_token", CSRF)])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/");

    assert!(app.state.posts.find_by_id(post.id).await.unwrap().is_none());
    assert!(app.state.comments.find_by_id(comment.id).await.unwrap().is_none());
}

/// Post repository whose writes of existing rows always fail.
struct BrokenUpdates(Arc<dyn PostRepository>);

#[async_trait]
impl BaseRepository<Post, Uuid> for BrokenUpdates {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.0.find_by_id(id).await
    }

    async fn insert(&self, entity: Post) -> Result<Post, RepoError> {
        self.0.insert(entity).await
    }

    async fn update(&self, _entity: Post) -> Result<Post, RepoError> {
        Err(RepoError::Query("connection reset".into()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.0.delete(id).await
    }
}

#[async_trait]
impl PostRepository for BrokenUpdates {
    async fn feed(
        &self,
        query: &FeedQuery,
        page: PageRequest,
        per_page: u64,
    ) -> Result<Page<PostCard>, RepoError> {
        self.0.feed(query, page, per_page).await
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<PostCard>, RepoError> {
        self.0.find_card(id).await
    }
}

#[actix_rt::test]
async fn failed_edit_removes_the_new_upload() {
    let mut app = TestApp::new().await;
    let author = app.user("leo").await;
    let cat = app.category("travel", true).await;
    let post = app.public_post(&author, &cat, "old-title").await;
    app.state.posts = Arc::new(BrokenUpdates(app.state.posts.clone()));

    let srv = init_app!(app.state);
    let cat_id = cat.id.to_string();
    let (content_type, body) = multipart(
        &[
            ("csrf_token", CSRF),
            ("title", "new-title"),
            ("text", "Updated"),
            ("pub_date", "2024-02-01T08:00"),
            ("category", cat_id.as_str()),
        ],
        Some(("photo.png", PNG_BYTES)),
    );
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&author))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let images = app.media_dir.path().join("images");
    let left = std::fs::read_dir(&images)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(left, 0);

    let unchanged = app.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.title, "old-title");
    assert!(unchanged.image.is_none());
}
