use chrono::{TimeDelta, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};
use uuid::Uuid;

use blogicum_core::domain::{Category, Post, User};
use blogicum_core::error::RepoError;
use blogicum_core::ports::{BaseRepository, CategoryRepository, UserRepository};
use blogicum_core::visibility::{FeedQuery, FeedScope, Viewer};

use crate::database::entity::{category, post, user};
use crate::database::postgres_repo::{
    PostgresCategoryRepository, PostgresPostRepository, PostgresUserRepository, feed_select,
};

fn post_model(id: Uuid, author_id: Uuid) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        author_id,
        title: "Test Post".to_owned(),
        text: "Content".to_owned(),
        pub_date: now.into(),
        image: None,
        category_id: None,
        location_id: None,
        is_published: true,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn user_model(username: &str) -> user::Model {
    let now = Utc::now();
    user::Model {
        id: Uuid::new_v4(),
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: "hash".to_owned(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = Uuid::new_v4();
    let author_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![post_model(post_id, author_id)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.unwrap();
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.id, post_id);
    assert_eq!(post.author_id, author_id);
}

#[tokio::test]
async fn test_find_user_by_username() {
    let model = user_model("leo");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model.clone()]])
        .append_query_results(vec![Vec::<user::Model>::new()])
        .into_connection();

    let repo = PostgresUserRepository::new(db);

    let found: User = repo.find_by_username("leo").await.unwrap().unwrap();
    assert_eq!(found.id, model.id);
    assert_eq!(found.email, "leo@example.com");
    assert!(repo.find_by_username("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_returns_stored_user() {
    let model = user_model("anna");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model.clone()]])
        .into_connection();

    let repo = PostgresUserRepository::new(db);

    let saved = repo.insert(User::from(model.clone())).await.unwrap();
    assert_eq!(saved.username, "anna");
    assert_eq!(saved.id, model.id);
}

#[tokio::test]
async fn test_delete_missing_row_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert!(matches!(
        BaseRepository::<Post, Uuid>::delete(&repo, Uuid::new_v4()).await,
        Err(RepoError::NotFound)
    ));
}

#[tokio::test]
async fn test_list_published_categories() {
    let now = Utc::now();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![category::Model {
            id: Uuid::new_v4(),
            title: "Travel".to_owned(),
            description: "Trips".to_owned(),
            slug: "travel".to_owned(),
            is_published: true,
            created_at: now.into(),
        }]])
        .into_connection();

    let repo = PostgresCategoryRepository::new(db);

    let categories: Vec<Category> = repo.list_published().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].slug, "travel");
}

#[test]
fn test_public_feed_joins_published_categories() {
    let now = Utc::now();
    let sql = feed_select(&FeedQuery::new(Viewer::anonymous(), FeedScope::All, now))
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(sql.contains(r#"INNER JOIN "categories""#), "{sql}");
    assert!(sql.contains(r#""posts"."pub_date" <="#), "{sql}");
    assert!(sql.contains(r#""categories"."is_published" = TRUE"#), "{sql}");
    assert!(sql.contains(r#"ORDER BY "posts"."pub_date" DESC"#), "{sql}");
}

#[test]
fn test_own_profile_feed_is_unfiltered() {
    let author = Uuid::new_v4();
    let now = Utc::now() + TimeDelta::days(1);
    let sql = feed_select(&FeedQuery::new(
        Viewer::user(author),
        FeedScope::Author(author),
        now,
    ))
    .build(DatabaseBackend::Postgres)
    .to_string();

    assert!(!sql.contains("JOIN"), "{sql}");
    assert!(sql.contains(&author.to_string()), "{sql}");
}
