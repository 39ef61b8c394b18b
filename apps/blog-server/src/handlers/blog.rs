//! Reading pages: the front page, category feeds and a single post.

use actix_web::{HttpResponse, web};
use askama_actix::TemplateToResponse;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use blogicum_core::domain::PostCard;
use blogicum_core::{DomainError, FeedQuery, FeedScope, Viewer};
use blogicum_shared::FormErrors;

use super::PageQuery;
use crate::middleware::ClientCtx;
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views::{CategoryPage, CommentItem, IndexPage, PostDetailPage, PostView};

/// Load a post the viewer is allowed to see; anything else is a 404.
pub(crate) async fn visible_card(
    state: &AppState,
    post_id: Uuid,
    viewer: Viewer,
    now: DateTime<Utc>,
) -> AppResult<PostCard> {
    state
        .posts
        .find_card(post_id)
        .await?
        .filter(|card| card.is_visible_to(viewer, now))
        .ok_or_else(|| DomainError::not_found("post", post_id).into())
}

/// GET /
pub async fn index(
    client: ClientCtx,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let now = Utc::now();
    let viewer = client.viewer();
    let feed = state
        .posts
        .feed(
            &FeedQuery::new(viewer, FeedScope::All, now),
            query.request(),
            state.settings.posts_per_page,
        )
        .await?;

    Ok(IndexPage {
        client,
        page: feed.map(|card| PostView::new(card, viewer, now)),
    }
    .to_response())
}

/// GET /category/{slug}/
pub async fn category_posts(
    client: ClientCtx,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let category = state
        .categories
        .find_published_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("category", &slug))?;

    let now = Utc::now();
    let viewer = client.viewer();
    let feed = state
        .posts
        .feed(
            &FeedQuery::new(viewer, FeedScope::Category(category.id), now),
            query.request(),
            state.settings.posts_per_page,
        )
        .await?;

    Ok(CategoryPage {
        client,
        category,
        page: feed.map(|card| PostView::new(card, viewer, now)),
    }
    .to_response())
}

/// The post page around an already loaded card, with the comment form
/// filled from `comment_text`.
pub(crate) async fn detail_page(
    state: &AppState,
    client: ClientCtx,
    card: PostCard,
    now: DateTime<Utc>,
    comment_text: String,
    errors: FormErrors,
) -> AppResult<PostDetailPage> {
    let viewer = client.viewer();
    let comments = state
        .comments
        .list_for_post(card.post.id)
        .await?
        .into_iter()
        .map(|view| CommentItem::new(view, viewer))
        .collect();

    Ok(PostDetailPage {
        client,
        post: PostView::new(card, viewer, now),
        comments,
        comment_text,
        errors,
    })
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    client: ClientCtx,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let now = Utc::now();
    let card = visible_card(&state, path.into_inner(), client.viewer(), now).await?;
    let page = detail_page(&state, client, card, now, String::new(), FormErrors::new()).await?;
    Ok(page.to_response())
}
