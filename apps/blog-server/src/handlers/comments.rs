//! Comments under posts.

use actix_web::{HttpRequest, HttpResponse, web};
use askama_actix::TemplateToResponse;
use chrono::Utc;
use uuid::Uuid;

use blogicum_core::DomainError;
use blogicum_core::domain::{AuthorRef, Comment, CommentView};
use blogicum_shared::{CommentForm, FormErrors};

use super::blog::{detail_page, visible_card};
use super::{CsrfForm, ensure_owner, post_url, redirect};
use crate::middleware::ClientCtx;
use crate::middleware::auth::Identity;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views::{CommentDeletePage, CommentEditPage, CommentItem};

/// A comment addressed through the URL of its post. A comment id paired
/// with some other post id does not exist.
async fn load_comment(state: &AppState, post_id: Uuid, comment_id: Uuid) -> AppResult<Comment> {
    state
        .comments
        .find_by_id(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| DomainError::not_found("comment", comment_id).into())
}

/// Only ever rendered for the comment's author.
fn own_item(comment: Comment, identity: &Identity) -> CommentItem {
    let view = CommentView {
        comment,
        author: AuthorRef {
            id: identity.user_id,
            username: identity.username.clone(),
        },
    };
    CommentItem::new(view, identity.viewer())
}

/// POST /posts/{post_id}/add_comment/
pub async fn add(
    identity: Identity,
    client: ClientCtx,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &form.csrf_token)?;

    let post_id = path.into_inner();
    let now = Utc::now();
    let card = visible_card(&state, post_id, identity.viewer(), now).await?;

    // The form lives on the post page, so that is where its errors go.
    let form = form.into_inner();
    if let Err(errors) = form.check() {
        let page = detail_page(&state, client, card, now, form.text, errors).await?;
        return Ok(page.to_response());
    }

    let comment = state
        .comments
        .insert(Comment::new(post_id, identity.user_id, form.text))
        .await?;
    tracing::info!(comment_id = %comment.id, %post_id, "Comment added");

    Ok(redirect(&post_url(post_id)))
}

/// GET /posts/{post_id}/{comment_id}/edit_comment/
pub async fn edit_form(
    identity: Identity,
    client: ClientCtx,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&state, post_id, comment_id).await?;
    if let Some(res) = ensure_owner(&state.settings, identity.viewer(), comment.author_id, post_id)?
    {
        return Ok(res);
    }

    let text = comment.text.clone();
    Ok(CommentEditPage {
        client,
        comment: own_item(comment, &identity),
        text,
        errors: FormErrors::new(),
    }
    .to_response())
}

/// POST /posts/{post_id}/{comment_id}/edit_comment/
pub async fn edit(
    identity: Identity,
    client: ClientCtx,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &form.csrf_token)?;

    let (post_id, comment_id) = path.into_inner();
    let mut comment = load_comment(&state, post_id, comment_id).await?;
    if let Some(res) = ensure_owner(&state.settings, identity.viewer(), comment.author_id, post_id)?
    {
        return Ok(res);
    }

    let form = form.into_inner();
    if let Err(errors) = form.check() {
        return Ok(CommentEditPage {
            client,
            comment: own_item(comment, &identity),
            text: form.text,
            errors,
        }
        .to_response());
    }

    comment.text = form.text;
    state.comments.update(comment).await?;
    tracing::info!(%comment_id, %post_id, "Comment updated");

    Ok(redirect(&post_url(post_id)))
}

/// GET /posts/{post_id}/{comment_id}/delete_comment/
pub async fn delete_confirm(
    identity: Identity,
    client: ClientCtx,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&state, post_id, comment_id).await?;
    if let Some(res) = ensure_owner(&state.settings, identity.viewer(), comment.author_id, post_id)?
    {
        return Ok(res);
    }

    Ok(CommentDeletePage {
        client,
        comment: own_item(comment, &identity),
    }
    .to_response())
}

/// POST /posts/{post_id}/{comment_id}/delete_comment/
pub async fn delete(
    identity: Identity,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    form: web::Form<CsrfForm>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &form.csrf_token)?;

    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&state, post_id, comment_id).await?;
    if let Some(res) = ensure_owner(&state.settings, identity.viewer(), comment.author_id, post_id)?
    {
        return Ok(res);
    }

    state.comments.delete(comment.id).await?;
    tracing::info!(%comment_id, %post_id, "Comment deleted");

    Ok(redirect(&post_url(post_id)))
}
