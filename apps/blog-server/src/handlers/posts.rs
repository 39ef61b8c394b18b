//! Writing posts: create, edit and delete, each owner-only.
//!
//! The create/edit form is `multipart/form-data` because of the optional
//! image. A rejected form is rendered again with the submitted values and
//! per-field errors; nothing is stored until the whole form is valid.

use actix_multipart::form::{MultipartForm, tempfile::TempFile, text::Text};
use actix_web::{HttpRequest, HttpResponse, web};
use askama_actix::TemplateToResponse;
use chrono::Utc;
use uuid::Uuid;

use blogicum_core::DomainError;
use blogicum_core::domain::Post;
use blogicum_core::ports::image_extension;
use blogicum_shared::{FormErrors, PostFields, PostForm};

use super::{CsrfForm, ensure_owner, post_url, profile_url, redirect};
use crate::middleware::ClientCtx;
use crate::middleware::auth::Identity;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views::{Choice, PostDeletePage, PostFormPage, PostFormValues, PostView, media_url};

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE: &str = "Upload a valid image. Supported formats: jpg, jpeg, png, gif, webp.";

/// Raw multipart body of the post form.
#[derive(MultipartForm)]
pub struct PostUpload {
    csrf_token: Option<Text<String>>,
    title: Option<Text<String>>,
    text: Option<Text<String>>,
    pub_date: Option<Text<String>>,
    category: Option<Text<String>>,
    location: Option<Text<String>>,
    is_published: Option<Text<String>>,
    clear_image: Option<Text<String>>,
    image: Option<TempFile>,
}

fn text_value(field: &Option<Text<String>>) -> String {
    field.as_ref().map(|t| t.0.clone()).unwrap_or_default()
}

/// Checkbox semantics: present and not explicitly off.
fn checked(field: &Option<Text<String>>) -> bool {
    field
        .as_ref()
        .is_some_and(|t| !matches!(t.0.trim(), "" | "off" | "false" | "0"))
}

impl PostUpload {
    fn csrf_token(&self) -> String {
        text_value(&self.csrf_token)
    }

    fn form(&self) -> PostForm {
        PostForm {
            title: text_value(&self.title),
            text: text_value(&self.text),
            pub_date: text_value(&self.pub_date),
            category: text_value(&self.category),
            location: text_value(&self.location),
            is_published: checked(&self.is_published),
            clear_image: checked(&self.clear_image),
        }
    }

    /// The uploaded image, if the file input wasn't left empty.
    fn image(&self) -> Option<&TempFile> {
        self.image.as_ref().filter(|f| {
            f.size > 0 && f.file_name.as_deref().is_some_and(|n| !n.trim().is_empty())
        })
    }
}

fn upload_name(file: &TempFile) -> &str {
    file.file_name.as_deref().unwrap_or_default()
}

/// What the form shows after a rejected submission.
fn submitted_values(form: &PostForm, image_url: String) -> PostFormValues {
    PostFormValues {
        title: form.title.clone(),
        text: form.text.clone(),
        pub_date: form.pub_date.clone(),
        category: form.category.clone(),
        location: form.location.clone(),
        is_published: form.is_published,
        image_url,
    }
}

/// Full validation: field rules, existence of the chosen category and
/// location, and the image type.
async fn check_form(
    state: &AppState,
    form: &PostForm,
    image: Option<&TempFile>,
) -> AppResult<Result<PostFields, FormErrors>> {
    let parsed = form.parse();
    let mut errors = FormErrors::new();

    if let Ok(fields) = &parsed {
        if state.categories.find_by_id(fields.category_id).await?.is_none() {
            errors.add("category", INVALID_CHOICE);
        }
        if let Some(location_id) = fields.location_id {
            if state.locations.find_by_id(location_id).await?.is_none() {
                errors.add("location", INVALID_CHOICE);
            }
        }
    }
    if let Some(file) = image {
        if image_extension(upload_name(file)).is_none() {
            errors.add("image", INVALID_IMAGE);
        }
    }

    Ok(match parsed {
        Ok(fields) if errors.is_empty() => Ok(fields),
        Ok(_) => Err(errors),
        Err(mut field_errors) => {
            field_errors.merge(errors);
            Err(field_errors)
        }
    })
}

/// Published categories and locations, plus whatever the form currently
/// points at so an edit never silently drops a hidden choice.
async fn choices(state: &AppState, form: &PostFormValues) -> AppResult<(Vec<Choice>, Vec<Choice>)> {
    let mut categories = state.categories.list_published().await?;
    if let Ok(id) = Uuid::parse_str(&form.category) {
        if !categories.iter().any(|c| c.id == id) {
            if let Some(category) = state.categories.find_by_id(id).await? {
                categories.push(category);
            }
        }
    }

    let mut locations = state.locations.list_published().await?;
    if let Ok(id) = Uuid::parse_str(&form.location) {
        if !locations.iter().any(|l| l.id == id) {
            if let Some(location) = state.locations.find_by_id(id).await? {
                locations.push(location);
            }
        }
    }

    Ok((
        Choice::categories(&categories, &form.category),
        Choice::locations(&locations, &form.location),
    ))
}

async fn render_form(
    state: &AppState,
    client: ClientCtx,
    action: String,
    editing: bool,
    form: PostFormValues,
    errors: FormErrors,
) -> AppResult<HttpResponse> {
    let (categories, locations) = choices(state, &form).await?;
    Ok(PostFormPage {
        client,
        action,
        editing,
        form,
        categories,
        locations,
        errors,
    }
    .to_response())
}

fn apply_fields(post: &mut Post, fields: PostFields) {
    post.title = fields.title;
    post.text = fields.text;
    post.pub_date = fields.pub_date;
    post.category_id = Some(fields.category_id);
    post.location_id = fields.location_id;
    post.is_published = fields.is_published;
}

async fn load_post(state: &AppState, post_id: Uuid) -> AppResult<Post> {
    state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("post", post_id).into())
}

/// GET /posts/create/
pub async fn create_form(
    _identity: Identity,
    client: ClientCtx,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    render_form(
        &state,
        client,
        "/posts/create/".to_string(),
        false,
        PostFormValues::blank(Utc::now()),
        FormErrors::new(),
    )
    .await
}

/// POST /posts/create/
pub async fn create(
    identity: Identity,
    client: ClientCtx,
    req: HttpRequest,
    state: web::Data<AppState>,
    MultipartForm(upload): MultipartForm<PostUpload>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &upload.csrf_token())?;

    let form = upload.form();
    let image = upload.image();
    let fields = match check_form(&state, &form, image).await? {
        Ok(fields) => fields,
        Err(errors) => {
            let values = submitted_values(&form, String::new());
            return render_form(&state, client, "/posts/create/".into(), false, values, errors)
                .await;
        }
    };

    let mut post = Post::new(identity.user_id, String::new(), String::new(), fields.pub_date);
    apply_fields(&mut post, fields);
    if let Some(file) = image {
        post.image = Some(
            state
                .media
                .store_image(file.file.path(), upload_name(file))
                .await?,
        );
    }

    let stored_image = post.image.clone();
    match state.posts.insert(post).await {
        Ok(post) => {
            tracing::info!(post_id = %post.id, author = %identity.username, "Post created");
            Ok(redirect(&profile_url(&identity.username)))
        }
        Err(e) => {
            if let Some(path) = stored_image {
                discard_image(&state, &path).await;
            }
            Err(e.into())
        }
    }
}

/// Remove a stored upload, logging instead of failing the request.
async fn discard_image(state: &AppState, path: &str) {
    if let Err(e) = state.media.remove(path).await {
        tracing::warn!("Failed to remove image {}: {}", path, e);
    }
}

/// GET /posts/{post_id}/edit/
pub async fn edit_form(
    identity: Identity,
    client: ClientCtx,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;
    if let Some(res) = ensure_owner(&state.settings, identity.viewer(), post.author_id, post.id)? {
        return Ok(res);
    }

    render_form(
        &state,
        client,
        format!("/posts/{}/edit/", post.id),
        true,
        PostFormValues::from_post(&post),
        FormErrors::new(),
    )
    .await
}

/// POST /posts/{post_id}/edit/
pub async fn edit(
    identity: Identity,
    client: ClientCtx,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    MultipartForm(upload): MultipartForm<PostUpload>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &upload.csrf_token())?;

    let mut post = load_post(&state, path.into_inner()).await?;
    if let Some(res) = ensure_owner(&state.settings, identity.viewer(), post.author_id, post.id)? {
        return Ok(res);
    }

    let form = upload.form();
    let image = upload.image();
    let fields = match check_form(&state, &form, image).await? {
        Ok(fields) => fields,
        Err(errors) => {
            let current_image = post.image.as_deref().map(media_url).unwrap_or_default();
            let values = submitted_values(&form, current_image);
            let action = format!("/posts/{}/edit/", post.id);
            return render_form(&state, client, action, true, values, errors).await;
        }
    };

    apply_fields(&mut post, fields);
    let previous_image = post.image.clone();
    let mut uploaded = None;
    if let Some(file) = image {
        let path = state
            .media
            .store_image(file.file.path(), upload_name(file))
            .await?;
        uploaded = Some(path.clone());
        post.image = Some(path);
    } else if form.clear_image {
        post.image = None;
    }
    post.updated_at = Utc::now();

    let post = match state.posts.update(post).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(path) = uploaded {
                discard_image(&state, &path).await;
            }
            return Err(e.into());
        }
    };
    if let Some(old) = previous_image.filter(|old| post.image.as_ref() != Some(old)) {
        discard_image(&state, &old).await;
    }

    tracing::info!(post_id = %post.id, "Post updated");
    Ok(redirect(&post_url(post.id)))
}

/// GET /posts/{post_id}/delete/
pub async fn delete_confirm(
    identity: Identity,
    client: ClientCtx,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let card = state
        .posts
        .find_card(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("post", post_id))?;

    let viewer = identity.viewer();
    if let Some(res) = ensure_owner(&state.settings, viewer, card.post.author_id, post_id)? {
        return Ok(res);
    }

    Ok(PostDeletePage {
        client,
        post: PostView::new(card, viewer, Utc::now()),
    }
    .to_response())
}

/// POST /posts/{post_id}/delete/
pub async fn delete(
    identity: Identity,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: web::Form<CsrfForm>,
) -> AppResult<HttpResponse> {
    validate_csrf_token(&req, &form.csrf_token)?;

    let post = load_post(&state, path.into_inner()).await?;
    if let Some(res) = ensure_owner(&state.settings, identity.viewer(), post.author_id, post.id)? {
        return Ok(res);
    }

    state.posts.delete(post.id).await?;
    if let Some(image) = &post.image {
        discard_image(&state, image).await;
    }

    tracing::info!(post_id = %post.id, "Post deleted");
    Ok(redirect("/"))
}
