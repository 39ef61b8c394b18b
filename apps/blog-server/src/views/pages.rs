use askama_actix::Template;

use blogicum_core::Page;
use blogicum_core::domain::Category;
use blogicum_shared::FormErrors;

use super::{Choice, CommentItem, PostFormValues, PostView, ProfileView};
use crate::middleware::ClientCtx;

#[derive(Template)]
#[template(path = "blog/index.html")]
pub struct IndexPage {
    pub client: ClientCtx,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "blog/category.html")]
pub struct CategoryPage {
    pub client: ClientCtx,
    pub category: Category,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "blog/profile.html")]
pub struct ProfilePage {
    pub client: ClientCtx,
    pub profile: ProfileView,
    pub is_own: bool,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "blog/detail.html")]
pub struct PostDetailPage {
    pub client: ClientCtx,
    pub post: PostView,
    pub comments: Vec<CommentItem>,
    /// Comment form contents, kept when a submission is rejected.
    pub comment_text: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "blog/create.html")]
pub struct PostFormPage {
    pub client: ClientCtx,
    /// Form target; differs between create and edit.
    pub action: String,
    pub editing: bool,
    pub form: PostFormValues,
    pub categories: Vec<Choice>,
    pub locations: Vec<Choice>,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "blog/post_confirm_delete.html")]
pub struct PostDeletePage {
    pub client: ClientCtx,
    pub post: PostView,
}

#[derive(Template)]
#[template(path = "blog/comment.html")]
pub struct CommentEditPage {
    pub client: ClientCtx,
    pub comment: CommentItem,
    pub text: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "blog/comment_confirm_delete.html")]
pub struct CommentDeletePage {
    pub client: ClientCtx,
    pub comment: CommentItem,
}

#[derive(Template)]
#[template(path = "blog/user.html")]
pub struct ProfileEditPage {
    pub client: ClientCtx,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "registration/login.html")]
pub struct LoginPage {
    pub client: ClientCtx,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "registration/registration_form.html")]
pub struct RegistrationPage {
    pub client: ClientCtx,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "registration/logged_out.html")]
pub struct LoggedOutPage {
    pub client: ClientCtx,
}

#[derive(Template, Default)]
#[template(path = "pages/404.html")]
pub struct NotFoundPage {
    pub client: ClientCtx,
}

#[derive(Template, Default)]
#[template(path = "pages/403.html")]
pub struct ForbiddenPage {
    pub client: ClientCtx,
}

#[derive(Template, Default)]
#[template(path = "pages/403csrf.html")]
pub struct CsrfFailurePage {
    pub client: ClientCtx,
}

#[derive(Template, Default)]
#[template(path = "pages/500.html")]
pub struct ServerErrorPage {
    pub client: ClientCtx,
}
