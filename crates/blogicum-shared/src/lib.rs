//! # Blogicum Shared
//!
//! Form bindings shared by the HTTP layer: the payloads users submit, their
//! declarative validation rules, and the per-field error collection the
//! templates render next to each input.

pub mod errors;
pub mod forms;

pub use errors::FormErrors;
pub use forms::{
    CommentForm, LoginForm, PostFields, PostForm, ProfileForm, RegistrationForm, format_pub_date,
    parse_pub_date,
};
