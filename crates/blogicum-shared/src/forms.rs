//! Form payloads and their validation rules.
//!
//! Every state-changing form carries the CSRF token it was rendered with in
//! `csrf_token`; the HTTP layer checks it before looking at anything else.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::FormErrors;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"));

const PUB_DATE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse the value of a `datetime-local` or `date` input as UTC.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    PUB_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Value for a `datetime-local` input.
pub fn format_pub_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M").to_string()
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(field_error("required", "This field is required."));
    }
    Ok(())
}

fn valid_pub_date(value: &str) -> Result<(), ValidationError> {
    if parse_pub_date(value).is_none() {
        return Err(field_error("pub_date", "Enter a valid date and time."));
    }
    Ok(())
}

fn required_choice(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(field_error("required", "This field is required."));
    }
    optional_choice(value)
}

fn optional_choice(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if !value.is_empty() && Uuid::parse_str(value).is_err() {
        return Err(field_error(
            "invalid_choice",
            "Select a valid choice. That choice is not one of the available choices.",
        ));
    }
    Ok(())
}

fn optional_email(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if !value.is_empty() && !validator::validate_email(value) {
        return Err(field_error("email", "Enter a valid email address."));
    }
    Ok(())
}

fn choice(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

/// Profile edit form; only ever bound to the requester's own account.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileForm {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters."),
        regex(
            path = "USERNAME_RE",
            message = "Enter a valid username: letters, digits and @/./+/-/_ only."
        )
    )]
    pub username: String,
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub first_name: String,
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub last_name: String,
    #[validate(custom = "optional_email")]
    pub email: String,
    pub csrf_token: String,
}

impl ProfileForm {
    pub fn check(&self) -> Result<(), FormErrors> {
        self.validate().map_err(FormErrors::from)
    }
}

/// Sign-up form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegistrationForm {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters."),
        regex(
            path = "USERNAME_RE",
            message = "Enter a valid username: letters, digits and @/./+/-/_ only."
        )
    )]
    pub username: String,
    #[validate(custom = "optional_email")]
    pub email: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password1: String,
    pub password2: String,
    pub csrf_token: String,
}

impl RegistrationForm {
    pub fn check(&self) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }
        errors.into_result()
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(custom = "not_blank")]
    pub username: String,
    #[validate(custom = "not_blank")]
    pub password: String,
    /// Where to go after logging in.
    pub next: Option<String>,
    pub csrf_token: String,
}

impl LoginForm {
    pub fn check(&self) -> Result<(), FormErrors> {
        self.validate().map_err(FormErrors::from)
    }
}

/// Comment create/edit form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[validate(custom = "not_blank")]
    pub text: String,
    pub csrf_token: String,
}

impl CommentForm {
    pub fn check(&self) -> Result<(), FormErrors> {
        self.validate().map_err(FormErrors::from)
    }
}

/// Post create/edit form as submitted; every value is still raw text.
#[derive(Debug, Clone, Default, Validate)]
pub struct PostForm {
    #[validate(
        custom = "not_blank",
        length(max = 256, message = "Ensure this value has at most 256 characters.")
    )]
    pub title: String,
    #[validate(custom = "not_blank")]
    pub text: String,
    #[validate(custom = "valid_pub_date")]
    pub pub_date: String,
    #[validate(custom = "optional_choice")]
    pub location: String,
    #[validate(custom = "required_choice")]
    pub category: String,
    pub is_published: bool,
    /// Edit only: drop the current image.
    pub clear_image: bool,
}

/// Typed values of a valid [`PostForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: Uuid,
    pub location_id: Option<Uuid>,
    pub is_published: bool,
}

impl PostForm {
    /// Validate and convert. Whether the chosen category/location exist is
    /// checked by the caller against the repositories.
    pub fn parse(&self) -> Result<PostFields, FormErrors> {
        self.validate().map_err(FormErrors::from)?;

        let mut errors = FormErrors::new();
        let pub_date = parse_pub_date(&self.pub_date);
        if pub_date.is_none() {
            errors.add("pub_date", "Enter a valid date and time.");
        }
        let category_id = choice(&self.category);
        if category_id.is_none() {
            errors.add("category", "This field is required.");
        }

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) => Ok(PostFields {
                title: self.title.trim().to_string(),
                text: self.text.clone(),
                pub_date,
                category_id,
                location_id: choice(&self.location),
                is_published: self.is_published,
            }),
            _ => Err(errors),
        }
    }
}
