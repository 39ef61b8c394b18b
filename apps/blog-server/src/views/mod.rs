//! What the templates see: flattened, preformatted views of domain data and
//! the askama page structs that render them.

mod pages;

pub use pages::*;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use blogicum_core::Viewer;
use blogicum_core::domain::{Category, CommentView, Location, PostCard, User};
use blogicum_shared::format_pub_date;

const DISPLAY_FORMAT: &str = "%d.%m.%Y %H:%M";

pub fn display_date(date: DateTime<Utc>) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// A post as shown in feeds, on its own page and on the delete page.
#[derive(Debug, Clone)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub author: String,
    pub category_title: String,
    pub category_slug: String,
    /// Empty when the post has no location or it is hidden.
    pub location: String,
    /// URL under `/media/`, empty without an image.
    pub image_url: String,
    pub comment_count: u64,
    pub is_published: bool,
    pub is_scheduled: bool,
    pub category_hidden: bool,
    pub is_own: bool,
}

impl PostView {
    pub fn new(card: PostCard, viewer: Viewer, now: DateTime<Utc>) -> Self {
        let post = card.post;
        let (category_title, category_slug, category_hidden) = match &card.category {
            Some(c) => (c.title.clone(), c.slug.clone(), !c.is_published),
            None => (String::new(), String::new(), true),
        };

        Self {
            id: post.id.to_string(),
            is_scheduled: post.is_scheduled(now),
            is_own: viewer.owns(post.author_id),
            title: post.title,
            text: post.text,
            pub_date: display_date(post.pub_date),
            author: card.author.username,
            category_title,
            category_slug,
            location: card
                .location
                .filter(|l| l.is_published)
                .map(|l| l.name)
                .unwrap_or_default(),
            image_url: post.image.map(|p| media_url(&p)).unwrap_or_default(),
            comment_count: card.comment_count,
            is_published: post.is_published,
            category_hidden,
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }

    pub fn has_category(&self) -> bool {
        !self.category_slug.is_empty()
    }

    pub fn has_location(&self) -> bool {
        !self.location.is_empty()
    }

    /// Owner-only notice explaining why others can't see the post.
    pub fn hidden_reason(&self) -> &'static str {
        if !self.is_published {
            "Draft: only you can see this post."
        } else if self.category_hidden {
            "Hidden: the category is not published."
        } else if self.is_scheduled {
            "Scheduled: visible from the publication date."
        } else {
            ""
        }
    }

    pub fn is_hidden(&self) -> bool {
        !self.hidden_reason().is_empty()
    }
}

pub fn media_url(relative_path: &str) -> String {
    format!("/media/{}", relative_path)
}

/// A comment row under a post.
#[derive(Debug, Clone)]
pub struct CommentItem {
    pub id: String,
    pub post_id: String,
    pub text: String,
    pub author: String,
    pub created_at: String,
    pub is_own: bool,
}

impl CommentItem {
    pub fn new(view: CommentView, viewer: Viewer) -> Self {
        Self {
            id: view.comment.id.to_string(),
            post_id: view.comment.post_id.to_string(),
            is_own: viewer.owns(view.comment.author_id),
            text: view.comment.text,
            author: view.author.username,
            created_at: display_date(view.comment.created_at),
        }
    }
}

/// One `<option>` of a select input.
#[derive(Debug, Clone)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl Choice {
    pub fn categories(categories: &[Category], selected: &str) -> Vec<Choice> {
        categories
            .iter()
            .map(|c| Choice {
                value: c.id.to_string(),
                label: c.title.clone(),
                selected: c.id.to_string() == selected,
            })
            .collect()
    }

    pub fn locations(locations: &[Location], selected: &str) -> Vec<Choice> {
        locations
            .iter()
            .map(|l| Choice {
                value: l.id.to_string(),
                label: l.name.clone(),
                selected: l.id.to_string() == selected,
            })
            .collect()
    }
}

/// Raw values of the post form, as typed or as stored.
#[derive(Debug, Clone)]
pub struct PostFormValues {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub category: String,
    pub location: String,
    pub is_published: bool,
    pub image_url: String,
}

impl PostFormValues {
    /// Fresh form: published, dated now.
    pub fn blank(now: DateTime<Utc>) -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            pub_date: format_pub_date(now),
            category: String::new(),
            location: String::new(),
            is_published: true,
            image_url: String::new(),
        }
    }

    pub fn from_post(post: &blogicum_core::domain::Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: format_pub_date(post.pub_date),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            is_published: post.is_published,
            image_url: post.image.as_deref().map(media_url).unwrap_or_default(),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}

/// Header of a profile page.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub joined: String,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.display_name(),
            joined: display_date(user.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogicum_core::domain::{AuthorRef, Post};
    use chrono::TimeDelta;

    fn card(author: Uuid, published_category: bool) -> PostCard {
        let now = Utc::now();
        let mut category = Category::new("Travel".into(), String::new(), "travel".into());
        category.is_published = published_category;
        let mut post = Post::new(author, "Title".into(), "Body".into(), now + TimeDelta::hours(1));
        post.category_id = Some(category.id);
        post.image = Some("images/a.png".into());

        PostCard {
            post,
            author: AuthorRef {
                id: author,
                username: "leo".into(),
            },
            category: Some(category),
            location: Some(Location {
                is_published: false,
                ..Location::new("Moscow".into())
            }),
            comment_count: 3,
        }
    }

    #[test]
    fn post_view_flattens_card() {
        let author = Uuid::new_v4();
        let view = PostView::new(card(author, true), Viewer::user(author), Utc::now());

        assert!(view.is_own);
        assert!(view.is_scheduled);
        assert_eq!(view.image_url, "/media/images/a.png");
        assert_eq!(view.category_slug, "travel");
        // Hidden locations are not shown.
        assert!(!view.has_location());
        assert_eq!(view.comment_count, 3);
        assert_eq!(
            view.hidden_reason(),
            "Scheduled: visible from the publication date."
        );
    }

    #[test]
    fn hidden_category_is_reported_first_after_drafts() {
        let author = Uuid::new_v4();
        let view = PostView::new(card(author, false), Viewer::anonymous(), Utc::now());
        assert!(!view.is_own);
        assert_eq!(view.hidden_reason(), "Hidden: the category is not published.");
    }

    #[test]
    fn choices_mark_selection() {
        let a = Category::new("A".into(), String::new(), "a".into());
        let b = Category::new("B".into(), String::new(), "b".into());
        let choices = Choice::categories(&[a.clone(), b], &a.id.to_string());
        assert!(choices[0].selected);
        assert!(!choices[1].selected);
    }
}
