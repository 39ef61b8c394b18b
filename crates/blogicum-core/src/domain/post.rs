use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, Location};
use crate::visibility::{Viewer, Visibility};

/// Post entity - a blog entry, possibly scheduled for a future `pub_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Path relative to the media root.
    pub image: Option<String>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new published post without category, location or image.
    pub fn new(author_id: Uuid, title: String, text: String, pub_date: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title,
            text,
            pub_date,
            image: None,
            category_id: None,
            location_id: None,
            is_published: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Publication date still ahead of `now`.
    pub fn is_scheduled(&self, now: DateTime<Utc>) -> bool {
        self.pub_date > now
    }
}

/// Minimal author data carried alongside posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
}

/// A post joined with everything a feed or detail page shows.
///
/// `comment_count` is aggregated when the card is read; nothing stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCard {
    pub post: Post,
    pub author: AuthorRef,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub comment_count: u64,
}

impl PostCard {
    /// Whether `viewer` may open this post's detail page at `now`.
    pub fn is_visible_to(&self, viewer: Viewer, now: DateTime<Utc>) -> bool {
        Visibility::for_post(viewer, &self.post, now).admits(&self.post, self.category.as_ref())
    }
}
