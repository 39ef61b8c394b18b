//! Who may see which posts.
//!
//! A post is public when it is published, its `pub_date` has passed and it
//! belongs to a published category. Authors always see their own posts,
//! drafts and scheduled ones included. Repositories turn a [`FeedQuery`] into
//! SQL conditions (or in-memory predicates); handlers use
//! [`Visibility::for_post`] for single-post lookups.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Category, Post};

/// The identity a request is made under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer(Option<Uuid>);

impl Viewer {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user(id: Uuid) -> Self {
        Self(Some(id))
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0
    }

    /// True when the viewer is the user `owner_id`.
    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.0 == Some(owner_id)
    }
}

impl From<Option<Uuid>> for Viewer {
    fn from(id: Option<Uuid>) -> Self {
        Self(id)
    }
}

/// Collection a feed is drawn from, before visibility filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    All,
    Author(Uuid),
    Category(Uuid),
}

impl FeedScope {
    pub fn contains(&self, post: &Post) -> bool {
        match self {
            FeedScope::All => true,
            FeedScope::Author(id) => post.author_id == *id,
            FeedScope::Category(id) => post.category_id == Some(*id),
        }
    }
}

/// Filter applied on top of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Owner view: drafts, scheduled posts and hidden categories included.
    Unrestricted,
    /// Public view as of `now`.
    Public { now: DateTime<Utc> },
}

impl Visibility {
    /// Only an author looking at their own profile feed sees it unfiltered.
    /// Category and index feeds are always public views.
    pub fn for_feed(viewer: Viewer, scope: FeedScope, now: DateTime<Utc>) -> Self {
        match scope {
            FeedScope::Author(author_id) if viewer.owns(author_id) => Visibility::Unrestricted,
            _ => Visibility::Public { now },
        }
    }

    pub fn for_post(viewer: Viewer, post: &Post, now: DateTime<Utc>) -> Self {
        if viewer.owns(post.author_id) {
            Visibility::Unrestricted
        } else {
            Visibility::Public { now }
        }
    }

    /// `category` must be the post's category (`None` when it has none).
    pub fn admits(&self, post: &Post, category: Option<&Category>) -> bool {
        match self {
            Visibility::Unrestricted => true,
            Visibility::Public { now } => {
                post.is_published
                    && post.pub_date <= *now
                    && category.is_some_and(|c| c.is_published)
            }
        }
    }
}

/// Everything a repository needs to build a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedQuery {
    pub scope: FeedScope,
    pub visibility: Visibility,
}

impl FeedQuery {
    pub fn new(viewer: Viewer, scope: FeedScope, now: DateTime<Utc>) -> Self {
        Self {
            scope,
            visibility: Visibility::for_feed(viewer, scope, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn category(published: bool) -> Category {
        let mut category = Category::new("Travel".into(), "Trips".into(), "travel".into());
        category.is_published = published;
        category
    }

    fn post(author: Uuid, category: &Category, pub_date: DateTime<Utc>) -> Post {
        let mut post = Post::new(author, "Title".into(), "Text".into(), pub_date);
        post.category_id = Some(category.id);
        post
    }

    #[test]
    fn public_view_requires_all_three_conditions() {
        let now = Utc::now();
        let author = Uuid::new_v4();
        let cat = category(true);
        let public = Visibility::Public { now };

        let visible = post(author, &cat, now - TimeDelta::hours(1));
        assert!(public.admits(&visible, Some(&cat)));

        let mut draft = visible.clone();
        draft.is_published = false;
        assert!(!public.admits(&draft, Some(&cat)));

        let scheduled = post(author, &cat, now + TimeDelta::days(1));
        assert!(!public.admits(&scheduled, Some(&cat)));

        let hidden = category(false);
        assert!(!public.admits(&post(author, &hidden, now), Some(&hidden)));
    }

    #[test]
    fn post_without_category_is_never_public() {
        let now = Utc::now();
        let post = Post::new(Uuid::new_v4(), "T".into(), "X".into(), now);
        assert!(!Visibility::Public { now }.admits(&post, None));
        assert!(Visibility::Unrestricted.admits(&post, None));
    }

    #[test]
    fn author_sees_own_hidden_post() {
        let now = Utc::now();
        let author = Uuid::new_v4();
        let hidden = category(false);
        let mut draft = post(author, &hidden, now + TimeDelta::days(3));
        draft.is_published = false;

        let own = Visibility::for_post(Viewer::user(author), &draft, now);
        assert_eq!(own, Visibility::Unrestricted);
        assert!(own.admits(&draft, Some(&hidden)));

        let stranger = Visibility::for_post(Viewer::user(Uuid::new_v4()), &draft, now);
        assert!(!stranger.admits(&draft, Some(&hidden)));

        let anonymous = Visibility::for_post(Viewer::anonymous(), &draft, now);
        assert!(!anonymous.admits(&draft, Some(&hidden)));
    }

    #[test]
    fn only_own_profile_feed_is_unrestricted() {
        let now = Utc::now();
        let author = Uuid::new_v4();
        let viewer = Viewer::user(author);

        assert_eq!(
            Visibility::for_feed(viewer, FeedScope::Author(author), now),
            Visibility::Unrestricted
        );
        assert_eq!(
            Visibility::for_feed(viewer, FeedScope::Author(Uuid::new_v4()), now),
            Visibility::Public { now }
        );
        assert_eq!(
            Visibility::for_feed(viewer, FeedScope::Category(Uuid::new_v4()), now),
            Visibility::Public { now }
        );
        assert_eq!(
            Visibility::for_feed(viewer, FeedScope::All, now),
            Visibility::Public { now }
        );
        assert_eq!(
            Visibility::for_feed(Viewer::anonymous(), FeedScope::Author(author), now),
            Visibility::Public { now }
        );
    }

    #[test]
    fn scope_membership() {
        let author = Uuid::new_v4();
        let cat = category(true);
        let post = post(author, &cat, Utc::now());

        assert!(FeedScope::All.contains(&post));
        assert!(FeedScope::Author(author).contains(&post));
        assert!(!FeedScope::Author(Uuid::new_v4()).contains(&post));
        assert!(FeedScope::Category(cat.id).contains(&post));
        assert!(!FeedScope::Category(Uuid::new_v4()).contains(&post));
    }
}
