//! In-memory repositories.
//!
//! Used when `DATABASE_URL` is not set and by the HTTP tests. The store
//! enforces the same constraints as the SQL schema: unique usernames and
//! category slugs, existing foreign keys, cascading deletes for users and
//! posts, and `SET NULL` for categories and locations.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use blogicum_core::domain::{
    AuthorRef, Category, Comment, CommentView, Location, Post, PostCard, User,
};
use blogicum_core::error::RepoError;
use blogicum_core::pagination::{Page, PageRequest};
use blogicum_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, LocationRepository, PostRepository,
    UserRepository,
};
use blogicum_core::visibility::FeedQuery;

#[derive(Debug, Default)]
pub struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    locations: HashMap<Uuid, Location>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
}

impl Tables {
    fn card(&self, post: Post) -> PostCard {
        let author = AuthorRef {
            id: post.author_id,
            username: self
                .users
                .get(&post.author_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
        };
        let category = post
            .category_id
            .and_then(|id| self.categories.get(&id).cloned());
        let location = post
            .location_id
            .and_then(|id| self.locations.get(&id).cloned());
        let comment_count = self
            .comments
            .values()
            .filter(|c| c.post_id == post.id)
            .count() as u64;

        PostCard {
            post,
            author,
            category,
            location,
            comment_count,
        }
    }

    fn remove_post(&mut self, id: Uuid) {
        self.posts.remove(&id);
        self.comments.retain(|_, c| c.post_id != id);
    }
}

/// A row type the in-memory store knows how to keep.
pub trait Record: Clone + Send + Sync + 'static {
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;

    /// Unique and foreign key checks against the other rows.
    fn check(&self, _tables: &Tables) -> Result<(), RepoError> {
        Ok(())
    }

    /// Remove the row and everything that depends on it.
    fn delete(id: Uuid, tables: &mut Tables) {
        Self::table_mut(tables).remove(&id);
    }
}

fn missing(entity: &str, id: Uuid) -> RepoError {
    RepoError::Constraint(format!("{entity} {id} does not exist"))
}

impl Record for User {
    const ENTITY: &'static str = "user";

    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.users
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.users
    }

    fn check(&self, tables: &Tables) -> Result<(), RepoError> {
        let taken = tables
            .users
            .values()
            .any(|u| u.id != self.id && u.username == self.username);
        if taken {
            return Err(RepoError::Constraint(format!(
                "username '{}' already exists",
                self.username
            )));
        }
        Ok(())
    }

    fn delete(id: Uuid, tables: &mut Tables) {
        tables.users.remove(&id);
        let posts: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in posts {
            tables.remove_post(post_id);
        }
        tables.comments.retain(|_, c| c.author_id != id);
    }
}

impl Record for Category {
    const ENTITY: &'static str = "category";

    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.categories
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.categories
    }

    fn check(&self, tables: &Tables) -> Result<(), RepoError> {
        let taken = tables
            .categories
            .values()
            .any(|c| c.id != self.id && c.slug == self.slug);
        if taken {
            return Err(RepoError::Constraint(format!(
                "slug '{}' already exists",
                self.slug
            )));
        }
        Ok(())
    }

    fn delete(id: Uuid, tables: &mut Tables) {
        tables.categories.remove(&id);
        for post in tables.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
    }
}

impl Record for Location {
    const ENTITY: &'static str = "location";

    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.locations
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.locations
    }

    fn delete(id: Uuid, tables: &mut Tables) {
        tables.locations.remove(&id);
        for post in tables.posts.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
    }
}

impl Record for Post {
    const ENTITY: &'static str = "post";

    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.posts
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.posts
    }

    fn check(&self, tables: &Tables) -> Result<(), RepoError> {
        if !tables.users.contains_key(&self.author_id) {
            return Err(missing("user", self.author_id));
        }
        if let Some(id) = self.category_id.filter(|id| !tables.categories.contains_key(id)) {
            return Err(missing("category", id));
        }
        if let Some(id) = self.location_id.filter(|id| !tables.locations.contains_key(id)) {
            return Err(missing("location", id));
        }
        Ok(())
    }

    fn delete(id: Uuid, tables: &mut Tables) {
        tables.remove_post(id);
    }
}

impl Record for Comment {
    const ENTITY: &'static str = "comment";

    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.comments
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.comments
    }

    fn check(&self, tables: &Tables) -> Result<(), RepoError> {
        if !tables.posts.contains_key(&self.post_id) {
            return Err(missing("post", self.post_id));
        }
        if !tables.users.contains_key(&self.author_id) {
            return Err(missing("user", self.author_id));
        }
        Ok(())
    }
}

/// Shared tables behind every in-memory repository handle.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryRepository::new(self.clone())
    }

    pub fn categories(&self) -> InMemoryCategoryRepository {
        InMemoryRepository::new(self.clone())
    }

    pub fn locations(&self) -> InMemoryLocationRepository {
        InMemoryRepository::new(self.clone())
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryRepository::new(self.clone())
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryRepository::new(self.clone())
    }
}

/// Generic in-memory repository over one table of the store.
pub struct InMemoryRepository<T> {
    store: InMemoryStore,
    _record: PhantomData<T>,
}

impl<T> InMemoryRepository<T> {
    fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }
}

pub type InMemoryUserRepository = InMemoryRepository<User>;
pub type InMemoryCategoryRepository = InMemoryRepository<Category>;
pub type InMemoryLocationRepository = InMemoryRepository<Location>;
pub type InMemoryPostRepository = InMemoryRepository<Post>;
pub type InMemoryCommentRepository = InMemoryRepository<Comment>;

#[async_trait]
impl<T: Record> BaseRepository<T, Uuid> for InMemoryRepository<T> {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(T::table(&tables).get(&id).cloned())
    }

    async fn insert(&self, entity: T) -> Result<T, RepoError> {
        let mut tables = self.store.tables.write().await;
        if T::table(&tables).contains_key(&entity.id()) {
            return Err(RepoError::Constraint(format!(
                "{} {} already exists",
                T::ENTITY,
                entity.id()
            )));
        }
        entity.check(&tables)?;
        T::table_mut(&mut tables).insert(entity.id(), entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: T) -> Result<T, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !T::table(&tables).contains_key(&entity.id()) {
            return Err(RepoError::NotFound);
        }
        entity.check(&tables)?;
        T::table_mut(&mut tables).insert(entity.id(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        if !T::table(&tables).contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        T::delete(id, &mut tables);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.slug == slug && c.is_published)
            .cloned())
    }

    async fn list_published(&self) -> Result<Vec<Category>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.is_published)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }
}

#[async_trait]
impl LocationRepository for InMemoryLocationRepository {
    async fn list_published(&self) -> Result<Vec<Location>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut locations: Vec<Location> = tables
            .locations
            .values()
            .filter(|l| l.is_published)
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn feed(
        &self,
        query: &FeedQuery,
        page: PageRequest,
        per_page: u64,
    ) -> Result<Page<PostCard>, RepoError> {
        let tables = self.store.tables.read().await;

        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|post| query.scope.contains(post))
            .filter(|post| {
                let category = post.category_id.and_then(|id| tables.categories.get(&id));
                query.visibility.admits(post, category)
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.pub_date
                .cmp(&a.pub_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(Page::from_sorted(posts, per_page, page).map(|post| tables.card(post)))
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<PostCard>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.get(&id).cloned().map(|post| tables.card(post)))
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = AuthorRef {
                    id: comment.author_id,
                    username: tables
                        .users
                        .get(&comment.author_id)
                        .map(|u| u.username.clone())
                        .unwrap_or_default(),
                };
                CommentView { comment, author }
            })
            .collect())
    }
}
