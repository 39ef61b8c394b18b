//! PostgreSQL repository implementations.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DbConn, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Select,
};
use uuid::Uuid;

use blogicum_core::domain::{AuthorRef, Category, CommentView, Location, Post, PostCard, User};
use blogicum_core::error::RepoError;
use blogicum_core::pagination::{Page, PageRequest, PageWindow};
use blogicum_core::ports::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository, UserRepository,
};
use blogicum_core::visibility::{FeedQuery, FeedScope, Visibility};

use super::entity::{category, comment, location, post, user};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

pub type PostgresUserRepository = PostgresBaseRepository<user::Entity>;
pub type PostgresCategoryRepository = PostgresBaseRepository<category::Entity>;
pub type PostgresLocationRepository = PostgresBaseRepository<location::Entity>;
pub type PostgresPostRepository = PostgresBaseRepository<post::Entity>;
pub type PostgresCommentRepository = PostgresBaseRepository<comment::Entity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username, "Finding user by username");

        let result = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let result = category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .filter(category::Column::IsPublished.eq(true))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn list_published(&self) -> Result<Vec<Category>, RepoError> {
        let result = category::Entity::find()
            .filter(category::Column::IsPublished.eq(true))
            .order_by_asc(category::Column::Title)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl LocationRepository for PostgresLocationRepository {
    async fn list_published(&self) -> Result<Vec<Location>, RepoError> {
        let result = location::Entity::find()
            .filter(location::Column::IsPublished.eq(true))
            .order_by_asc(location::Column::Name)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// Scope and visibility as SQL. The public view inner-joins categories, so
/// posts without a category drop out together with unpublished categories.
pub(crate) fn feed_select(query: &FeedQuery) -> Select<post::Entity> {
    let mut select = post::Entity::find();

    select = match query.scope {
        FeedScope::All => select,
        FeedScope::Author(id) => select.filter(post::Column::AuthorId.eq(id)),
        FeedScope::Category(id) => select.filter(post::Column::CategoryId.eq(id)),
    };

    if let Visibility::Public { now } = query.visibility {
        select = select
            .join(JoinType::InnerJoin, post::Relation::Category.def())
            .filter(post::Column::IsPublished.eq(true))
            .filter(post::Column::PubDate.lte(DateTimeWithTimeZone::from(now)))
            .filter(category::Column::IsPublished.eq(true));
    }

    select
        .order_by_desc(post::Column::PubDate)
        .order_by_desc(post::Column::CreatedAt)
}

/// Attach authors, categories, locations and comment counts to a batch of
/// posts with one query per relation. Order of `models` is kept.
async fn hydrate(db: &DbConn, models: Vec<post::Model>) -> Result<Vec<PostCard>, RepoError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let post_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let author_ids: Vec<Uuid> = unique(models.iter().map(|m| m.author_id));
    let category_ids: Vec<Uuid> = unique(models.iter().filter_map(|m| m.category_id));
    let location_ids: Vec<Uuid> = unique(models.iter().filter_map(|m| m.location_id));

    let authors: HashMap<Uuid, String> = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Username)
        .filter(user::Column::Id.is_in(author_ids))
        .into_tuple::<(Uuid, String)>()
        .all(db)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .collect();

    let categories: HashMap<Uuid, Category> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|m| (m.id, m.into()))
            .collect()
    };

    let locations: HashMap<Uuid, Location> = if location_ids.is_empty() {
        HashMap::new()
    } else {
        location::Entity::find()
            .filter(location::Column::Id.is_in(location_ids))
            .all(db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|m| (m.id, m.into()))
            .collect()
    };

    let counts: HashMap<Uuid, i64> = comment::Entity::find()
        .select_only()
        .column(comment::Column::PostId)
        .column_as(Expr::col(comment::Column::Id).count(), "comment_count")
        .filter(comment::Column::PostId.is_in(post_ids))
        .group_by(comment::Column::PostId)
        .into_tuple::<(Uuid, i64)>()
        .all(db)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .collect();

    let cards = models
        .into_iter()
        .map(|model| {
            let post: Post = model.into();
            let author = AuthorRef {
                id: post.author_id,
                username: authors.get(&post.author_id).cloned().unwrap_or_default(),
            };
            let category = post.category_id.and_then(|id| categories.get(&id).cloned());
            let location = post.location_id.and_then(|id| locations.get(&id).cloned());
            let comment_count = counts.get(&post.id).copied().unwrap_or(0).max(0) as u64;

            PostCard {
                post,
                author,
                category,
                location,
                comment_count,
            }
        })
        .collect();

    Ok(cards)
}

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn feed(
        &self,
        query: &FeedQuery,
        page: PageRequest,
        per_page: u64,
    ) -> Result<Page<PostCard>, RepoError> {
        let select = feed_select(query);

        let total = select.clone().count(&self.db).await.map_err(map_db_err)?;
        let window = PageWindow::new(total, per_page, page);

        let models = select
            .offset(window.offset())
            .limit(window.limit())
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        tracing::debug!(
            page = window.number,
            num_pages = window.num_pages,
            total,
            "Loaded feed page"
        );

        let cards = hydrate(&self.db, models).await?;
        Ok(Page::from_window(cards, window))
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<PostCard>, RepoError> {
        let Some(model) = post::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        Ok(hydrate(&self.db, vec![model]).await?.pop())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError> {
        let rows = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .find_also_related(user::Entity)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|(comment, author)| {
                let author = AuthorRef {
                    id: comment.author_id,
                    username: author.map(|u| u.username).unwrap_or_default(),
                };
                CommentView {
                    comment: comment.into(),
                    author,
                }
            })
            .collect())
    }
}
