//! SeaORM-backed storage.
//!
//! Production persistence for profiles, posts, and the subscription cache.
//! The subscription upsert is a single `ON CONFLICT` write keyed by
//! `user_id`, so concurrent webhook deliveries for the same profile cannot
//! interleave a read-modify-write.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, entity::prelude::*, sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::accounts::{Profile, ProfileStore, Role};
use crate::auth::Identity;
use crate::billing::{
    SubscriptionRecord, SubscriptionStatus, SubscriptionStore, SubscriptionUpsert,
};
use crate::content::{ContentStore, Post, PostStatus, PostWithAuthor};
use crate::error::{AppError, Result};

// =============================================================================
// Entities
// =============================================================================

mod entity {
    use sea_orm::entity::prelude::*;

    pub mod profile {
        use super::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "profiles")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: Uuid,
            #[sea_orm(unique)]
            pub identity_id: String,
            pub email: String,
            pub full_name: Option<String>,
            pub role: String,
            pub avatar_url: Option<String>,
            pub created_at: DateTimeUtc,
            pub updated_at: DateTimeUtc,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod post {
        use super::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "posts")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: Uuid,
            pub title: String,
            #[sea_orm(column_type = "Text")]
            pub content: String,
            pub excerpt: Option<String>,
            pub author_id: Uuid,
            pub is_premium: bool,
            pub status: String,
            pub slug: Option<String>,
            pub featured_image: Option<String>,
            pub meta_title: Option<String>,
            pub meta_description: Option<String>,
            pub created_at: DateTimeUtc,
            pub updated_at: DateTimeUtc,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {
            #[sea_orm(
                belongs_to = "super::profile::Entity",
                from = "Column::AuthorId",
                to = "super::profile::Column::Id"
            )]
            Author,
        }

        impl Related<super::profile::Entity> for Entity {
            fn to() -> RelationDef {
                Relation::Author.def()
            }
        }

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod subscription {
        use super::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "subscriptions")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: Uuid,
            #[sea_orm(unique)]
            pub user_id: Uuid,
            pub stripe_customer_id: Option<String>,
            pub stripe_subscription_id: Option<String>,
            pub status: String,
            pub current_period_start: Option<DateTimeUtc>,
            pub current_period_end: Option<DateTimeUtc>,
            pub created_at: DateTimeUtc,
            pub updated_at: DateTimeUtc,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::{post, profile, subscription};

// =============================================================================
// Model conversions
// =============================================================================

fn model_to_profile(model: profile::Model) -> Profile {
    Profile {
        id: model.id,
        identity_id: model.identity_id,
        email: model.email,
        full_name: model.full_name,
        role: Role::parse(&model.role),
        avatar_url: model.avatar_url,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn model_to_post(model: post::Model) -> Post {
    Post {
        id: model.id,
        title: model.title,
        content: model.content,
        excerpt: model.excerpt,
        author_id: model.author_id,
        is_premium: model.is_premium,
        status: PostStatus::parse(&model.status),
        slug: model.slug,
        featured_image: model.featured_image,
        meta_title: model.meta_title,
        meta_description: model.meta_description,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn post_to_active_model(p: &Post) -> post::ActiveModel {
    post::ActiveModel {
        id: Set(p.id),
        title: Set(p.title.clone()),
        content: Set(p.content.clone()),
        excerpt: Set(p.excerpt.clone()),
        author_id: Set(p.author_id),
        is_premium: Set(p.is_premium),
        status: Set(p.status.as_str().to_string()),
        slug: Set(p.slug.clone()),
        featured_image: Set(p.featured_image.clone()),
        meta_title: Set(p.meta_title.clone()),
        meta_description: Set(p.meta_description.clone()),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    }
}

fn model_to_subscription(model: subscription::Model) -> SubscriptionRecord {
    SubscriptionRecord {
        id: model.id,
        user_id: model.user_id,
        stripe_customer_id: model.stripe_customer_id,
        stripe_subscription_id: model.stripe_subscription_id,
        status: SubscriptionStatus::from_provider(&model.status),
        current_period_start: model.current_period_start,
        current_period_end: model.current_period_end,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// =============================================================================
// Store
// =============================================================================

/// SeaORM-backed store implementing all three storage traits.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Slug uniqueness among published posts, excluding `id` itself.
    async fn slug_taken(&self, slug: &str, id: Uuid) -> Result<bool> {
        let count = post::Entity::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Status.eq(PostStatus::Published.as_str()))
            .filter(post::Column::Id.ne(id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl ProfileStore for SeaOrmStore {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>> {
        let model = profile::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_profile))
    }

    async fn get_by_identity(&self, identity_id: &str) -> Result<Option<Profile>> {
        let model = profile::Entity::find()
            .filter(profile::Column::IdentityId.eq(identity_id))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_profile))
    }

    async fn ensure(&self, identity: &Identity) -> Result<Profile> {
        if let Some(existing) = self.get_by_identity(&identity.id).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let active = profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            identity_id: Set(identity.id.clone()),
            email: Set(identity.email.clone()),
            full_name: Set(None),
            role: Set(Role::User.as_str().to_string()),
            avatar_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // Two first-requests can race; the conflict target makes the loser
        // a no-op and the re-read below returns the winner's row.
        profile::Entity::insert(active)
            .on_conflict(
                OnConflict::column(profile::Column::IdentityId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        self.get_by_identity(&identity.id)
            .await?
            .ok_or_else(|| AppError::internal("Profile missing after ensure"))
    }

    async fn list(&self) -> Result<Vec<Profile>> {
        let models = profile::Entity::find()
            .order_by_desc(profile::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_profile).collect())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Profile> {
        let model = profile::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Profile {}", id)))?;

        let mut active: profile::ActiveModel = model.into();
        active.role = Set(role.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(model_to_profile(updated))
    }

    async fn update_name(&self, id: Uuid, full_name: Option<String>) -> Result<Profile> {
        let model = profile::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Profile {}", id)))?;

        let mut active: profile::ActiveModel = model.into();
        active.full_name = Set(full_name);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(model_to_profile(updated))
    }
}

#[async_trait]
impl ContentStore for SeaOrmStore {
    async fn create(&self, p: &Post) -> Result<()> {
        if p.status == PostStatus::Published {
            if let Some(slug) = p.slug.as_deref() {
                if self.slug_taken(slug, p.id).await? {
                    return Err(AppError::bad_request(format!("Slug already in use: {}", slug)));
                }
            }
        }

        post_to_active_model(p).insert(&self.db).await?;
        Ok(())
    }

    async fn update(&self, p: &Post) -> Result<()> {
        if p.status == PostStatus::Published {
            if let Some(slug) = p.slug.as_deref() {
                if self.slug_taken(slug, p.id).await? {
                    return Err(AppError::bad_request(format!("Slug already in use: {}", slug)));
                }
            }
        }

        let exists = post::Entity::find_by_id(p.id).one(&self.db).await?;
        if exists.is_none() {
            return Err(AppError::not_found(format!("Post {}", p.id)));
        }

        post_to_active_model(p).update(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = post::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found(format!("Post {}", id)));
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>> {
        let model = post::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_post))
    }

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>> {
        let found = post::Entity::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Status.eq(PostStatus::Published.as_str()))
            .find_also_related(profile::Entity)
            .one(&self.db)
            .await?;

        match found {
            Some((post_model, Some(author_model))) => Ok(Some(PostWithAuthor {
                post: model_to_post(post_model),
                author: model_to_profile(author_model),
            })),
            Some((post_model, None)) => Err(AppError::internal(format!(
                "Author missing for post {}",
                post_model.id
            ))),
            None => Ok(None),
        }
    }

    async fn list_published(&self) -> Result<Vec<PostWithAuthor>> {
        let rows = post::Entity::find()
            .filter(post::Column::Status.eq(PostStatus::Published.as_str()))
            .order_by_desc(post::Column::CreatedAt)
            .find_also_related(profile::Entity)
            .all(&self.db)
            .await?;

        let mut joined = Vec::with_capacity(rows.len());
        for (post_model, author_model) in rows {
            match author_model {
                Some(author) => joined.push(PostWithAuthor {
                    post: model_to_post(post_model),
                    author: model_to_profile(author),
                }),
                None => {
                    tracing::warn!(post_id = %post_model.id, "Skipping post with missing author");
                }
            }
        }
        Ok(joined)
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let models = post::Entity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .order_by_desc(post::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_post).collect())
    }
}

#[async_trait]
impl SubscriptionStore for SeaOrmStore {
    async fn get_for_profile(&self, user_id: Uuid) -> Result<Option<SubscriptionRecord>> {
        let model = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_subscription))
    }

    async fn upsert_for_profile(&self, user_id: Uuid, change: &SubscriptionUpsert) -> Result<()> {
        let now = Utc::now();
        let active = subscription::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            stripe_customer_id: Set(Some(change.stripe_customer_id.clone())),
            stripe_subscription_id: Set(Some(change.stripe_subscription_id.clone())),
            status: Set(change.status.as_str().to_string()),
            current_period_start: Set(change.current_period_start),
            current_period_end: Set(change.current_period_end),
            created_at: Set(now),
            updated_at: Set(now),
        };

        subscription::Entity::insert(active)
            .on_conflict(
                OnConflict::column(subscription::Column::UserId)
                    .update_columns([
                        subscription::Column::StripeCustomerId,
                        subscription::Column::StripeSubscriptionId,
                        subscription::Column::Status,
                        subscription::Column::CurrentPeriodStart,
                        subscription::Column::CurrentPeriodEnd,
                        subscription::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    async fn set_status_by_subscription_ref(
        &self,
        subscription_ref: &str,
        status: SubscriptionStatus,
    ) -> Result<bool> {
        let result = subscription::Entity::update_many()
            .col_expr(
                subscription::Column::Status,
                Expr::value(status.as_str().to_string()),
            )
            .col_expr(subscription::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(subscription::Column::StripeSubscriptionId.eq(subscription_ref))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
