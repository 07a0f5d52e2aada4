use crate::accounts::{Profile, ProfileStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "published" => Self::Published,
            _ => Self::Draft,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authored content unit.
///
/// Only published posts are visible to non-author readers; `slug` is the
/// public lookup key and must be unique among published posts when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub author_id: Uuid,
    pub is_premium: bool,
    pub status: PostStatus,
    pub slug: Option<String>,
    pub featured_image: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post joined with its author's profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: Profile,
}

/// Trait for storing posts.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a new post.
    async fn create(&self, post: &Post) -> Result<()>;

    /// Replace an existing post.
    async fn update(&self, post: &Post) -> Result<()>;

    /// Delete a post.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Get a post by id, regardless of status.
    async fn get(&self, id: Uuid) -> Result<Option<Post>>;

    /// Look up a published post by its public slug, with its author.
    ///
    /// Drafts are never returned through this path.
    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>>;

    /// List published posts with their authors, newest first.
    async fn list_published(&self) -> Result<Vec<PostWithAuthor>>;

    /// List all of an author's posts including drafts, newest first.
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>>;
}

/// In-memory content store.
///
/// Shares a profile store so that join-style reads can attach authors.
#[derive(Clone)]
pub struct InMemoryContentStore {
    posts: std::sync::Arc<std::sync::RwLock<std::collections::HashMap<Uuid, Post>>>,
    profiles: std::sync::Arc<dyn ProfileStore>,
}

impl InMemoryContentStore {
    #[must_use]
    pub fn new(profiles: std::sync::Arc<dyn ProfileStore>) -> Self {
        Self {
            posts: Default::default(),
            profiles,
        }
    }

    /// Slug uniqueness among published posts, excluding `id` itself.
    fn slug_taken(&self, slug: &str, id: Uuid) -> bool {
        self.posts.read().unwrap().values().any(|p| {
            p.id != id && p.status == PostStatus::Published && p.slug.as_deref() == Some(slug)
        })
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn create(&self, post: &Post) -> Result<()> {
        if post.status == PostStatus::Published {
            if let Some(slug) = post.slug.as_deref() {
                if self.slug_taken(slug, post.id) {
                    return Err(AppError::bad_request(format!("Slug already in use: {}", slug)));
                }
            }
        }
        self.posts.write().unwrap().insert(post.id, post.clone());
        Ok(())
    }

    async fn update(&self, post: &Post) -> Result<()> {
        if post.status == PostStatus::Published {
            if let Some(slug) = post.slug.as_deref() {
                if self.slug_taken(slug, post.id) {
                    return Err(AppError::bad_request(format!("Slug already in use: {}", slug)));
                }
            }
        }
        let mut posts = self.posts.write().unwrap();
        if !posts.contains_key(&post.id) {
            return Err(AppError::not_found(format!("Post {}", post.id)));
        }
        posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let removed = self.posts.write().unwrap().remove(&id);
        if removed.is_none() {
            return Err(AppError::not_found(format!("Post {}", id)));
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.read().unwrap().get(&id).cloned())
    }

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>> {
        let post = self.posts.read().unwrap().values().find_map(|p| {
            (p.status == PostStatus::Published && p.slug.as_deref() == Some(slug))
                .then(|| p.clone())
        });

        let Some(post) = post else {
            return Ok(None);
        };

        let author = self
            .profiles
            .get(post.author_id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Author missing for post {}", post.id)))?;

        Ok(Some(PostWithAuthor { post, author }))
    }

    async fn list_published(&self) -> Result<Vec<PostWithAuthor>> {
        let mut published: Vec<Post> = self
            .posts
            .read()
            .unwrap()
            .values()
            .filter(|p| p.status == PostStatus::Published)
            .cloned()
            .collect();
        published.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut joined = Vec::with_capacity(published.len());
        for post in published {
            match self.profiles.get(post.author_id).await? {
                Some(author) => joined.push(PostWithAuthor { post, author }),
                None => {
                    tracing::warn!(post_id = %post.id, "Skipping post with missing author");
                }
            }
        }
        Ok(joined)
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .read()
            .unwrap()
            .values()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::InMemoryProfileStore;
    use crate::auth::Identity;

    async fn store_with_author() -> (InMemoryContentStore, Profile) {
        let profiles = InMemoryProfileStore::new();
        let author = profiles
            .ensure(&Identity {
                id: "auth_author".to_string(),
                email: "author@example.com".to_string(),
            })
            .await
            .unwrap();
        (
            InMemoryContentStore::new(std::sync::Arc::new(profiles)),
            author,
        )
    }

    fn post(author_id: Uuid, slug: Option<&str>, status: PostStatus) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            title: "A post".to_string(),
            content: "Body text".to_string(),
            excerpt: None,
            author_id,
            is_premium: false,
            status,
            slug: slug.map(String::from),
            featured_image: None,
            meta_title: None,
            meta_description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn slug_lookup_returns_published_with_author() {
        let (store, author) = store_with_author().await;
        let p = post(author.id, Some("hello-world"), PostStatus::Published);
        store.create(&p).await.unwrap();

        let found = store.get_published_by_slug("hello-world").await.unwrap().unwrap();
        assert_eq!(found.post.id, p.id);
        assert_eq!(found.author.id, author.id);
    }

    #[tokio::test]
    async fn slug_lookup_never_returns_drafts() {
        let (store, author) = store_with_author().await;
        store
            .create(&post(author.id, Some("wip"), PostStatus::Draft))
            .await
            .unwrap();

        assert!(store.get_published_by_slug("wip").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_published_slug_rejected() {
        let (store, author) = store_with_author().await;
        store
            .create(&post(author.id, Some("taken"), PostStatus::Published))
            .await
            .unwrap();

        let result = store
            .create(&post(author.id, Some("taken"), PostStatus::Published))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn draft_may_reuse_published_slug() {
        let (store, author) = store_with_author().await;
        store
            .create(&post(author.id, Some("taken"), PostStatus::Published))
            .await
            .unwrap();

        store
            .create(&post(author.id, Some("taken"), PostStatus::Draft))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_published_excludes_drafts() {
        let (store, author) = store_with_author().await;
        store
            .create(&post(author.id, Some("one"), PostStatus::Published))
            .await
            .unwrap();
        store
            .create(&post(author.id, None, PostStatus::Draft))
            .await
            .unwrap();

        let listed = store.list_published().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].post.slug.as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn list_by_author_includes_drafts() {
        let (store, author) = store_with_author().await;
        store
            .create(&post(author.id, Some("one"), PostStatus::Published))
            .await
            .unwrap();
        store
            .create(&post(author.id, None, PostStatus::Draft))
            .await
            .unwrap();

        let listed = store.list_by_author(author.id).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn update_missing_post_is_not_found() {
        let (store, author) = store_with_author().await;
        let p = post(author.id, None, PostStatus::Draft);
        let result = store.update(&p).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
