use super::entitlements::{Access, EntitlementChecker};
use super::post::{Post, PostStatus, PostWithAuthor};
use crate::app::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{AppError, Result};
use crate::http::{JsonResponse, NoContentResponse, RouteModule};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Routes for the public read path and authoring.
pub struct PostsModule;

impl RouteModule for PostsModule {
    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/posts", get(list_posts))
            .route("/posts/{slug}", get(view_post))
            .route("/dashboard/posts", get(list_own_posts).post(create_post))
            .route(
                "/dashboard/posts/{id}",
                put(update_post).delete(delete_post),
            )
    }
}

/// A post as shown on index pages: no body, free or premium alike.
#[derive(Debug, Serialize)]
struct PostSummary {
    id: Uuid,
    title: String,
    excerpt: Option<String>,
    slug: Option<String>,
    is_premium: bool,
    author_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PostWithAuthor> for PostSummary {
    fn from(joined: PostWithAuthor) -> Self {
        Self {
            id: joined.post.id,
            title: joined.post.title,
            excerpt: joined.post.excerpt,
            slug: joined.post.slug,
            is_premium: joined.post.is_premium,
            author_name: joined.author.full_name,
            created_at: joined.post.created_at,
        }
    }
}

/// A single post view: the body is present only when access is granted.
#[derive(Debug, Serialize)]
struct PostView {
    id: Uuid,
    title: String,
    excerpt: Option<String>,
    is_premium: bool,
    author_name: Option<String>,
    created_at: DateTime<Utc>,
    access: Access,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostPayload {
    title: String,
    content: String,
    excerpt: Option<String>,
    #[serde(default)]
    is_premium: bool,
    #[serde(default)]
    status: PostStatus,
    slug: Option<String>,
    featured_image: Option<String>,
    meta_title: Option<String>,
    meta_description: Option<String>,
}

async fn list_posts(State(state): State<AppState>) -> JsonResponse<Vec<PostSummary>> {
    let published = state.content.list_published().await?;
    Ok(Json(published.into_iter().map(PostSummary::from).collect()))
}

async fn view_post(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
) -> JsonResponse<PostView> {
    let joined = state
        .content
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("Post"))?;

    let checker = EntitlementChecker::new(state.subscriptions.clone());
    let access = checker.can_view(&joined.post, viewer.as_ref()).await;

    let PostWithAuthor { post, author } = joined;
    Ok(Json(PostView {
        id: post.id,
        title: post.title,
        excerpt: post.excerpt,
        is_premium: post.is_premium,
        author_name: author.full_name,
        created_at: post.created_at,
        access,
        content: access.grants_full().then_some(post.content),
    }))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
    Json(payload): Json<PostPayload>,
) -> JsonResponse<Post> {
    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4(),
        title: payload.title,
        content: payload.content,
        excerpt: payload.excerpt,
        author_id: profile.id,
        is_premium: payload.is_premium,
        status: payload.status,
        slug: payload.slug,
        featured_image: payload.featured_image,
        meta_title: payload.meta_title,
        meta_description: payload.meta_description,
        created_at: now,
        updated_at: now,
    };

    state.content.create(&post).await?;
    Ok(Json(post))
}

async fn update_post(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostPayload>,
) -> JsonResponse<Post> {
    let existing = state
        .content
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post"))?;
    require_author_or_admin(&existing, &profile)?;

    let updated = Post {
        id: existing.id,
        title: payload.title,
        content: payload.content,
        excerpt: payload.excerpt,
        author_id: existing.author_id,
        is_premium: payload.is_premium,
        status: payload.status,
        slug: payload.slug,
        featured_image: payload.featured_image,
        meta_title: payload.meta_title,
        meta_description: payload.meta_description,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };

    state.content.update(&updated).await?;
    Ok(Json(updated))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<NoContentResponse> {
    let existing = state
        .content
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post"))?;
    require_author_or_admin(&existing, &profile)?;

    state.content.delete(id).await?;
    Ok(NoContentResponse)
}

async fn list_own_posts(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
) -> JsonResponse<Vec<Post>> {
    Ok(Json(state.content.list_by_author(profile.id).await?))
}

fn require_author_or_admin(post: &Post, profile: &crate::accounts::Profile) -> Result<()> {
    if post.author_id == profile.id || profile.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Not the author of this post"))
    }
}
