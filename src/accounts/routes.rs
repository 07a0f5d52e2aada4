use super::profile::{Profile, Role};
use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::{AppError, Result};
use crate::http::{JsonResponse, RouteModule};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;
use uuid::Uuid;

/// Routes for profile self-service and user administration.
pub struct AccountsModule;

impl RouteModule for AccountsModule {
    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/me", get(get_me).put(update_me))
            .route("/admin/users", get(list_users))
            .route("/admin/users/{id}/role", put(set_role))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SetRoleRequest {
    role: Role,
}

fn require_admin(profile: &Profile) -> Result<()> {
    if profile.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Admin access required"))
    }
}

async fn get_me(CurrentUser(profile): CurrentUser) -> JsonResponse<Profile> {
    Ok(Json(profile))
}

async fn update_me(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> JsonResponse<Profile> {
    let updated = state
        .profiles
        .update_name(profile.id, request.full_name)
        .await?;
    Ok(Json(updated))
}

async fn list_users(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
) -> JsonResponse<Vec<Profile>> {
    require_admin(&profile)?;
    Ok(Json(state.profiles.list().await?))
}

async fn set_role(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetRoleRequest>,
) -> JsonResponse<Profile> {
    require_admin(&profile)?;
    let updated = state.profiles.set_role(id, request.role).await?;
    Ok(Json(updated))
}
