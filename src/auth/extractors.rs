use crate::accounts::Profile;
use crate::app::AppState;
use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::future::Future;

/// Extracts bearer token from request headers
pub struct TokenExtractor;

impl TokenExtractor {
    /// Extract token from Authorization header
    pub fn from_header(parts: &Parts) -> Result<String, AppError> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        if !auth_header.starts_with("Bearer ") {
            return Err(AppError::unauthorized(
                "Invalid authorization header format. Expected: Bearer <token>",
            ));
        }

        let token = auth_header.trim_start_matches("Bearer ").to_string();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(token)
    }
}

/// Axum extractor for authenticated callers.
///
/// Resolves the session token to an identity and hands the handler the
/// matching [`Profile`], creating it on first sign-in. The request is
/// rejected with 401 if the session cannot be verified.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(CurrentUser(profile): CurrentUser) -> JsonResponse<DashboardData> {
///     // profile.id, profile.role, ...
/// }
/// ```
pub struct CurrentUser(pub Profile);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let state = state.clone();
        Box::pin(async move {
            let token = TokenExtractor::from_header(parts)?;
            let identity = state.identity.verify_session(&token).await?;
            let profile = state.profiles.ensure(&identity).await?;
            Ok(CurrentUser(profile))
        })
    }
}

/// Axum extractor for optional authentication.
///
/// Returns `Some(profile)` when a valid session is present, `None`
/// otherwise. Never rejects the request - the public read path uses this to
/// serve anonymous readers.
pub struct MaybeUser(pub Option<Profile>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let state = state.clone();
        Box::pin(async move {
            let token = match TokenExtractor::from_header(parts) {
                Ok(t) => t,
                Err(_) => return Ok(MaybeUser(None)),
            };

            let identity = match state.identity.verify_session(&token).await {
                Ok(i) => i,
                Err(_) => return Ok(MaybeUser(None)),
            };

            match state.profiles.ensure(&identity).await {
                Ok(profile) => Ok(MaybeUser(Some(profile))),
                Err(_) => Ok(MaybeUser(None)),
            }
        })
    }
}
