use crate::auth::Identity;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A platform user record, distinct from the raw authentication identity.
///
/// Exactly one Profile exists per identity; it is created on first
/// authenticated request and never deleted in normal flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Link to the authentication identity this profile belongs to.
    pub identity_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Trait for storing profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get a profile by its id.
    async fn get(&self, id: Uuid) -> Result<Option<Profile>>;

    /// Get the profile linked to an authentication identity.
    async fn get_by_identity(&self, identity_id: &str) -> Result<Option<Profile>>;

    /// Get the profile for an identity, creating it on first sign-in.
    async fn ensure(&self, identity: &Identity) -> Result<Profile>;

    /// List all profiles, newest first.
    async fn list(&self) -> Result<Vec<Profile>>;

    /// Change a profile's role.
    async fn set_role(&self, id: Uuid, role: Role) -> Result<Profile>;

    /// Update a profile's display name.
    async fn update_name(&self, id: Uuid, full_name: Option<String>) -> Result<Profile>;
}

#[async_trait]
impl<T: ProfileStore + ?Sized> ProfileStore for std::sync::Arc<T> {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>> {
        (**self).get(id).await
    }

    async fn get_by_identity(&self, identity_id: &str) -> Result<Option<Profile>> {
        (**self).get_by_identity(identity_id).await
    }

    async fn ensure(&self, identity: &Identity) -> Result<Profile> {
        (**self).ensure(identity).await
    }

    async fn list(&self) -> Result<Vec<Profile>> {
        (**self).list().await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Profile> {
        (**self).set_role(id, role).await
    }

    async fn update_name(&self, id: Uuid, full_name: Option<String>) -> Result<Profile> {
        (**self).update_name(id, full_name).await
    }
}

/// In-memory profile store.
///
/// Backs tests and the zero-config local-dev server. Wraps data in `Arc`
/// for cheap cloning.
#[derive(Default, Clone)]
pub struct InMemoryProfileStore {
    inner: std::sync::Arc<std::sync::RwLock<std::collections::HashMap<Uuid, Profile>>>,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(self.inner.read().unwrap().get(&id).cloned())
    }

    async fn get_by_identity(&self, identity_id: &str) -> Result<Option<Profile>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .values()
            .find(|p| p.identity_id == identity_id)
            .cloned())
    }

    async fn ensure(&self, identity: &Identity) -> Result<Profile> {
        let mut profiles = self.inner.write().unwrap();

        if let Some(existing) = profiles.values().find(|p| p.identity_id == identity.id) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            identity_id: identity.id.clone(),
            email: identity.email.clone(),
            full_name: None,
            role: Role::User,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn list(&self) -> Result<Vec<Profile>> {
        let mut all: Vec<Profile> = self.inner.read().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Profile> {
        let mut profiles = self.inner.write().unwrap();
        let profile = profiles
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Profile {}", id)))?;
        profile.role = role;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn update_name(&self, id: Uuid, full_name: Option<String>) -> Result<Profile> {
        let mut profiles = self.inner.write().unwrap();
        let profile = profiles
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Profile {}", id)))?;
        profile.full_name = full_name;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}
