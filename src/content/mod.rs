//! Authored content.
//!
//! Posts are either free or premium; premium bodies are only rendered for
//! viewers the entitlement check clears.

pub mod entitlements;
pub mod post;
pub mod routes;

pub use entitlements::{Access, EntitlementChecker, decide};
pub use post::{ContentStore, InMemoryContentStore, Post, PostStatus, PostWithAuthor};
pub use routes::PostsModule;
