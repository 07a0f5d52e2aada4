//! Session-based identity resolution.
//!
//! The platform delegates sign-up/sign-in to a hosted identity service; this
//! module only answers "who is the current caller" from a session token. The
//! resulting [`Identity`] is distinct from the [`crate::accounts::Profile`]
//! record it maps onto.

pub mod extractors;
pub mod session;

pub use extractors::{CurrentUser, MaybeUser, TokenExtractor};
pub use session::{Identity, IdentityProvider, JwtIdentityProvider, StaticTokenProvider};
