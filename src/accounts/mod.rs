//! Platform user accounts.
//!
//! A [`Profile`] is the platform's user record, linked one-to-one with an
//! authentication identity from the hosted identity service.

pub mod profile;
pub mod routes;

pub use profile::{InMemoryProfileStore, Profile, ProfileStore, Role};
pub use routes::AccountsModule;
