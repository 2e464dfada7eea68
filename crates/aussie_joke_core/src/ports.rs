//! crates/aussie_joke_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete key-value store and generative API.

use async_trait::async_trait;
use crate::domain::{Joke, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A favorite was mutated while no user is logged in.
    #[error("No user is logged in")]
    NoSession,
    /// The joke source failed or returned a malformed/empty response.
    #[error("Joke generation failed: {0}")]
    Generation(String),
    /// The persistent store could not be read from or written to.
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A view change that the session state machine does not allow.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for the single session user and the joke library.
///
/// Reads and writes are synchronous and not transactional. The controller
/// calls them while holding its session lock on a runtime worker thread, so
/// an implementation must keep each call short: a few small records, no
/// network round trips. Move a slower backend behind `spawn_blocking` first.
pub trait StorageService: Send + Sync {
    /// Returns the stored user if the username matches, otherwise replaces the
    /// stored user with a fresh one. The joke library is never touched.
    fn login(&self, username: &str) -> PortResult<User>;

    /// The persisted user, if any. Malformed records read as `None`.
    fn current_user(&self) -> PortResult<Option<User>>;

    /// Deletes the persisted user. The joke library is kept.
    fn logout(&self) -> PortResult<()>;

    /// Upserts `joke` into the library, then flips its membership in the
    /// user's favorites. Fails with `PortError::NoSession` without a user.
    fn toggle_favorite(&self, joke: &Joke) -> PortResult<User>;

    /// The user's favorites in saved order. Ids missing from the library are skipped.
    fn favorites(&self) -> PortResult<Vec<Joke>>;
}

#[async_trait]
pub trait JokeGenerationService: Send + Sync {
    /// Generates one new joke with a fresh id and timestamp. Never retried.
    async fn generate_joke(&self) -> PortResult<Joke>;
}
