//! crates/aussie_joke_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use chrono::{DateTime, Utc};

/// An Australian slang term used in a joke, with a plain-English definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlangTerm {
    pub term: String,
    pub definition: String,
}

/// An advanced (IELTS Band 7+) vocabulary word used in a joke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyWord {
    pub word: String,
    pub definition: String,
}

/// A generated joke. Immutable once created by the joke source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joke {
    /// Opaque unique identifier, assigned when the joke is generated.
    pub id: String,
    /// The setup.
    pub content: String,
    pub punchline: String,
    /// Explanation of the humour (puns, wordplay, cultural context).
    pub why_its_funny: String,
    pub contains_wordplay: bool,
    pub contains_slang: bool,
    pub slang: Vec<SlangTerm>,
    pub vocabulary: Vec<VocabularyWord>,
    /// Short topic tag, e.g. "Workplace" or "Pub Culture".
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// The single session user. `favorites` holds joke ids in the order they were saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub favorites: Vec<String>,
}

impl User {
    /// A brand new user with nothing saved yet.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            favorites: Vec::new(),
        }
    }

    pub fn has_favorite(&self, joke_id: &str) -> bool {
        self.favorites.iter().any(|id| id == joke_id)
    }

    /// Removes `joke_id` if present, appends it otherwise.
    /// Returns `true` when the joke ends up favorited.
    pub fn toggle_favorite(&mut self, joke_id: &str) -> bool {
        if self.has_favorite(joke_id) {
            self.favorites.retain(|id| id != joke_id);
            false
        } else {
            self.favorites.push(joke_id.to_string());
            true
        }
    }
}

/// The screen the user is on. Mirrors the controller states
/// `LoggedOut`, `ViewingJokes` and `ViewingFavorites`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppView {
    #[default]
    Login,
    Jokes,
    Favorites,
}
