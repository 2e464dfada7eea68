//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the front end and the API server.
//! Field names are camelCase to match the browser client.

use aussie_joke_core::{
    AppView, ControllerSnapshot, FetchOutcome, Joke, SlangTerm, User, VocabularyWord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Requests Sent FROM the Client
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Any non-blank name. Surrounding whitespace is trimmed.
    pub username: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectViewRequest {
    pub view: View,
}

//=========================================================================================
// Responses Sent FROM the Server
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Login,
    Jokes,
    Favorites,
}

impl From<AppView> for View {
    fn from(view: AppView) -> Self {
        match view {
            AppView::Login => View::Login,
            AppView::Jokes => View::Jokes,
            AppView::Favorites => View::Favorites,
        }
    }
}

impl From<View> for AppView {
    fn from(view: View) -> Self {
        match view {
            View::Login => AppView::Login,
            View::Jokes => AppView::Jokes,
            View::Favorites => AppView::Favorites,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SlangTermResponse {
    pub term: String,
    pub definition: String,
}

#[derive(Serialize, ToSchema)]
pub struct VocabularyWordResponse {
    pub word: String,
    pub definition: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JokeResponse {
    pub id: String,
    pub content: String,
    pub punchline: String,
    pub why_its_funny: String,
    pub contains_wordplay: bool,
    pub contains_slang: bool,
    pub slang: Vec<SlangTermResponse>,
    pub vocabulary: Vec<VocabularyWordResponse>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl From<Joke> for JokeResponse {
    fn from(joke: Joke) -> Self {
        Self {
            id: joke.id,
            content: joke.content,
            punchline: joke.punchline,
            why_its_funny: joke.why_its_funny,
            contains_wordplay: joke.contains_wordplay,
            contains_slang: joke.contains_slang,
            slang: joke
                .slang
                .into_iter()
                .map(|SlangTerm { term, definition }| SlangTermResponse { term, definition })
                .collect(),
            vocabulary: joke
                .vocabulary
                .into_iter()
                .map(|VocabularyWord { word, definition }| VocabularyWordResponse {
                    word,
                    definition,
                })
                .collect(),
            category: joke.category,
            created_at: joke.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub username: String,
    /// Favorited joke ids, in the order they were saved.
    pub favorites: Vec<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            favorites: user.favorites,
        }
    }
}

/// Everything the front end needs to render the current screen.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: Option<UserResponse>,
    pub view: View,
    pub current_joke: Option<JokeResponse>,
    /// Whether the current joke is saved (drives the heart icon).
    pub current_is_favorite: bool,
    pub favorites: Vec<JokeResponse>,
    pub favorites_count: usize,
    pub loading: bool,
    pub error: Option<String>,
}

impl From<ControllerSnapshot> for SessionResponse {
    fn from(snapshot: ControllerSnapshot) -> Self {
        let current_is_favorite = snapshot.current_is_favorite();
        let favorites_count = snapshot.favorites_count();
        Self {
            user: snapshot.user.map(UserResponse::from),
            view: snapshot.view.into(),
            current_joke: snapshot.current_joke.map(JokeResponse::from),
            current_is_favorite,
            favorites: snapshot.favorites.into_iter().map(JokeResponse::from).collect(),
            favorites_count,
            loading: snapshot.loading,
            error: snapshot.error,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Loaded,
    Failed,
    AlreadyLoading,
    NoSession,
    Discarded,
}

impl From<FetchOutcome> for FetchStatus {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Loaded => FetchStatus::Loaded,
            FetchOutcome::Failed => FetchStatus::Failed,
            FetchOutcome::AlreadyLoading => FetchStatus::AlreadyLoading,
            FetchOutcome::NoSession => FetchStatus::NoSession,
            FetchOutcome::Discarded => FetchStatus::Discarded,
        }
    }
}

/// The response to a new-joke request: what happened, and the resulting state.
#[derive(Serialize, ToSchema)]
pub struct FetchResponse {
    pub status: FetchStatus,
    pub session: SessionResponse,
}
