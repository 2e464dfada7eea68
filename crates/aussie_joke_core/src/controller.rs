//! crates/aussie_joke_core/src/controller.rs
//!
//! The application state controller. It owns the in-memory session context
//! (user, view, current joke, favorites, loading and error flags) and mediates
//! between the UI boundary and the storage and joke-generation ports.

use crate::domain::{AppView, Joke, User};
use crate::ports::{JokeGenerationService, PortError, PortResult, StorageService};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Message shown to the user when a joke could not be fetched.
pub const FETCH_ERROR_MESSAGE: &str =
    "Failed to fetch a joke. The emus might have chewed the cables.";

/// What a call to [`AppController::request_new_joke`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A new joke replaced the current one.
    Loaded,
    /// The joke source failed; the error message is set and the old joke kept.
    Failed,
    /// Another fetch was already in flight, so this request was dropped.
    AlreadyLoading,
    /// Nobody is logged in.
    NoSession,
    /// The session changed while the fetch was in flight; the result was thrown away.
    Discarded,
}

//=========================================================================================
// Session Context
//=========================================================================================

#[derive(Debug, Default)]
struct SessionContext {
    user: Option<User>,
    view: AppView,
    current_joke: Option<Joke>,
    favorites: Vec<Joke>,
    loading: bool,
    error: Option<String>,
    /// Bumped on every login and logout so late fetch completions can be recognised.
    epoch: u64,
}

impl SessionContext {
    fn needs_auto_load(&self) -> bool {
        self.user.is_some()
            && self.view == AppView::Jokes
            && self.current_joke.is_none()
            && !self.loading
    }

    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            user: self.user.clone(),
            view: self.view,
            current_joke: self.current_joke.clone(),
            favorites: self.favorites.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

/// A read-only copy of the controller state, handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub user: Option<User>,
    pub view: AppView,
    pub current_joke: Option<Joke>,
    pub favorites: Vec<Joke>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ControllerSnapshot {
    /// Whether the joke on screen is in the user's favorites (the filled heart).
    pub fn current_is_favorite(&self) -> bool {
        match (&self.user, &self.current_joke) {
            (Some(user), Some(joke)) => user.has_favorite(&joke.id),
            _ => false,
        }
    }

    pub fn favorites_count(&self) -> usize {
        self.favorites.len()
    }
}

//=========================================================================================
// AppController
//=========================================================================================

/// Drives the `LoggedOut -> ViewingJokes <-> ViewingFavorites` state machine.
pub struct AppController {
    storage: Arc<dyn StorageService>,
    jokes: Arc<dyn JokeGenerationService>,
    session: Mutex<SessionContext>,
}

impl AppController {
    /// Creates a controller and restores any persisted session.
    ///
    /// A restored user lands on the jokes view with their favorites loaded.
    /// No joke is fetched here; see [`AppController::start`].
    pub fn new(
        storage: Arc<dyn StorageService>,
        jokes: Arc<dyn JokeGenerationService>,
    ) -> PortResult<Self> {
        let mut session = SessionContext::default();
        if let Some(user) = storage.current_user()? {
            info!("Restored session for user '{}'", user.username);
            session.favorites = storage.favorites()?;
            session.user = Some(user);
            session.view = AppView::Jokes;
        }

        Ok(Self {
            storage,
            jokes,
            session: Mutex::new(session),
        })
    }

    /// Like [`AppController::new`], then applies the auto-load policy so a
    /// restored session has a joke to show.
    pub async fn start(
        storage: Arc<dyn StorageService>,
        jokes: Arc<dyn JokeGenerationService>,
    ) -> PortResult<Self> {
        let controller = Self::new(storage, jokes)?;
        controller.auto_load().await;
        Ok(controller)
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        self.session.lock().await.snapshot()
    }

    // --- Session transitions ---

    /// Logs in as `username` and moves to the jokes view.
    ///
    /// Any stale joke is cleared and a fresh one is fetched before returning.
    pub async fn login(&self, username: &str) -> PortResult<User> {
        let user = {
            let mut session = self.session.lock().await;
            let user = self.storage.login(username)?;

            session.epoch += 1;
            session.user = Some(user.clone());
            session.view = AppView::Jokes;
            session.current_joke = None;
            session.favorites = Vec::new();
            session.loading = false;
            session.error = None;
            session.favorites = self.storage.favorites()?;
            user
        };
        info!(
            "User '{}' logged in with {} favorite(s)",
            user.username,
            user.favorites.len()
        );

        self.auto_load().await;
        Ok(user)
    }

    /// Ends the session. A fetch still in flight will be discarded when it lands.
    pub async fn logout(&self) -> PortResult<()> {
        let mut session = self.session.lock().await;
        self.storage.logout()?;

        let epoch = session.epoch + 1;
        *session = SessionContext {
            epoch,
            ..SessionContext::default()
        };
        info!("User logged out");
        Ok(())
    }

    /// Switches between the jokes and favorites views.
    ///
    /// Requires an active user. `AppView::Login` cannot be selected; use
    /// [`AppController::logout`] instead.
    pub async fn select_view(&self, view: AppView) -> PortResult<()> {
        {
            let mut session = self.session.lock().await;
            if view == AppView::Login {
                return Err(PortError::InvalidTransition(
                    "the login view is only reachable by logging out".to_string(),
                ));
            }
            if session.user.is_none() {
                return Err(PortError::NoSession);
            }
            session.view = view;
        }
        debug!("Selected view {:?}", view);

        if view == AppView::Jokes {
            self.auto_load().await;
        }
        Ok(())
    }

    // --- Jokes ---

    /// Fetches a new joke from the joke source.
    ///
    /// At most one fetch is in flight per session: a call made while loading
    /// is dropped. The session lock is not held while waiting on the joke
    /// source. Dropping the returned future mid-fetch leaves the loading flag
    /// set, so callers that may be cancelled should run it on its own task.
    pub async fn request_new_joke(&self) -> FetchOutcome {
        let epoch = {
            let mut session = self.session.lock().await;
            if session.user.is_none() {
                return FetchOutcome::NoSession;
            }
            if session.loading {
                debug!("Joke fetch already in flight, ignoring request");
                return FetchOutcome::AlreadyLoading;
            }
            session.loading = true;
            session.error = None;
            session.epoch
        };

        let result = self.jokes.generate_joke().await;

        let mut session = self.session.lock().await;
        if session.epoch != epoch {
            warn!("Session changed while fetching a joke, discarding the result");
            return FetchOutcome::Discarded;
        }
        session.loading = false;

        match result {
            Ok(joke) => {
                info!("Fetched joke {} ({})", joke.id, joke.category);
                session.current_joke = Some(joke);
                session.error = None;
                FetchOutcome::Loaded
            }
            Err(e) => {
                error!("Failed to fetch a joke: {:?}", e);
                session.error = Some(FETCH_ERROR_MESSAGE.to_string());
                FetchOutcome::Failed
            }
        }
    }

    async fn auto_load(&self) {
        let should_fetch = self.session.lock().await.needs_auto_load();
        if should_fetch {
            self.request_new_joke().await;
        }
    }

    // --- Favorites ---

    /// Toggles the joke on screen in or out of the favorites.
    ///
    /// Returns `Ok(None)` without touching storage when there is no current
    /// joke or no active user.
    pub async fn favorite_current(&self) -> PortResult<Option<User>> {
        let mut session = self.session.lock().await;
        let Some(joke) = session.current_joke.clone() else {
            return Ok(None);
        };
        if session.user.is_none() {
            return Ok(None);
        }
        self.apply_toggle(&mut session, &joke).map(Some)
    }

    /// Removes `joke` from the favorites.
    ///
    /// This is the same toggle as [`AppController::favorite_current`]: the
    /// caller must pass a joke that is currently favorited, otherwise it is
    /// added back instead. [`AppController::unfavorite_by_id`] checks this.
    pub async fn unfavorite(&self, joke: &Joke) -> PortResult<Option<User>> {
        let mut session = self.session.lock().await;
        if session.user.is_none() {
            return Ok(None);
        }
        self.apply_toggle(&mut session, joke).map(Some)
    }

    /// Removes the favorited joke with `joke_id`.
    ///
    /// Fails with `PortError::NotFound` if the id is not in the favorites list.
    pub async fn unfavorite_by_id(&self, joke_id: &str) -> PortResult<User> {
        let mut session = self.session.lock().await;
        if session.user.is_none() {
            return Err(PortError::NoSession);
        }
        let joke = session
            .favorites
            .iter()
            .find(|joke| joke.id == joke_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Favorite joke {} not found", joke_id)))?;
        self.apply_toggle(&mut session, &joke)
    }

    fn apply_toggle(&self, session: &mut SessionContext, joke: &Joke) -> PortResult<User> {
        let user = self.storage.toggle_favorite(joke)?;
        session.user = Some(user.clone());
        info!(
            "Joke {} is {} favorited",
            joke.id,
            if user.has_favorite(&joke.id) { "now" } else { "no longer" }
        );
        session.favorites = self.storage.favorites()?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Mirrors the storage semantics without any serialization.
    #[derive(Default)]
    struct FakeStorage {
        user: std::sync::Mutex<Option<User>>,
        library: std::sync::Mutex<HashMap<String, Joke>>,
        fail_favorites: AtomicBool,
    }

    impl StorageService for FakeStorage {
        fn login(&self, username: &str) -> PortResult<User> {
            let mut stored = self.user.lock().unwrap();
            match stored.as_ref() {
                Some(user) if user.username == username => Ok(user.clone()),
                _ => {
                    let user = User::new(username);
                    *stored = Some(user.clone());
                    Ok(user)
                }
            }
        }

        fn current_user(&self) -> PortResult<Option<User>> {
            Ok(self.user.lock().unwrap().clone())
        }

        fn logout(&self) -> PortResult<()> {
            *self.user.lock().unwrap() = None;
            Ok(())
        }

        fn toggle_favorite(&self, joke: &Joke) -> PortResult<User> {
            let mut stored = self.user.lock().unwrap();
            let user = stored.as_mut().ok_or(PortError::NoSession)?;
            self.library
                .lock()
                .unwrap()
                .insert(joke.id.clone(), joke.clone());
            user.toggle_favorite(&joke.id);
            Ok(user.clone())
        }

        fn favorites(&self) -> PortResult<Vec<Joke>> {
            if self.fail_favorites.load(Ordering::SeqCst) {
                return Err(PortError::Storage("library unreadable".to_string()));
            }
            let stored = self.user.lock().unwrap();
            let library = self.library.lock().unwrap();
            Ok(stored
                .as_ref()
                .map(|user| {
                    user.favorites
                        .iter()
                        .filter_map(|id| library.get(id).cloned())
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    /// Hands out queued results. With `gated`, each call waits for `release`.
    #[derive(Default)]
    struct ScriptedJokes {
        results: std::sync::Mutex<VecDeque<PortResult<Joke>>>,
        calls: AtomicUsize,
        gated: bool,
        entered: Notify,
        release: Notify,
    }

    impl ScriptedJokes {
        fn with(results: Vec<PortResult<Joke>>) -> Arc<Self> {
            Arc::new(Self {
                results: std::sync::Mutex::new(results.into()),
                ..Default::default()
            })
        }

        fn gated(results: Vec<PortResult<Joke>>) -> Arc<Self> {
            Arc::new(Self {
                results: std::sync::Mutex::new(results.into()),
                gated: true,
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JokeGenerationService for ScriptedJokes {
        async fn generate_joke(&self) -> PortResult<Joke> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.gated {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PortError::Generation("script exhausted".to_string())))
        }
    }

    fn joke(id: &str) -> Joke {
        Joke {
            id: id.to_string(),
            content: format!("Setup {}", id),
            punchline: format!("Punchline {}", id),
            why_its_funny: "It's a pun, mate.".to_string(),
            contains_wordplay: true,
            contains_slang: false,
            slang: Vec::new(),
            vocabulary: Vec::new(),
            category: "Pub Culture".to_string(),
            created_at: Utc::now(),
        }
    }

    fn ids(jokes: &[Joke]) -> Vec<&str> {
        jokes.iter().map(|j| j.id.as_str()).collect()
    }

    #[tokio::test]
    async fn walkthrough_login_favorite_unfavorite_logout() {
        let storage = Arc::new(FakeStorage::default());
        let jokes = ScriptedJokes::with(vec![Ok(joke("a1")), Ok(joke("a2"))]);
        let controller = AppController::new(storage.clone(), jokes.clone()).unwrap();

        // Logging in auto-loads the first joke.
        let user = controller.login("Jack").await.unwrap();
        assert!(user.favorites.is_empty());
        let snap = controller.snapshot().await;
        assert_eq!(snap.view, AppView::Jokes);
        assert_eq!(snap.current_joke.as_ref().unwrap().id, "a1");

        let user = controller.favorite_current().await.unwrap().unwrap();
        assert_eq!(user.favorites, vec!["a1"]);
        assert!(controller.snapshot().await.current_is_favorite());

        assert_eq!(controller.request_new_joke().await, FetchOutcome::Loaded);
        let snap = controller.snapshot().await;
        assert_eq!(snap.current_joke.as_ref().unwrap().id, "a2");
        assert_eq!(snap.user.as_ref().unwrap().favorites, vec!["a1"]);
        assert!(!snap.current_is_favorite());

        let user = controller.favorite_current().await.unwrap().unwrap();
        assert_eq!(user.favorites, vec!["a1", "a2"]);

        let user = controller.unfavorite(&joke("a1")).await.unwrap().unwrap();
        assert_eq!(user.favorites, vec!["a2"]);
        assert!(storage.library.lock().unwrap().contains_key("a1"));
        assert_eq!(ids(&controller.snapshot().await.favorites), vec!["a2"]);

        controller.logout().await.unwrap();
        let snap = controller.snapshot().await;
        assert_eq!(snap.view, AppView::Login);
        assert!(snap.user.is_none());
        assert!(snap.current_joke.is_none());
        assert!(snap.favorites.is_empty());
        assert!(storage.current_user().unwrap().is_none());
        assert!(storage.favorites().unwrap().is_empty());
        assert_eq!(jokes.calls(), 2);
    }

    #[tokio::test]
    async fn second_request_while_loading_is_dropped() {
        let storage = Arc::new(FakeStorage::default());
        storage.login("Jack").unwrap();
        let jokes = ScriptedJokes::gated(vec![Ok(joke("a1"))]);
        let controller = Arc::new(AppController::new(storage, jokes.clone()).unwrap());

        let in_flight = tokio::spawn({
            let controller = controller.clone();
            async move { controller.request_new_joke().await }
        });
        jokes.entered.notified().await;

        assert!(controller.snapshot().await.loading);
        assert_eq!(
            controller.request_new_joke().await,
            FetchOutcome::AlreadyLoading
        );
        assert_eq!(jokes.calls(), 1);

        jokes.release.notify_one();
        assert_eq!(in_flight.await.unwrap(), FetchOutcome::Loaded);

        let snap = controller.snapshot().await;
        assert!(!snap.loading);
        assert_eq!(snap.current_joke.unwrap().id, "a1");
        assert_eq!(jokes.calls(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_joke_and_sets_error() {
        let storage = Arc::new(FakeStorage::default());
        let jokes = ScriptedJokes::with(vec![
            Ok(joke("a1")),
            Err(PortError::Generation("not json".to_string())),
            Ok(joke("a2")),
        ]);
        let controller = AppController::new(storage, jokes).unwrap();
        controller.login("Jack").await.unwrap();

        assert_eq!(controller.request_new_joke().await, FetchOutcome::Failed);
        let snap = controller.snapshot().await;
        assert_eq!(snap.current_joke.as_ref().unwrap().id, "a1");
        assert_eq!(snap.error.as_deref(), Some(FETCH_ERROR_MESSAGE));
        assert!(!snap.loading);

        // The next successful fetch clears the message.
        assert_eq!(controller.request_new_joke().await, FetchOutcome::Loaded);
        let snap = controller.snapshot().await;
        assert_eq!(snap.current_joke.unwrap().id, "a2");
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn failed_auto_load_on_login_leaves_no_joke() {
        let storage = Arc::new(FakeStorage::default());
        let jokes = ScriptedJokes::with(vec![Err(PortError::Generation("empty".to_string()))]);
        let controller = AppController::new(storage, jokes).unwrap();

        controller.login("Jack").await.unwrap();
        let snap = controller.snapshot().await;
        assert!(snap.current_joke.is_none());
        assert!(snap.error.is_some());
        assert!(!snap.loading);
    }

    #[tokio::test]
    async fn fetch_completing_after_logout_is_discarded() {
        let storage = Arc::new(FakeStorage::default());
        storage.login("Jack").unwrap();
        let jokes = ScriptedJokes::gated(vec![Ok(joke("late"))]);
        let controller = Arc::new(AppController::new(storage, jokes.clone()).unwrap());

        let in_flight = tokio::spawn({
            let controller = controller.clone();
            async move { controller.request_new_joke().await }
        });
        jokes.entered.notified().await;

        controller.logout().await.unwrap();
        jokes.release.notify_one();
        assert_eq!(in_flight.await.unwrap(), FetchOutcome::Discarded);

        let snap = controller.snapshot().await;
        assert!(snap.current_joke.is_none());
        assert!(snap.user.is_none());
        assert!(!snap.loading);
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn fetch_from_previous_session_is_discarded_after_relogin() {
        let storage = Arc::new(FakeStorage::default());
        storage.login("Jack").unwrap();
        let jokes = ScriptedJokes::gated(vec![Ok(joke("j1")), Ok(joke("j2"))]);
        let controller = Arc::new(AppController::new(storage, jokes.clone()).unwrap());

        let stale = tokio::spawn({
            let controller = controller.clone();
            async move { controller.request_new_joke().await }
        });
        jokes.entered.notified().await;

        controller.logout().await.unwrap();
        let relogin = tokio::spawn({
            let controller = controller.clone();
            async move { controller.login("Sheila").await }
        });
        // The new session's auto-load is now in flight alongside the stale fetch.
        jokes.entered.notified().await;
        assert!(controller.snapshot().await.loading);

        jokes.release.notify_waiters();
        assert_eq!(stale.await.unwrap(), FetchOutcome::Discarded);
        assert_eq!(relogin.await.unwrap().unwrap().username, "Sheila");

        let snap = controller.snapshot().await;
        assert_eq!(snap.user.unwrap().username, "Sheila");
        assert_eq!(snap.view, AppView::Jokes);
        assert!(snap.current_joke.is_some());
        assert!(!snap.loading);
        assert!(snap.error.is_none());
        assert_eq!(jokes.calls(), 2);
    }

    #[tokio::test]
    async fn session_user_follows_storage_when_favorites_reload_fails() {
        let storage = Arc::new(FakeStorage::default());
        let jokes = ScriptedJokes::with(vec![Ok(joke("a1"))]);
        let controller = AppController::new(storage.clone(), jokes).unwrap();
        controller.login("Jack").await.unwrap();

        storage.fail_favorites.store(true, Ordering::SeqCst);
        assert!(matches!(
            controller.favorite_current().await,
            Err(PortError::Storage(_))
        ));
        let snap = controller.snapshot().await;
        assert_eq!(snap.user, storage.current_user().unwrap());
        assert_eq!(snap.user.unwrap().favorites, vec!["a1"]);

        assert!(controller.login("Sheila").await.is_err());
        let snap = controller.snapshot().await;
        assert_eq!(snap.user, storage.current_user().unwrap());
        assert_eq!(snap.user.unwrap().username, "Sheila");
        assert!(snap.current_joke.is_none());
    }

    #[tokio::test]
    async fn request_without_session_does_nothing() {
        let storage = Arc::new(FakeStorage::default());
        let jokes = ScriptedJokes::with(vec![Ok(joke("a1"))]);
        let controller = AppController::new(storage, jokes.clone()).unwrap();

        assert_eq!(controller.request_new_joke().await, FetchOutcome::NoSession);
        assert_eq!(jokes.calls(), 0);
        assert!(controller.favorite_current().await.unwrap().is_none());
        assert!(controller.unfavorite(&joke("a1")).await.unwrap().is_none());
        assert!(matches!(
            controller.unfavorite_by_id("a1").await,
            Err(PortError::NoSession)
        ));
    }

    #[tokio::test]
    async fn view_navigation_rules() {
        let storage = Arc::new(FakeStorage::default());
        let jokes = ScriptedJokes::with(vec![Ok(joke("a1"))]);
        let controller = AppController::new(storage, jokes.clone()).unwrap();

        assert!(matches!(
            controller.select_view(AppView::Favorites).await,
            Err(PortError::NoSession)
        ));

        controller.login("Jack").await.unwrap();
        assert!(matches!(
            controller.select_view(AppView::Login).await,
            Err(PortError::InvalidTransition(_))
        ));

        controller.select_view(AppView::Favorites).await.unwrap();
        assert_eq!(controller.snapshot().await.view, AppView::Favorites);

        // A joke is already held, so coming back does not fetch again.
        controller.select_view(AppView::Jokes).await.unwrap();
        assert_eq!(controller.snapshot().await.view, AppView::Jokes);
        assert_eq!(jokes.calls(), 1);
    }

    #[tokio::test]
    async fn restored_session_starts_on_jokes_view() {
        let storage = Arc::new(FakeStorage::default());
        storage.login("Sheila").unwrap();
        storage.toggle_favorite(&joke("old")).unwrap();

        let jokes = ScriptedJokes::with(vec![Ok(joke("fresh"))]);
        let controller = AppController::new(storage.clone(), jokes.clone()).unwrap();
        let snap = controller.snapshot().await;
        assert_eq!(snap.view, AppView::Jokes);
        assert_eq!(snap.user.unwrap().username, "Sheila");
        assert_eq!(ids(&snap.favorites), vec!["old"]);
        assert_eq!(jokes.calls(), 0);

        let controller = AppController::start(storage, jokes.clone()).await.unwrap();
        assert_eq!(
            controller.snapshot().await.current_joke.unwrap().id,
            "fresh"
        );
        assert_eq!(jokes.calls(), 1);
    }

    #[tokio::test]
    async fn unfavorite_by_id_requires_a_favorited_joke() {
        let storage = Arc::new(FakeStorage::default());
        let jokes = ScriptedJokes::with(vec![Ok(joke("a1"))]);
        let controller = AppController::new(storage, jokes).unwrap();
        controller.login("Jack").await.unwrap();

        assert!(matches!(
            controller.unfavorite_by_id("a1").await,
            Err(PortError::NotFound(_))
        ));

        controller.favorite_current().await.unwrap();
        let user = controller.unfavorite_by_id("a1").await.unwrap();
        assert!(user.favorites.is_empty());
        assert_eq!(controller.snapshot().await.favorites_count(), 0);
    }
}
