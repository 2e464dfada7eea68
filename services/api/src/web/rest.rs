//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification. Each handler maps one UI event
//! onto the application controller and answers with the resulting state.

use crate::web::{
    protocol::{
        FetchResponse, FetchStatus, JokeResponse, LoginRequest, SelectViewRequest,
        SessionResponse, SlangTermResponse, UserResponse, View, VocabularyWordResponse,
    },
    state::AppState,
};
use aussie_joke_core::ports::PortError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_session_handler,
        login_handler,
        logout_handler,
        select_view_handler,
        next_joke_handler,
        list_favorites_handler,
        favorite_current_handler,
        unfavorite_handler,
    ),
    components(
        schemas(
            LoginRequest, SelectViewRequest, View, SessionResponse, UserResponse,
            JokeResponse, SlangTermResponse, VocabularyWordResponse, FetchResponse,
            FetchStatus
        )
    ),
    tags(
        (name = "Aussie Joke Mate API", description = "Session, joke and favorites endpoints for the joke companion.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// All API routes. The caller supplies the state and any outer layers.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(get_session_handler))
        .route("/session/login", post(login_handler))
        .route("/session/logout", post(logout_handler))
        .route("/session/view", put(select_view_handler))
        .route("/jokes/next", post(next_joke_handler))
        .route("/favorites", get(list_favorites_handler))
        .route("/favorites/current", post(favorite_current_handler))
        .route("/favorites/{joke_id}", delete(unfavorite_handler))
}

//=========================================================================================
// Helpers
//=========================================================================================

type HandlerError = (StatusCode, String);

fn port_error_response(e: PortError) -> HandlerError {
    let status = match &e {
        PortError::NoSession => StatusCode::UNAUTHORIZED,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {:?}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    (status, e.to_string())
}

/// Runs a controller call that may fetch a joke on its own task, so a client
/// disconnect cannot abandon the fetch halfway and leave the loading flag set.
async fn run_detached<F, T>(task: F) -> Result<T, HandlerError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task).await.map_err(|e| {
        error!("Controller task failed: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Controller task failed".to_string(),
        )
    })
}

async fn session_json(app_state: &AppState) -> Json<SessionResponse> {
    Json(app_state.controller.snapshot().await.into())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Current session state.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "The current session state", body = SessionResponse)
    )
)]
pub async fn get_session_handler(State(app_state): State<Arc<AppState>>) -> Json<SessionResponse> {
    session_json(&app_state).await
}

/// Log in and move to the jokes view.
///
/// Logging in under a different name replaces the stored session. A joke is
/// fetched before the response is sent.
#[utoipa::path(
    post,
    path = "/session/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 400, description = "Blank username"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, HandlerError> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "username must not be blank".to_string(),
        ));
    }

    let controller = app_state.controller.clone();
    run_detached(async move { controller.login(&username).await })
        .await?
        .map_err(port_error_response)?;
    Ok(session_json(&app_state).await)
}

/// End the session.
#[utoipa::path(
    post,
    path = "/session/logout",
    responses(
        (status = 200, description = "Logged out", body = SessionResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn logout_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, HandlerError> {
    app_state
        .controller
        .logout()
        .await
        .map_err(port_error_response)?;
    Ok(session_json(&app_state).await)
}

/// Switch between the jokes and favorites views.
#[utoipa::path(
    put,
    path = "/session/view",
    request_body = SelectViewRequest,
    responses(
        (status = 200, description = "View changed", body = SessionResponse),
        (status = 400, description = "The login view cannot be selected"),
        (status = 401, description = "No active session")
    )
)]
pub async fn select_view_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SelectViewRequest>,
) -> Result<Json<SessionResponse>, HandlerError> {
    let controller = app_state.controller.clone();
    run_detached(async move { controller.select_view(req.view.into()).await })
        .await?
        .map_err(port_error_response)?;
    Ok(session_json(&app_state).await)
}

/// Fetch a new joke.
///
/// A request made while another fetch is in flight is dropped and reported as
/// `already_loading`.
#[utoipa::path(
    post,
    path = "/jokes/next",
    responses(
        (status = 200, description = "Fetch finished (see status)", body = FetchResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn next_joke_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<FetchResponse>, HandlerError> {
    let controller = app_state.controller.clone();
    let outcome = run_detached(async move { controller.request_new_joke().await }).await?;
    let Json(session) = session_json(&app_state).await;
    Ok(Json(FetchResponse {
        status: outcome.into(),
        session,
    }))
}

/// The saved jokes, in the order they were saved.
#[utoipa::path(
    get,
    path = "/favorites",
    responses(
        (status = 200, description = "Favorite jokes", body = [JokeResponse])
    )
)]
pub async fn list_favorites_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<JokeResponse>> {
    let snapshot = app_state.controller.snapshot().await;
    Json(snapshot.favorites.into_iter().map(JokeResponse::from).collect())
}

/// Save the current joke, or remove it if it is already saved.
#[utoipa::path(
    post,
    path = "/favorites/current",
    responses(
        (status = 200, description = "Favorites updated (unchanged if there is no current joke)", body = SessionResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn favorite_current_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, HandlerError> {
    app_state
        .controller
        .favorite_current()
        .await
        .map_err(port_error_response)?;
    Ok(session_json(&app_state).await)
}

/// Remove a saved joke.
#[utoipa::path(
    delete,
    path = "/favorites/{joke_id}",
    params(
        ("joke_id" = String, Path, description = "Id of a currently saved joke.")
    ),
    responses(
        (status = 200, description = "Removed from favorites", body = SessionResponse),
        (status = 401, description = "No active session"),
        (status = 404, description = "The joke is not a favorite")
    )
)]
pub async fn unfavorite_handler(
    State(app_state): State<Arc<AppState>>,
    Path(joke_id): Path<String>,
) -> Result<Json<SessionResponse>, HandlerError> {
    app_state
        .controller
        .unfavorite_by_id(&joke_id)
        .await
        .map_err(port_error_response)?;
    Ok(session_json(&app_state).await)
}
