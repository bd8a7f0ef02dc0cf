use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        session::{CreateSessionRequest, DemoPlayerRequest, SessionLookup, SessionQuery},
        ws::{PlayerSnapshot, SessionSnapshot},
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes handling session creation, lookup and the demo player shortcut.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", get(find_sessions).post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/demo/players", post(add_demo_player))
}

/// Open a session for a quiz.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionSnapshot),
        (status = 404, description = "Unknown quiz"),
        (status = 409, description = "No free join code")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let session = session_service::create_session(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Resolve a join code, or list every session when none is given.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    params(SessionQuery),
    responses(
        (status = 200, description = "Session owning the code, or every session", body = SessionLookup),
        (status = 400, description = "Malformed join code"),
        (status = 404, description = "No session uses this code")
    )
)]
pub async fn find_sessions(
    State(state): State<SharedState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionLookup>, AppError> {
    Ok(Json(session_service::find_sessions(&state, query).await?))
}

/// Fetch a session snapshot.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session found", body = SessionSnapshot),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(session_service::get_session(&state, id).await?))
}

/// Add a player to a session without opening a socket.
#[utoipa::path(
    post,
    path = "/demo/players",
    tag = "demo",
    request_body = DemoPlayerRequest,
    responses(
        (status = 201, description = "Player added", body = PlayerSnapshot),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Session has ended")
    )
)]
pub async fn add_demo_player(
    State(state): State<SharedState>,
    Json(payload): Json<DemoPlayerRequest>,
) -> Result<(StatusCode, Json<PlayerSnapshot>), AppError> {
    let player = session_service::add_demo_player(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(player)))
}
