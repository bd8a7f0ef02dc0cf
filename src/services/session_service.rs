use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::storage::StorageError,
    dto::{
        session::{CreateSessionRequest, DemoPlayerRequest, SessionLookup, SessionQuery},
        ws::{PlayerSnapshot, SessionSnapshot},
    },
    error::ServiceError,
    services::join_code,
    state::{
        SharedState,
        session::{PrizeMode, Session},
    },
};

const ANONYMOUS_HOST: &str = "anonymous";

/// Open a waiting session for an existing quiz under a fresh join code.
///
/// Join code collisions with live sessions are retried up to the configured number of draws.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionSnapshot, ServiceError> {
    request.validate()?;
    let quiz = state.store().require_quiz(request.quiz_id).await?;

    let host_id = request
        .host_id
        .unwrap_or_else(|| ANONYMOUS_HOST.to_string());
    let prize_mode = request.prize_mode.unwrap_or(PrizeMode::None);
    let attempts = state.config().join_code_attempts;
    let mut last_code = String::new();

    for attempt in 1..=attempts {
        let session = Session::new(quiz.id, join_code::generate(), host_id.clone(), prize_mode);
        let snapshot = SessionSnapshot::from(&session);

        match state.store().insert_session(session).await {
            Ok(()) => {
                info!(
                    session_id = %snapshot.id,
                    quiz_id = %quiz.id,
                    join_code = %snapshot.join_code,
                    "session created"
                );
                return Ok(snapshot);
            }
            Err(StorageError::JoinCodeTaken(code)) => {
                warn!(attempt, join_code = %code, "join code collision; drawing another");
                last_code = code;
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(attempts, "no free join code left");
    Err(ServiceError::Unavailable(StorageError::JoinCodeTaken(
        last_code,
    )))
}

/// Fetch a session snapshot by identifier.
pub async fn get_session(state: &SharedState, id: Uuid) -> Result<SessionSnapshot, ServiceError> {
    let session = state.store().require(id).await?;
    Ok(SessionSnapshot::from(&session))
}

/// Answer `GET /sessions`: the session owning the join code, or every session without one.
pub async fn find_sessions(
    state: &SharedState,
    query: SessionQuery,
) -> Result<SessionLookup, ServiceError> {
    query.validate()?;
    match query.join_code {
        Some(code) => find_by_join_code(state, &code).await.map(SessionLookup::One),
        None => list_sessions(state).await.map(SessionLookup::All),
    }
}

/// Resolve a join code into the session it belongs to.
pub async fn find_by_join_code(
    state: &SharedState,
    code: &str,
) -> Result<SessionSnapshot, ServiceError> {
    let code = join_code::normalize(code);

    state
        .store()
        .get_by_join_code(code.clone())
        .await?
        .map(|session| SessionSnapshot::from(&session))
        .ok_or_else(|| ServiceError::NotFound(format!("no session with join code `{code}`")))
}

/// Snapshots of every session, oldest first.
pub async fn list_sessions(state: &SharedState) -> Result<Vec<SessionSnapshot>, ServiceError> {
    let sessions = state.store().list_sessions().await?;
    Ok(sessions.iter().map(SessionSnapshot::from).collect())
}

/// Add a player without a realtime connection.
///
/// Nothing is broadcast: connected clients see the player in the next snapshot they receive.
pub async fn add_demo_player(
    state: &SharedState,
    request: DemoPlayerRequest,
) -> Result<PlayerSnapshot, ServiceError> {
    request.validate()?;
    let name = request.player_name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("player name is required".into()));
    }

    let player = state
        .store()
        .create_player(request.session_id, name.to_string())
        .await?;
    info!(session_id = %request.session_id, player_id = %player.id, "demo player added");
    Ok(PlayerSnapshot::from(&player))
}
