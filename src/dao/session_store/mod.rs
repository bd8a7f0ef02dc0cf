/// Process-memory backend.
pub mod memory;

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    dao::storage::StorageResult,
    error::ServiceError,
    state::{
        quiz::Quiz,
        session::{Player, Session},
        state_machine::SessionStatus,
    },
};

/// Exclusive access to one session; other writers of the same session wait until it drops.
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Number of records held by a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    /// Stored quizzes.
    pub quizzes: usize,
    /// Stored sessions, ended ones included.
    pub sessions: usize,
}

/// Abstraction over the persistence layer for quizzes and live sessions.
pub trait SessionStore: Send + Sync {
    /// Store a new quiz.
    fn insert_quiz(&self, quiz: Quiz) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a quiz by identifier.
    fn get_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Arc<Quiz>>>>;
    /// List every stored quiz.
    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<Arc<Quiz>>>>;
    /// Store a new session; fails when its join code is owned by another live session.
    fn insert_session(&self, session: Session) -> BoxFuture<'static, StorageResult<()>>;
    /// Snapshot of a session.
    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Session>>>;
    /// Snapshot of the session owning `code`, compared case-insensitively.
    fn get_by_join_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<Session>>>;
    /// Snapshots of every session, oldest first.
    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<Session>>>;
    /// Acquire the per-session lock.
    fn lock(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionGuard>>>;
    /// Record counts, used by the health check.
    fn counts(&self) -> BoxFuture<'static, StorageResult<StoreCounts>>;
}

/// Run `f` against a copy of `session` and write the copy back only when `f` succeeds.
///
/// Callers hold the session lock, so a failing mutation leaves no trace.
pub fn commit_on_success<T, F>(session: &mut Session, f: F) -> Result<T, ServiceError>
where
    F: FnOnce(&mut Session) -> Result<T, ServiceError>,
{
    let mut scratch = session.clone();
    let value = f(&mut scratch)?;
    *session = scratch;
    Ok(value)
}

impl dyn SessionStore {
    /// Fetch a session, mapping absence to [`ServiceError::NotFound`].
    pub async fn require(&self, id: Uuid) -> Result<Session, ServiceError> {
        self.get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))
    }

    /// Fetch a quiz, mapping absence to [`ServiceError::NotFound`].
    pub async fn require_quiz(&self, id: Uuid) -> Result<Arc<Quiz>, ServiceError> {
        self.get_quiz(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("quiz `{id}` not found")))
    }

    /// Lock a session, mapping absence to [`ServiceError::NotFound`].
    pub async fn lock_required(&self, id: Uuid) -> Result<SessionGuard, ServiceError> {
        self.lock(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))
    }

    /// Apply `f` atomically to one session, see [`commit_on_success`].
    pub async fn mutate<T, F>(&self, id: Uuid, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Session) -> Result<T, ServiceError>,
    {
        let mut guard = self.lock_required(id).await?;
        commit_on_success(&mut guard, f)
    }

    /// Append a new player named `name` to a session that has not ended.
    pub async fn create_player(&self, session_id: Uuid, name: String) -> Result<Player, ServiceError> {
        self.mutate(session_id, |session| {
            if session.status() == SessionStatus::Ended {
                return Err(ServiceError::InvalidTransition(format!(
                    "session `{}` has ended",
                    session.id
                )));
            }
            Ok(session.add_player(Uuid::new_v4(), name))
        })
        .await
    }
}
