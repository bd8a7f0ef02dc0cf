use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{SessionGuard, SessionStore, StoreCounts};
use crate::{
    dao::storage::{StorageError, StorageResult},
    state::{quiz::Quiz, session::Session, state_machine::SessionStatus},
};

/// Process-memory store; every session sits behind its own async mutex.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    quizzes: DashMap<Uuid, Arc<Quiz>>,
    sessions: DashMap<Uuid, Arc<Mutex<Session>>>,
    /// Lowercase join code -> session id.
    join_codes: DashMap<String, Uuid>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn session_cell(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.inner.sessions.get(&id).map(|entry| entry.value().clone())
    }

    async fn insert_session(&self, session: Session) -> StorageResult<()> {
        let code = session.join_code.to_lowercase();

        if self.inner.sessions.contains_key(&session.id) {
            return Err(StorageError::Duplicate(session.id.to_string()));
        }

        // Ended sessions release their code for reuse.
        let previous_owner = self.inner.join_codes.get(&code).map(|entry| *entry.value());
        if let Some(owner) = previous_owner {
            let owner_live = match self.session_cell(owner) {
                Some(cell) => cell.lock().await.status() != SessionStatus::Ended,
                None => false,
            };
            if owner_live {
                return Err(StorageError::JoinCodeTaken(code));
            }
        }

        match self.inner.join_codes.entry(code.clone()) {
            Entry::Occupied(mut occupied) => {
                if Some(*occupied.get()) != previous_owner {
                    return Err(StorageError::JoinCodeTaken(code));
                }
                occupied.insert(session.id);
            }
            Entry::Vacant(vacant) => {
                if previous_owner.is_some() {
                    return Err(StorageError::JoinCodeTaken(code));
                }
                vacant.insert(session.id);
            }
        }

        debug!(session_id = %session.id, join_code = %code, "session stored");
        self.inner
            .sessions
            .insert(session.id, Arc::new(Mutex::new(session)));
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StorageResult<Option<Session>> {
        let Some(cell) = self.session_cell(id) else {
            return Ok(None);
        };
        let session = cell.lock().await.clone();
        Ok(Some(session))
    }

    async fn get_by_join_code(&self, code: String) -> StorageResult<Option<Session>> {
        let id = self
            .inner
            .join_codes
            .get(&code.trim().to_lowercase())
            .map(|entry| *entry.value());
        match id {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }

    async fn list_sessions(&self) -> StorageResult<Vec<Session>> {
        // Collect the cells first; awaiting a lock while iterating would pin a shard.
        let cells: Vec<Arc<Mutex<Session>>> = self
            .inner
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut sessions = Vec::with_capacity(cells.len());
        for cell in cells {
            sessions.push(cell.lock().await.clone());
        }
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions)
    }

    async fn lock(&self, id: Uuid) -> StorageResult<Option<SessionGuard>> {
        let Some(cell) = self.session_cell(id) else {
            return Ok(None);
        };
        Ok(Some(cell.lock_owned().await))
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert_quiz(&self, quiz: Quiz) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            match store.inner.quizzes.entry(quiz.id) {
                Entry::Occupied(_) => Err(StorageError::Duplicate(quiz.id.to_string())),
                Entry::Vacant(vacant) => {
                    vacant.insert(Arc::new(quiz));
                    Ok(())
                }
            }
        })
    }

    fn get_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Arc<Quiz>>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.quizzes.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<Arc<Quiz>>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut quizzes: Vec<Arc<Quiz>> = store
                .inner
                .quizzes
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            quizzes.sort_by_key(|quiz| quiz.created_at);
            Ok(quizzes)
        })
    }

    fn insert_session(&self, session: Session) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_session(session).await })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Session>>> {
        let store = self.clone();
        Box::pin(async move { store.get(id).await })
    }

    fn get_by_join_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<Session>>> {
        let store = self.clone();
        Box::pin(async move { store.get_by_join_code(code).await })
    }

    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<Session>>> {
        let store = self.clone();
        Box::pin(async move { store.list_sessions().await })
    }

    fn lock(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionGuard>>> {
        let store = self.clone();
        Box::pin(async move { store.lock(id).await })
    }

    fn counts(&self) -> BoxFuture<'static, StorageResult<StoreCounts>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(StoreCounts {
                quizzes: store.inner.quizzes.len(),
                sessions: store.inner.sessions.len(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        error::ServiceError,
        state::{
            session::PrizeMode,
            state_machine::{SessionEvent, SessionStatus},
        },
    };

    fn store() -> Arc<dyn SessionStore> {
        Arc::new(InMemorySessionStore::new())
    }

    fn session(code: &str) -> Session {
        Session::new(Uuid::new_v4(), code.into(), "host".into(), PrizeMode::None)
    }

    #[tokio::test]
    async fn join_code_lookup_is_case_insensitive() {
        let store = store();
        let session = session("brave-otter");
        let id = session.id;
        store.insert_session(session).await.unwrap();

        let found = store.get_by_join_code("  Brave-OTTER ".into()).await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(id));
        assert!(store.get_by_join_code("calm-otter".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn live_join_code_cannot_be_reused() {
        let store = store();
        store.insert_session(session("wise-lynx")).await.unwrap();

        let err = store.insert_session(session("WISE-lynx")).await.unwrap_err();
        assert!(matches!(err, StorageError::JoinCodeTaken(code) if code == "wise-lynx"));
    }

    #[tokio::test]
    async fn ended_session_releases_its_join_code() {
        let store = store();
        let first = session("keen-hawk");
        let first_id = first.id;
        store.insert_session(first).await.unwrap();

        store
            .mutate(first_id, |session| {
                let plan = session.machine.plan(SessionEvent::End)?;
                session.machine.apply(plan)?;
                Ok(())
            })
            .await
            .unwrap();

        let second = session("keen-hawk");
        let second_id = second.id;
        store.insert_session(second).await.unwrap();

        let found = store.get_by_join_code("keen-hawk".into()).await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(second_id));
        let old = store.get(first_id).await.unwrap().unwrap();
        assert_eq!(old.status(), SessionStatus::Ended);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_session_untouched() {
        let store = store();
        let session = session("bold-bear");
        let id = session.id;
        store.insert_session(session).await.unwrap();

        let result: Result<(), ServiceError> = store
            .mutate(id, |session| {
                session.add_player(Uuid::new_v4(), "Ghost".into());
                Err(ServiceError::InvalidInput("nope".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(store.get(id).await.unwrap().unwrap().players.is_empty());
    }

    #[tokio::test]
    async fn create_player_requires_existing_live_session() {
        let store = store();
        let err = store
            .create_player(Uuid::new_v4(), "Alice".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let session = session("cool-fox");
        let id = session.id;
        store.insert_session(session).await.unwrap();
        let player = store.create_player(id, "Alice".into()).await.unwrap();

        let stored = store.require(id).await.unwrap();
        assert_eq!(stored.players.get(&player.id).map(|p| p.name.as_str()), Some("Alice"));
        assert_eq!(player.session_id, id);
    }

    #[tokio::test]
    async fn concurrent_mutations_do_not_lose_updates() {
        let store = store();
        let session = session("swift-wolf");
        let id = session.id;
        store.insert_session(session).await.unwrap();
        let player = store.create_player(id, "Racer".into()).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .mutate(id, |session| {
                        let entry = session.players.get_mut(&player.id).unwrap();
                        entry.score += 10;
                        Ok(())
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = store.require(id).await.unwrap();
        assert_eq!(stored.players[&player.id].score, 320);
    }

    #[tokio::test]
    async fn lock_blocks_other_writers_of_the_same_session() {
        let store = store();
        let session = session("pure-lion");
        let id = session.id;
        store.insert_session(session).await.unwrap();

        let guard = store.lock_required(id).await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), store.lock_required(id)).await;
        assert!(blocked.is_err());
        drop(guard);
        assert!(store.lock_required(id).await.is_ok());
    }

    #[tokio::test]
    async fn list_sessions_returns_every_session() {
        let store = store();
        assert!(store.list_sessions().await.unwrap().is_empty());

        let first = session("calm-heron");
        let second = session("swift-mole");
        let ids = [first.id, second.id];
        store.insert_session(first).await.unwrap();
        store.insert_session(second).await.unwrap();

        let listed = store.list_sessions().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|session| ids.contains(&session.id)));
        assert!(listed.windows(2).all(|pair| pair[0].created_at <= pair[1].created_at));
    }
}
