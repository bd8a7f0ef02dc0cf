pub mod quiz;
pub mod session;
/// Session lifecycle machine.
pub mod state_machine;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::session_store::{SessionStore, memory::InMemorySessionStore},
    services::{rate_limit::RateLimiter, rooms::RoomRegistry, session_engine::SessionEngine},
};

/// Handle passed to every route and service.
pub type SharedState = Arc<AppState>;

/// Central application state: store, live connections, limiters and configuration.
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<dyn SessionStore>,
    rooms: Arc<RoomRegistry>,
    engine: SessionEngine,
    socket_limiter: RateLimiter,
    api_limiter: RateLimiter,
}

impl AppState {
    /// Construct a new [`AppState`] backed by the in-memory store.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_store(config, Arc::new(InMemorySessionStore::new()))
    }

    /// Construct a new [`AppState`] on top of an existing store.
    pub fn with_store(config: AppConfig, store: Arc<dyn SessionStore>) -> SharedState {
        let engine = SessionEngine::new(store.clone(), config.transition_timeout);
        Arc::new(Self {
            socket_limiter: RateLimiter::new(config.socket_rate_limit),
            api_limiter: RateLimiter::new(config.api_rate_limit),
            config: Arc::new(config),
            store,
            rooms: Arc::new(RoomRegistry::new()),
            engine,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Quiz and session storage.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Registry of realtime connections grouped by session.
    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// Engine applying realtime events to sessions.
    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// Budget applied per realtime connection.
    pub fn socket_limiter(&self) -> &RateLimiter {
        &self.socket_limiter
    }

    /// Budget applied per REST caller.
    pub fn api_limiter(&self) -> &RateLimiter {
        &self.api_limiter
    }
}
