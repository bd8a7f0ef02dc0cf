/// OpenAPI document.
pub mod documentation;
/// Health probe.
pub mod health_service;
/// Join code generation.
pub mod join_code;
/// Leaderboard builder.
pub mod leaderboard;
/// Prize resolver.
pub mod prize;
/// Quiz CRUD.
pub mod quiz_service;
/// Fixed-window rate limiting.
pub mod rate_limit;
/// Connections grouped by session.
pub mod rooms;
pub mod scoring;
pub mod session_engine;
/// Session CRUD and demo players.
pub mod session_service;
/// Realtime connection loop.
pub mod websocket_service;
