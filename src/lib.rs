//! Library crate for yell-back, exposing modules for binaries and integration tests.

/// Runtime configuration.
pub mod config;
/// Storage of quizzes and sessions.
pub mod dao;
/// Wire and REST payloads.
pub mod dto;
/// Error taxonomy and its HTTP mapping.
pub mod error;
/// HTTP and WebSocket routes.
pub mod routes;
/// Session engine, realtime delivery and the services behind the routes.
pub mod services;
/// Domain records and shared application state.
pub mod state;
