use axum::{Router, middleware};

use crate::{services::rate_limit, state::SharedState};

/// Swagger UI.
pub mod docs;
/// `/healthcheck`
pub mod health;
/// `/quizzes`
pub mod quiz;
/// `/sessions` and `/demo/players`
pub mod session;
/// `/ws`
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
///
/// The REST budget applies to quiz and session routes only; sockets carry their own.
pub fn router(state: SharedState) -> Router<()> {
    let rest_router = quiz::router()
        .merge(session::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_by_ip,
        ));

    health::router()
        .merge(websocket::router())
        .merge(rest_router)
        .merge(docs::router())
        .with_state(state)
}
