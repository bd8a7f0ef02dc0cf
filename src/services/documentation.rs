use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Yell Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::quiz::create_quiz,
        crate::routes::quiz::list_quizzes,
        crate::routes::quiz::get_quiz,
        crate::routes::session::create_session,
        crate::routes::session::find_sessions,
        crate::routes::session::get_session,
        crate::routes::session::add_demo_player,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::quiz::CreateQuizRequest,
            crate::dto::quiz::QuestionPayload,
            crate::dto::quiz::QuizResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::DemoPlayerRequest,
            crate::dto::session::SessionLookup,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::SessionSnapshot,
            crate::dto::ws::PlayerSnapshot,
            crate::dto::ws::QuestionSnapshot,
            crate::services::leaderboard::LeaderboardEntry,
            crate::services::prize::PrizeWinner,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "quizzes", description = "Quiz authoring"),
        (name = "sessions", description = "Session creation and lookup"),
        (name = "demo", description = "Shortcuts for demos without a realtime client"),
        (name = "realtime", description = "WebSocket protocol for hosts and players"),
    )
)]
pub struct ApiDoc;
