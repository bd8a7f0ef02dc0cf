use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::quiz::{CreateQuizRequest, QuizResponse},
    error::AppError,
    services::quiz_service,
    state::SharedState,
};

/// Routes handling quiz authoring.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/quizzes", get(list_quizzes).post(create_quiz))
        .route("/quizzes/{id}", get(get_quiz))
}

/// Validate and store a new quiz.
#[utoipa::path(
    post,
    path = "/quizzes",
    tag = "quizzes",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz created", body = QuizResponse),
        (status = 400, description = "Invalid quiz definition")
    )
)]
pub async fn create_quiz(
    State(state): State<SharedState>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<(StatusCode, Json<QuizResponse>), AppError> {
    let quiz = quiz_service::create_quiz(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// List stored quizzes.
#[utoipa::path(
    get,
    path = "/quizzes",
    tag = "quizzes",
    responses((status = 200, description = "Stored quizzes", body = [QuizResponse]))
)]
pub async fn list_quizzes(
    State(state): State<SharedState>,
) -> Result<Json<Vec<QuizResponse>>, AppError> {
    Ok(Json(quiz_service::list_quizzes(&state).await?))
}

/// Fetch one quiz.
#[utoipa::path(
    get,
    path = "/quizzes/{id}",
    tag = "quizzes",
    params(("id" = Uuid, Path, description = "Quiz identifier")),
    responses(
        (status = 200, description = "Quiz found", body = QuizResponse),
        (status = 404, description = "Unknown quiz")
    )
)]
pub async fn get_quiz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizResponse>, AppError> {
    Ok(Json(quiz_service::get_quiz(&state, id).await?))
}
