use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::quiz::{CreateQuizRequest, QuizResponse},
    error::ServiceError,
    state::SharedState,
};

/// Validate and store a new quiz.
pub async fn create_quiz(
    state: &SharedState,
    request: CreateQuizRequest,
) -> Result<QuizResponse, ServiceError> {
    request.validate()?;

    let quiz = request.into_quiz();
    let response = QuizResponse::from(&quiz);
    state.store().insert_quiz(quiz).await?;

    Ok(response)
}

/// Fetch one quiz with its expected answers.
pub async fn get_quiz(state: &SharedState, id: Uuid) -> Result<QuizResponse, ServiceError> {
    let quiz = state.store().require_quiz(id).await?;
    Ok(QuizResponse::from(quiz.as_ref()))
}

/// List every stored quiz, oldest first.
pub async fn list_quizzes(state: &SharedState) -> Result<Vec<QuizResponse>, ServiceError> {
    let quizzes = state.store().list_quizzes().await?;
    Ok(quizzes
        .iter()
        .map(|quiz| QuizResponse::from(quiz.as_ref()))
        .collect())
}
