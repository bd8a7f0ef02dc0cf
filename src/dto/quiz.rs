//! Quiz authoring payloads and the quiz view returned to its author.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    dto::format_system_time,
    state::quiz::{CorrectAnswer, Question, QuestionType, Quiz, ScaleLabels},
};

const DEFAULT_TIME_LIMIT_SECS: u32 = 30;
const DEFAULT_POINTS: u32 = 1000;
const DEFAULT_AUTHOR: &str = "anonymous";
const MAX_OPTION_LEN: usize = 200;

/// Payload used to author a new quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_unique_question_ids"))]
pub struct CreateQuizRequest {
    /// Quiz title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Optional blurb.
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Questions in play order, ids unique.
    #[validate(length(min = 1, max = 100), nested)]
    pub questions: Vec<QuestionPayload>,
    /// Author label; defaults to `anonymous`.
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub created_by: Option<String>,
}

impl CreateQuizRequest {
    /// Turn the validated payload into a stored quiz with a fresh identifier.
    pub fn into_quiz(self) -> Quiz {
        Quiz::new(
            self.title.trim().to_string(),
            self.description,
            self.questions.into_iter().map(Question::from).collect(),
            self.created_by.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        )
    }
}

/// Question definition, as authored and as returned to the quiz owner.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_question_shape"))]
pub struct QuestionPayload {
    /// Identifier unique within the quiz.
    #[validate(length(min = 1, max = 100))]
    pub id: String,
    /// Question type, sent as `type`.
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Prompt text.
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    /// Seconds; defaults to 30.
    #[serde(default)]
    #[validate(range(min = 5, max = 300))]
    pub time_limit: Option<u32>,
    /// Base points; defaults to 1000.
    #[serde(default)]
    #[validate(range(max = 100_000))]
    pub points: Option<u32>,
    /// Choices; at least two for multiple choice and poll questions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[validate(custom(function = "validate_options"))]
    pub options: Vec<String>,
    /// Option index for multiple choice, number for numeric guesses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<CorrectAnswer>,
    /// Lower bound of a scale question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_min: Option<f64>,
    /// Upper bound of a scale question; must exceed `scaleMin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_max: Option<f64>,
    /// End labels of a scale question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_labels: Option<ScaleLabels>,
}

impl From<QuestionPayload> for Question {
    fn from(value: QuestionPayload) -> Self {
        Self {
            id: value.id,
            kind: value.kind,
            title: value.title,
            time_limit: value.time_limit.unwrap_or(DEFAULT_TIME_LIMIT_SECS),
            points: value.points.unwrap_or(DEFAULT_POINTS),
            options: value.options,
            correct_answer: value.correct_answer,
            scale_min: value.scale_min,
            scale_max: value.scale_max,
            scale_labels: value.scale_labels,
        }
    }
}

impl From<&Question> for QuestionPayload {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            kind: question.kind,
            title: question.title.clone(),
            time_limit: Some(question.time_limit),
            points: Some(question.points),
            options: question.options.clone(),
            correct_answer: question.correct_answer.clone(),
            scale_min: question.scale_min,
            scale_max: question.scale_max,
            scale_labels: question.scale_labels.clone(),
        }
    }
}

/// Full quiz returned to its author, expected answers included.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    /// Quiz identifier.
    pub id: Uuid,
    /// Quiz title.
    pub title: String,
    /// Optional blurb.
    pub description: Option<String>,
    /// Questions with their expected answers.
    pub questions: Vec<QuestionPayload>,
    /// Author label.
    pub created_by: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<&Quiz> for QuizResponse {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            questions: quiz.questions.iter().map(QuestionPayload::from).collect(),
            created_by: quiz.created_by.clone(),
            created_at: format_system_time(quiz.created_at),
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options
        .iter()
        .any(|option| option.chars().count() > MAX_OPTION_LEN)
    {
        let mut err = ValidationError::new("option_length");
        err.message = Some(format!("Options must be at most {MAX_OPTION_LEN} characters").into());
        return Err(err);
    }
    Ok(())
}

fn validate_question_shape(question: &QuestionPayload) -> Result<(), ValidationError> {
    let problem = match question.kind {
        QuestionType::MultipleChoice | QuestionType::Poll if question.options.len() < 2 => {
            Some("needs at least two options")
        }
        QuestionType::MultipleChoice => match question.correct_answer.as_ref() {
            Some(CorrectAnswer::Number(index))
                if index.fract() == 0.0
                    && *index >= 0.0
                    && (*index as usize) < question.options.len() =>
            {
                None
            }
            _ => Some("correct answer must be the index of an option"),
        },
        QuestionType::Scale => match (question.scale_min, question.scale_max) {
            (Some(min), Some(max)) if min < max => None,
            _ => Some("scale needs scaleMin below scaleMax"),
        },
        QuestionType::NumericGuess => {
            match question.correct_answer.as_ref().and_then(CorrectAnswer::as_f64) {
                Some(value) if value.is_finite() => None,
                _ => Some("numeric guess needs a numeric correct answer"),
            }
        }
        QuestionType::Poll => None,
    };

    match problem {
        None => Ok(()),
        Some(message) => {
            let mut err = ValidationError::new("question_shape");
            err.message = Some(format!("Question `{}` {message}", question.id).into());
            Err(err)
        }
    }
}

fn validate_unique_question_ids(request: &CreateQuizRequest) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for question in &request.questions {
        if !seen.insert(question.id.as_str()) {
            let mut err = ValidationError::new("duplicate_question_id");
            err.message = Some(format!("Question id `{}` is used twice", question.id).into());
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(questions: serde_json::Value) -> CreateQuizRequest {
        serde_json::from_value(json!({ "title": "Trivia night", "questions": questions })).unwrap()
    }

    fn multiple_choice(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": "multiple_choice",
            "title": "Capital of France?",
            "options": ["Berlin", "Paris"],
            "correctAnswer": 1
        })
    }

    #[test]
    fn defaults_are_applied() {
        let quiz = request(json!([multiple_choice("q1")])).into_quiz();
        let question = &quiz.questions[0];

        assert_eq!(question.time_limit, 30);
        assert_eq!(question.points, 1000);
        assert_eq!(quiz.created_by, "anonymous");
    }

    #[test]
    fn accepts_every_question_type() {
        let payload = request(json!([
            multiple_choice("q1"),
            { "id": "q2", "type": "poll", "title": "Tea or coffee?", "options": ["Tea", "Coffee"] },
            { "id": "q3", "type": "scale", "title": "Rate us", "scaleMin": 1, "scaleMax": 5 },
            { "id": "q4", "type": "numeric_guess", "title": "Year?", "correctAnswer": "1969" }
        ]));
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_questions() {
        let cases = [
            json!({ "id": "q", "type": "multiple_choice", "title": "t", "options": ["a"], "correctAnswer": 0 }),
            json!({ "id": "q", "type": "multiple_choice", "title": "t", "options": ["a", "b"], "correctAnswer": 2 }),
            json!({ "id": "q", "type": "multiple_choice", "title": "t", "options": ["a", "b"], "correctAnswer": "1" }),
            json!({ "id": "q", "type": "scale", "title": "t", "scaleMin": 5, "scaleMax": 5 }),
            json!({ "id": "q", "type": "numeric_guess", "title": "t", "correctAnswer": "lots" }),
            json!({ "id": "q", "type": "poll", "title": "t", "options": ["a", "b"], "timeLimit": 4 }),
            json!({ "id": "q", "type": "poll", "title": "t", "options": ["a", "b"], "points": 100001 }),
            json!({ "id": "q", "type": "poll", "title": "", "options": ["a", "b"] }),
            json!({ "id": "q", "type": "poll", "title": "t", "options": ["a", "b".repeat(201)] }),
        ];

        for case in cases {
            assert!(request(json!([case.clone()])).validate().is_err(), "{case}");
        }
    }

    #[test]
    fn rejects_duplicate_ids_and_empty_quiz() {
        assert!(
            request(json!([multiple_choice("q1"), multiple_choice("q1")]))
                .validate()
                .is_err()
        );
        assert!(request(json!([])).validate().is_err());
    }

    #[test]
    fn response_includes_expected_answers() {
        let quiz = request(json!([multiple_choice("q1")])).into_quiz();
        let value = serde_json::to_value(QuizResponse::from(&quiz)).unwrap();

        assert_eq!(value["questions"][0]["correctAnswer"], 1.0);
        assert_eq!(value["questions"][0]["type"], "multiple_choice");
    }
}
