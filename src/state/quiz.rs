//! Quiz definitions.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of question; drives how answers are graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// One correct option among at least two.
    MultipleChoice,
    /// Opinion poll, never graded.
    Poll,
    /// Opinion on a numeric scale, never graded.
    Scale,
    /// Numeric answer compared against a tolerance.
    NumericGuess,
}

/// Expected answer attached to a graded question.
///
/// Multiple choice questions carry the option index as a number, numeric guesses
/// usually carry a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CorrectAnswer {
    /// Raw JSON number.
    Number(f64),
    /// Raw JSON string.
    Text(String),
}

impl CorrectAnswer {
    /// Interpret the expected answer as a float, if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CorrectAnswer::Number(value) => Some(*value),
            CorrectAnswer::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }
}

/// Labels rendered at both ends of a scale question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScaleLabels {
    /// Label for the minimum value.
    pub min: String,
    /// Label for the maximum value.
    pub max: String,
}

/// A single question of a quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// Identifier, unique within its quiz.
    pub id: String,
    /// Grading behaviour.
    pub kind: QuestionType,
    /// Prompt shown to players.
    pub title: String,
    /// Seconds the clients count down from.
    pub time_limit: u32,
    /// Base points awarded for an instantaneous correct answer.
    pub points: u32,
    /// Options for multiple choice and poll questions.
    pub options: Vec<String>,
    /// Expected answer for graded questions.
    pub correct_answer: Option<CorrectAnswer>,
    /// Lower bound for scale questions.
    pub scale_min: Option<f64>,
    /// Upper bound for scale questions.
    pub scale_max: Option<f64>,
    /// Optional labels for scale questions.
    pub scale_labels: Option<ScaleLabels>,
}

/// Immutable quiz definition referenced by sessions.
#[derive(Debug, Clone)]
pub struct Quiz {
    /// Quiz identifier.
    pub id: Uuid,
    /// Quiz title.
    pub title: String,
    /// Optional blurb.
    pub description: Option<String>,
    /// Questions in play order.
    pub questions: Vec<Question>,
    /// Author label.
    pub created_by: String,
    /// Wall-clock creation time.
    pub created_at: SystemTime,
}

impl Quiz {
    /// Build a quiz with a fresh identifier.
    pub fn new(
        title: String,
        description: Option<String>,
        questions: Vec<Question>,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            questions,
            created_by,
            created_at: SystemTime::now(),
        }
    }

    /// Look a question up by its identifier.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }
}
