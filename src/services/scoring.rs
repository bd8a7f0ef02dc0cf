//! Grading of submitted answers with a time-decayed point award.

use crate::state::{
    quiz::{CorrectAnswer, Question, QuestionType},
    session::AnswerValue,
};

/// Tolerance under which a numeric guess counts as correct.
const NUMERIC_TOLERANCE: f64 = 0.01;

/// Result of grading one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOutcome {
    /// Whether the answer matched the expected one.
    pub is_correct: bool,
    /// Points awarded; always zero when incorrect.
    pub points: u32,
}

impl ScoreOutcome {
    const INCORRECT: Self = Self {
        is_correct: false,
        points: 0,
    };
}

/// Grade `answer` for `question` given the seconds elapsed since the question opened.
///
/// Malformed questions (missing expected answer, zero time limit) grade as incorrect
/// instead of failing.
pub fn score(question: &Question, answer: &AnswerValue, elapsed_secs: f64) -> ScoreOutcome {
    if !is_correct(question, answer) || question.time_limit == 0 {
        return ScoreOutcome::INCORRECT;
    }

    ScoreOutcome {
        is_correct: true,
        points: time_decayed_points(question.points, question.time_limit, elapsed_secs),
    }
}

fn is_correct(question: &Question, answer: &AnswerValue) -> bool {
    match question.kind {
        QuestionType::MultipleChoice => match (&question.correct_answer, answer) {
            (Some(CorrectAnswer::Number(expected)), AnswerValue::Number(given)) => {
                expected == given
            }
            _ => false,
        },
        QuestionType::NumericGuess => {
            let Some(expected) = question.correct_answer.as_ref().and_then(CorrectAnswer::as_f64)
            else {
                return false;
            };
            let given = match answer {
                AnswerValue::Number(value) => *value,
                AnswerValue::Text(text) => match leading_number(text) {
                    Some(value) => value,
                    None => return false,
                },
                AnswerValue::Choices(_) => return false,
            };
            given.is_finite() && (given - expected).abs() < NUMERIC_TOLERANCE
        }
        QuestionType::Poll | QuestionType::Scale => false,
    }
}

/// Read the number at the start of `text`, ignoring whatever follows it.
///
/// `" 3.14 cm"` reads as `3.14`, `"1e3x"` as `1000`, `"abc"` as nothing. Leading whitespace
/// is skipped; `inf`/`nan` spellings are not numbers here.
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        start
            + bytes[start.min(bytes.len())..]
                .iter()
                .take_while(|byte| byte.is_ascii_digit())
                .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer_end = digits_from(end);
    let mut mantissa_digits = integer_end - end;
    end = integer_end;

    if bytes.get(end) == Some(&b'.') {
        let fraction_end = digits_from(end + 1);
        mantissa_digits += fraction_end - (end + 1);
        if mantissa_digits > 0 {
            end = fraction_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent_end = digits_from(end + 1 + sign);
        if exponent_end > end + 1 + sign {
            end = exponent_end;
        }
    }

    text[..end].parse().ok()
}

/// Half of the base points are guaranteed; the other half decays linearly to zero at the deadline.
fn time_decayed_points(base_points: u32, time_limit: u32, elapsed_secs: f64) -> u32 {
    let limit = f64::from(time_limit);
    let elapsed = if elapsed_secs.is_finite() {
        elapsed_secs.max(0.0)
    } else {
        limit
    };
    let bonus = ((limit - elapsed) / limit).max(0.0);
    (f64::from(base_points) * (0.5 + 0.5 * bonus)).round() as u32
}
