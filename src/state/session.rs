//! Live session records: sessions, players and what they submitted.

use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::state_machine::{SessionStateMachine, SessionStatus};

/// Policy controlling how winners are picked once the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrizeMode {
    /// No winners are announced.
    #[default]
    None,
    /// The top three of the final leaderboard.
    TopScore,
    /// One player drawn uniformly at random.
    RandomRaffle,
    /// Same draw as the raffle; clients animate it as a wheel.
    SpinWheel,
}

/// Raw answer submitted by a player; its shape depends on the question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Option index, scale value or numeric guess.
    Number(f64),
    /// Free text, usually a numeric guess.
    Text(String),
    /// Multiple selections.
    Choices(Vec<String>),
}

/// Reaction a player can send during the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionType {
    /// The default reaction offered by every client.
    ThumbsUp,
    /// Any other reaction name, relayed as-is.
    #[serde(untagged)]
    Other(String),
}

/// One recorded answer; immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Question the answer belongs to.
    pub question_id: String,
    /// Raw submitted value.
    pub value: AnswerValue,
    /// Wall-clock receipt time.
    pub answered_at: SystemTime,
    /// Grading result.
    pub is_correct: bool,
    /// Points awarded.
    pub points: u32,
}

/// Reaction sent by a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Reaction name.
    pub kind: ReactionType,
    /// Wall-clock receipt time.
    pub sent_at: SystemTime,
}

/// Participant of exactly one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Player identifier.
    pub id: Uuid,
    /// Owning session.
    pub session_id: Uuid,
    /// Trimmed display name.
    pub name: String,
    /// Never decreases; only grows through scored answers.
    pub score: u64,
    /// At most one per question, in submission order.
    pub answers: Vec<Answer>,
    /// Reactions in receipt order.
    pub reactions: Vec<Reaction>,
    /// Wall-clock join time.
    pub joined_at: SystemTime,
}

impl Player {
    /// Create a player with a zero score.
    pub fn new(id: Uuid, session_id: Uuid, name: String) -> Self {
        Self {
            id,
            session_id,
            name,
            score: 0,
            answers: Vec::new(),
            reactions: Vec::new(),
            joined_at: SystemTime::now(),
        }
    }

    /// Whether the player already has an answer for `question_id`.
    pub fn has_answered(&self, question_id: &str) -> bool {
        self.answers
            .iter()
            .any(|answer| answer.question_id == question_id)
    }

    /// Append an answer and add its points to the score.
    ///
    /// Returns `false` and leaves the player untouched when the question was already answered.
    pub fn record_answer(&mut self, answer: Answer) -> bool {
        if self.has_answered(&answer.question_id) {
            return false;
        }
        self.score += u64::from(answer.points);
        self.answers.push(answer);
        true
    }
}

/// Authoritative state of a live session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier.
    pub id: Uuid,
    /// Quiz being played, referenced not embedded.
    pub quiz_id: Uuid,
    /// Lowercase join code.
    pub join_code: String,
    /// Host label given at creation.
    pub host_id: String,
    /// Lifecycle state.
    pub machine: SessionStateMachine,
    /// `None` until the first question starts.
    pub current_question_index: Option<usize>,
    /// Monotonic instant at which the current question opened.
    pub question_started_at: Option<Instant>,
    /// Players in join order, unique by id.
    pub players: IndexMap<Uuid, Player>,
    /// How winners are picked at the end.
    pub prize_mode: PrizeMode,
    /// Wall-clock creation time.
    pub created_at: SystemTime,
    /// Set by `session:end`.
    pub ended_at: Option<SystemTime>,
}

impl Session {
    /// Build a waiting session for `quiz_id`.
    pub fn new(quiz_id: Uuid, join_code: String, host_id: String, prize_mode: PrizeMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            quiz_id,
            join_code: join_code.to_lowercase(),
            host_id,
            machine: SessionStateMachine::new(),
            current_question_index: None,
            question_started_at: None,
            players: IndexMap::new(),
            prize_mode,
            created_at: SystemTime::now(),
            ended_at: None,
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.machine.status()
    }

    /// Insert a new player at the end of the roster and return a copy of it.
    pub fn add_player(&mut self, id: Uuid, name: String) -> Player {
        let player = Player::new(id, self.id, name);
        self.players.insert(id, player.clone());
        player
    }

    /// Players in join order.
    pub fn roster(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }
}
