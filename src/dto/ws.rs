//! Realtime wire protocol: inbound commands, outbound events and the snapshots they carry.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::format_system_time,
    error::ServiceError,
    services::{leaderboard::LeaderboardEntry, prize::PrizeWinner},
    state::{
        quiz::{Question, QuestionType, ScaleLabels},
        session::{AnswerValue, Player, PrizeMode, ReactionType, Session},
        state_machine::SessionStatus,
    },
};

/// Messages accepted from realtime clients, framed as `{"event": ..., "data": {...}}`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// `join:session`, from a host or a player.
    #[serde(rename = "join:session")]
    JoinSession(JoinSessionPayload),
    /// `session:start`
    #[serde(rename = "session:start")]
    StartSession(SessionRef),
    /// `question:start`
    #[serde(rename = "question:start")]
    StartQuestion(QuestionRef),
    /// `answer:submit`
    #[serde(rename = "answer:submit")]
    SubmitAnswer(SubmitAnswerPayload),
    /// `question:end`
    #[serde(rename = "question:end")]
    EndQuestion(QuestionRef),
    /// `session:end`
    #[serde(rename = "session:end")]
    EndSession(SessionRef),
    /// `reaction:send`
    #[serde(rename = "reaction:send")]
    SendReaction(ReactionPayload),
}

impl ClientMessage {
    /// Parse and validate a raw text frame.
    pub fn from_json_str(raw: &str) -> Result<Self, ServiceError> {
        let message: Self = serde_json::from_str(raw)
            .map_err(|err| ServiceError::InvalidInput(format!("malformed message: {err}")))?;
        message.validate()?;
        Ok(message)
    }

    /// Session targeted by the message.
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::JoinSession(payload) => payload.session_id,
            Self::StartSession(payload) | Self::EndSession(payload) => payload.session_id,
            Self::StartQuestion(payload) | Self::EndQuestion(payload) => payload.session_id,
            Self::SubmitAnswer(payload) => payload.session_id,
            Self::SendReaction(payload) => payload.session_id,
        }
    }

    /// Wire name of the event, used in logs.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::JoinSession(_) => "join:session",
            Self::StartSession(_) => "session:start",
            Self::StartQuestion(_) => "question:start",
            Self::SubmitAnswer(_) => "answer:submit",
            Self::EndQuestion(_) => "question:end",
            Self::EndSession(_) => "session:end",
            Self::SendReaction(_) => "reaction:send",
        }
    }
}

impl Validate for ClientMessage {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::JoinSession(payload) => payload.validate(),
            Self::SubmitAnswer(payload) => payload.validate(),
            Self::SendReaction(payload) => payload.validate(),
            Self::StartSession(_)
            | Self::EndSession(_)
            | Self::StartQuestion(_)
            | Self::EndQuestion(_) => Ok(()),
        }
    }
}

/// Payload of `join:session`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionPayload {
    /// Session to join.
    pub session_id: Uuid,
    /// Required for players, ignored for hosts.
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub player_name: Option<String>,
    /// Hosts subscribe to the room without becoming players.
    #[serde(default)]
    pub is_host: bool,
    /// Identity supplied by older clients; the server assigns one when absent.
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

/// Payload carrying only a session identifier.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    /// Target session.
    pub session_id: Uuid,
}

/// Payload of `question:start` and `question:end`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRef {
    /// Target session.
    pub session_id: Uuid,
    /// Zero-based position of the question in the quiz.
    pub question_index: usize,
}

/// Payload of `answer:submit`. Any client-side timing field is ignored.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerPayload {
    /// Target session.
    pub session_id: Uuid,
    /// Answering player.
    pub player_id: Uuid,
    /// Must be the active question.
    #[validate(length(min = 1, max = 100))]
    pub question_id: String,
    /// Option index, number or free text depending on the question type.
    pub answer: AnswerValue,
}

/// Payload of `reaction:send`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReactionPayload {
    /// Target session.
    pub session_id: Uuid,
    /// Reacting player.
    pub player_id: Uuid,
    /// Reaction name, sent as `type`.
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "thumbs_up")]
    #[validate(custom(function = "crate::dto::validation::validate_reaction"))]
    pub kind: ReactionType,
}

/// Messages pushed to realtime clients.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Sent to the joining connection only.
    #[serde(rename = "session:joined", rename_all = "camelCase")]
    SessionJoined {
        /// Current state of the session.
        session: SessionSnapshot,
        /// Identity assigned to the joining player; absent for hosts.
        #[serde(skip_serializing_if = "Option::is_none")]
        player_id: Option<Uuid>,
    },
    /// A player entered the room.
    #[serde(rename = "player:joined", rename_all = "camelCase")]
    PlayerJoined {
        /// The new player.
        player: PlayerSnapshot,
    },
    /// The host left the lobby.
    #[serde(rename = "session:started", rename_all = "camelCase")]
    SessionStarted {
        /// Session after the transition.
        session: SessionSnapshot,
    },
    /// A question opened for answers.
    #[serde(rename = "question:started", rename_all = "camelCase")]
    QuestionStarted {
        /// The question, without its expected answer.
        question: QuestionSnapshot,
        /// Zero-based position of the question.
        question_index: usize,
        /// Number of questions in the quiz.
        total_questions: usize,
    },
    /// Sent to the answering connection only.
    #[serde(rename = "answer:submitted", rename_all = "camelCase")]
    AnswerSubmitted {
        /// Whether the answer was right.
        is_correct: bool,
        /// Points added to the player's score.
        points: u32,
    },
    /// Broadcast without correctness.
    #[serde(rename = "answer:received", rename_all = "camelCase")]
    AnswerReceived {
        /// Player who answered.
        player_id: Uuid,
        /// Display name of that player.
        player_name: String,
    },
    /// The host closed the active question.
    #[serde(rename = "question:ended", rename_all = "camelCase")]
    QuestionEnded {
        /// Question that was closed.
        question_index: usize,
        /// Standings after the question.
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// Final results.
    #[serde(rename = "session:ended", rename_all = "camelCase")]
    SessionEnded {
        /// Final standings.
        leaderboard: Vec<LeaderboardEntry>,
        /// Players picked by the prize mode.
        winners: Vec<PrizeWinner>,
        /// Mode used to pick the winners.
        prize_mode: PrizeMode,
    },
    /// A player reacted.
    #[serde(rename = "reaction:sent", rename_all = "camelCase")]
    ReactionSent {
        /// Reacting player.
        player_id: Uuid,
        /// Display name of that player.
        player_name: String,
        /// Reaction name, sent as `type`.
        #[serde(rename = "type")]
        #[schema(value_type = String)]
        kind: ReactionType,
    },
    /// Sent to the originating connection when its event was rejected.
    #[serde(rename = "error", rename_all = "camelCase")]
    Error {
        /// Generic, client-safe reason.
        message: String,
    },
}

impl ServerMessage {
    /// Wire name of the event, used in logs.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SessionJoined { .. } => "session:joined",
            Self::PlayerJoined { .. } => "player:joined",
            Self::SessionStarted { .. } => "session:started",
            Self::QuestionStarted { .. } => "question:started",
            Self::AnswerSubmitted { .. } => "answer:submitted",
            Self::AnswerReceived { .. } => "answer:received",
            Self::QuestionEnded { .. } => "question:ended",
            Self::SessionEnded { .. } => "session:ended",
            Self::ReactionSent { .. } => "reaction:sent",
            Self::Error { .. } => "error",
        }
    }

    /// Client-facing error frame for a failed operation.
    pub fn error(err: &ServiceError) -> Self {
        Self::Error {
            message: err.public_message().to_string(),
        }
    }
}

/// Wire value of `currentQuestionIndex` before the first question opens.
pub const NO_QUESTION_INDEX: i64 = -1;

/// Public projection of a session.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: Uuid,
    /// Quiz being played.
    pub quiz_id: Uuid,
    /// Lowercase code players type to join.
    pub join_code: String,
    /// Host label given at creation.
    pub host_id: String,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Last opened question, or [`NO_QUESTION_INDEX`] before the first one.
    pub current_question_index: i64,
    /// Players in join order.
    pub players: Vec<PlayerSnapshot>,
    /// How winners are picked at the end.
    pub prize_mode: PrizeMode,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 end time, once ended.
    pub ended_at: Option<String>,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            quiz_id: session.quiz_id,
            join_code: session.join_code.clone(),
            host_id: session.host_id.clone(),
            status: session.status(),
            current_question_index: session
                .current_question_index
                .and_then(|index| i64::try_from(index).ok())
                .unwrap_or(NO_QUESTION_INDEX),
            players: session.players.values().map(PlayerSnapshot::from).collect(),
            prize_mode: session.prize_mode,
            created_at: format_system_time(session.created_at),
            ended_at: session.ended_at.map(format_system_time),
        }
    }
}

/// Public projection of a player; individual answers stay server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Player identifier.
    pub id: Uuid,
    /// Session the player belongs to.
    pub session_id: Uuid,
    /// Display name.
    pub name: String,
    /// Total points.
    pub score: u64,
    /// Number of questions answered.
    pub answer_count: usize,
    /// RFC 3339 join time.
    pub joined_at: String,
}

impl From<&Player> for PlayerSnapshot {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            session_id: player.session_id,
            name: player.name.clone(),
            score: player.score,
            answer_count: player.answers.len(),
            joined_at: format_system_time(player.joined_at),
        }
    }
}

/// Question as shown to players: everything except the expected answer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSnapshot {
    /// Identifier answers refer to.
    pub id: String,
    /// Question type, sent as `type`.
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Prompt text.
    pub title: String,
    /// Seconds shown on the client countdown.
    pub time_limit: u32,
    /// Base points of a correct answer.
    pub points: u32,
    /// Choices of multiple choice and poll questions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Lower bound of a scale question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_min: Option<f64>,
    /// Upper bound of a scale question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_max: Option<f64>,
    /// End labels of a scale question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_labels: Option<ScaleLabels>,
}

impl From<&Question> for QuestionSnapshot {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            kind: question.kind,
            title: question.title.clone(),
            time_limit: question.time_limit,
            points: question.points,
            options: question.options.clone(),
            scale_min: question.scale_min,
            scale_max: question.scale_max,
            scale_labels: question.scale_labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::quiz::CorrectAnswer;

    #[test]
    fn parses_tagged_answer_submission() {
        let session_id = Uuid::new_v4();
        let player_id = Uuid::new_v4();
        let raw = json!({
            "event": "answer:submit",
            "data": {
                "sessionId": session_id,
                "playerId": player_id,
                "questionId": "q1",
                "answer": 2,
                "timeTaken": 0.1
            }
        })
        .to_string();

        let message = ClientMessage::from_json_str(&raw).unwrap();
        assert_eq!(message.session_id(), session_id);
        let ClientMessage::SubmitAnswer(payload) = message else {
            panic!("expected answer submission");
        };
        assert_eq!(payload.player_id, player_id);
        assert_eq!(payload.answer, AnswerValue::Number(2.0));
    }

    #[test]
    fn host_join_defaults() {
        let raw = json!({
            "event": "join:session",
            "data": { "sessionId": Uuid::new_v4(), "isHost": true }
        })
        .to_string();

        let ClientMessage::JoinSession(payload) = ClientMessage::from_json_str(&raw).unwrap() else {
            panic!("expected join");
        };
        assert!(payload.is_host);
        assert!(payload.player_name.is_none());
        assert!(payload.player_id.is_none());
    }

    #[test]
    fn rejects_unknown_events_and_bad_payloads() {
        let unknown = json!({ "event": "session:pause", "data": {} }).to_string();
        assert!(matches!(
            ClientMessage::from_json_str(&unknown),
            Err(ServiceError::InvalidInput(_))
        ));

        let long_name = json!({
            "event": "join:session",
            "data": { "sessionId": Uuid::new_v4(), "playerName": "x".repeat(101) }
        })
        .to_string();
        assert!(matches!(
            ClientMessage::from_json_str(&long_name),
            Err(ServiceError::InvalidInput(_))
        ));

        assert!(ClientMessage::from_json_str("not json").is_err());
    }

    #[test]
    fn server_messages_use_event_envelope() {
        let message = ServerMessage::AnswerSubmitted {
            is_correct: true,
            points: 750,
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "event": "answer:submitted", "data": { "isCorrect": true, "points": 750 } })
        );

        let reaction = ServerMessage::ReactionSent {
            player_id: Uuid::nil(),
            player_name: "Ann".into(),
            kind: ReactionType::ThumbsUp,
        };
        let value = serde_json::to_value(&reaction).unwrap();
        assert_eq!(value["data"]["type"], "thumbs_up");
        assert_eq!(value["data"]["playerName"], "Ann");
    }

    #[test]
    fn question_snapshot_hides_correct_answer() {
        let question = Question {
            id: "q1".into(),
            kind: QuestionType::MultipleChoice,
            title: "2 + 2".into(),
            time_limit: 20,
            points: 1000,
            options: vec!["3".into(), "4".into()],
            correct_answer: Some(CorrectAnswer::Number(1.0)),
            scale_min: None,
            scale_max: None,
            scale_labels: None,
        };

        let value = serde_json::to_value(QuestionSnapshot::from(&question)).unwrap();
        assert!(value.get("correctAnswer").is_none());
        assert_eq!(value["type"], "multiple_choice");
        assert_eq!(value["timeLimit"], 20);
    }

    #[test]
    fn session_snapshot_reports_minus_one_before_first_question() {
        let mut session = Session::new(
            Uuid::new_v4(),
            "brave-otter".into(),
            "host".into(),
            PrizeMode::None,
        );
        let value = serde_json::to_value(SessionSnapshot::from(&session)).unwrap();
        assert_eq!(value["currentQuestionIndex"], -1);

        session.current_question_index = Some(2);
        let value = serde_json::to_value(SessionSnapshot::from(&session)).unwrap();
        assert_eq!(value["currentQuestionIndex"], 2);
    }
}
