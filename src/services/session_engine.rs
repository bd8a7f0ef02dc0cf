//! Applies inbound realtime events to a session and decides who hears about it.
//!
//! [`apply`] is pure: it mutates a session copy and returns the [`Dispatch`] describing the
//! resulting messages. [`SessionEngine::execute`] wraps it with the per-session lock, the
//! transition timeout and the commit.

use std::{sync::Arc, time::{Duration, SystemTime}};

use tokio::time::{Instant, timeout};
use tracing::debug;
use uuid::Uuid;

use crate::{
    dao::session_store::{SessionStore, commit_on_success},
    dto::ws::{
        ClientMessage, JoinSessionPayload, PlayerSnapshot, QuestionSnapshot, ReactionPayload,
        ServerMessage, SessionSnapshot, SubmitAnswerPayload,
    },
    error::ServiceError,
    services::{leaderboard, prize, scoring},
    state::{
        quiz::Quiz,
        session::{Answer, Reaction, Session},
        state_machine::SessionEvent,
    },
};

/// Delivery primitives offered by the realtime gateway to one originating connection.
pub trait Outbox: Send + Sync {
    /// Add the originating connection to the room of `session_id`.
    fn subscribe(&self, session_id: Uuid);
    /// Send `message` to every connection in the room of `session_id`.
    fn broadcast(&self, session_id: Uuid, message: &ServerMessage);
    /// Send `message` to the originating connection only.
    fn reply(&self, message: &ServerMessage);
}

/// One step of a [`Dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Join the originating connection to a room.
    Subscribe(Uuid),
    /// Broadcast to a room.
    Room(Uuid, ServerMessage),
    /// Reply to the originating connection.
    Sender(ServerMessage),
}

/// Ordered list of deliveries produced by one handled event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    deliveries: Vec<Delivery>,
}

impl Dispatch {
    fn subscribe(mut self, session_id: Uuid) -> Self {
        self.deliveries.push(Delivery::Subscribe(session_id));
        self
    }

    fn room(mut self, session_id: Uuid, message: ServerMessage) -> Self {
        self.deliveries.push(Delivery::Room(session_id, message));
        self
    }

    fn sender(mut self, message: ServerMessage) -> Self {
        self.deliveries.push(Delivery::Sender(message));
        self
    }

    /// Deliveries in emission order.
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Hand every delivery to `outbox`, in order.
    pub fn deliver(self, outbox: &dyn Outbox) {
        for delivery in self.deliveries {
            match delivery {
                Delivery::Subscribe(session_id) => outbox.subscribe(session_id),
                Delivery::Room(session_id, message) => outbox.broadcast(session_id, &message),
                Delivery::Sender(message) => outbox.reply(&message),
            }
        }
    }
}

/// Serialises events per session and commits their effects atomically.
#[derive(Clone)]
pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    timeout: Duration,
}

impl SessionEngine {
    /// Build an engine bounded by `timeout` per event.
    pub fn new(store: Arc<dyn SessionStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Handle one inbound event end to end.
    ///
    /// The session lock is held from the read until the last delivery has been queued, so
    /// every connection of a room observes the same order. On error nothing is committed
    /// and nothing is delivered.
    pub async fn execute(
        &self,
        message: ClientMessage,
        outbox: &dyn Outbox,
    ) -> Result<(), ServiceError> {
        let session_id = message.session_id();
        let event = message.event_name();

        let work = async {
            let mut guard = self.store.lock_required(session_id).await?;
            let quiz = self.store.require_quiz(guard.quiz_id).await?;

            let dispatch = commit_on_success(&mut guard, |session| {
                apply(session, &quiz, message, Instant::now())
            })?;

            debug!(
                %session_id,
                event,
                deliveries = dispatch.deliveries().len(),
                "session event committed"
            );
            dispatch.deliver(outbox);
            Ok::<_, ServiceError>(())
        };

        timeout(self.timeout, work)
            .await
            .map_err(|_| ServiceError::Timeout)?
    }
}

/// Apply `message` to `session`, returning the messages to emit.
///
/// `now` is the instant the event was received; answer timing is measured against it.
/// On error `session` may be partially modified and must be discarded.
pub fn apply(
    session: &mut Session,
    quiz: &Quiz,
    message: ClientMessage,
    now: Instant,
) -> Result<Dispatch, ServiceError> {
    match message {
        ClientMessage::JoinSession(payload) => join(session, payload),
        ClientMessage::StartSession(_) => start_session(session),
        ClientMessage::StartQuestion(payload) => {
            start_question(session, quiz, payload.question_index, now)
        }
        ClientMessage::SubmitAnswer(payload) => submit_answer(session, quiz, payload, now),
        ClientMessage::EndQuestion(payload) => end_question(session, payload.question_index),
        ClientMessage::EndSession(_) => end_session(session),
        ClientMessage::SendReaction(payload) => send_reaction(session, payload),
    }
}

fn join(session: &mut Session, payload: JoinSessionPayload) -> Result<Dispatch, ServiceError> {
    let dispatch = Dispatch::default().subscribe(session.id);

    if payload.is_host {
        return Ok(dispatch.sender(ServerMessage::SessionJoined {
            session: SessionSnapshot::from(&*session),
            player_id: None,
        }));
    }

    let plan = session.machine.plan(SessionEvent::PlayerJoined)?;

    // Reconnecting player: same identity, no new roster entry.
    if let Some(existing) = payload
        .player_id
        .filter(|id| session.players.contains_key(id))
    {
        return Ok(dispatch.sender(ServerMessage::SessionJoined {
            session: SessionSnapshot::from(&*session),
            player_id: Some(existing),
        }));
    }

    let name = payload
        .player_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput("player name is required".into()))?
        .to_string();

    session.machine.apply(plan)?;
    let player = session.add_player(payload.player_id.unwrap_or_else(Uuid::new_v4), name);

    Ok(dispatch
        .room(
            session.id,
            ServerMessage::PlayerJoined {
                player: PlayerSnapshot::from(&player),
            },
        )
        .sender(ServerMessage::SessionJoined {
            session: SessionSnapshot::from(&*session),
            player_id: Some(player.id),
        }))
}

fn start_session(session: &mut Session) -> Result<Dispatch, ServiceError> {
    let plan = session.machine.plan(SessionEvent::Start)?;
    session.machine.apply(plan)?;

    Ok(Dispatch::default().room(
        session.id,
        ServerMessage::SessionStarted {
            session: SessionSnapshot::from(&*session),
        },
    ))
}

fn start_question(
    session: &mut Session,
    quiz: &Quiz,
    index: usize,
    now: Instant,
) -> Result<Dispatch, ServiceError> {
    let plan = session
        .machine
        .plan(SessionEvent::StartQuestion { index })?;
    let question = quiz.questions.get(index).ok_or_else(|| {
        ServiceError::InvalidTransition(format!(
            "question index {index} is out of range for {} questions",
            quiz.questions.len()
        ))
    })?;

    session.machine.apply(plan)?;
    session.current_question_index = Some(index);
    session.question_started_at = Some(now);

    Ok(Dispatch::default().room(
        session.id,
        ServerMessage::QuestionStarted {
            question: QuestionSnapshot::from(question),
            question_index: index,
            total_questions: quiz.questions.len(),
        },
    ))
}

fn submit_answer(
    session: &mut Session,
    quiz: &Quiz,
    payload: SubmitAnswerPayload,
    now: Instant,
) -> Result<Dispatch, ServiceError> {
    let plan = session.machine.plan(SessionEvent::AnswerSubmitted)?;

    let Some(question) = quiz.question(&payload.question_id) else {
        return Err(ServiceError::NotFound(format!(
            "question `{}` not found",
            payload.question_id
        )));
    };
    let active = session
        .current_question_index
        .and_then(|index| quiz.questions.get(index));
    if active.map(|active| active.id.as_str()) != Some(question.id.as_str()) {
        return Err(ServiceError::InvalidTransition(format!(
            "question `{}` is not the active question",
            question.id
        )));
    }

    let elapsed = session
        .question_started_at
        .map(|started| now.saturating_duration_since(started).as_secs_f64())
        .unwrap_or_default();
    let outcome = scoring::score(question, &payload.answer, elapsed);

    let player = session
        .players
        .get_mut(&payload.player_id)
        .ok_or_else(|| ServiceError::NotFound(format!("player `{}` not found", payload.player_id)))?;

    let recorded = player.record_answer(Answer {
        question_id: question.id.clone(),
        value: payload.answer,
        answered_at: SystemTime::now(),
        is_correct: outcome.is_correct,
        points: outcome.points,
    });
    if !recorded {
        return Err(ServiceError::DuplicateAnswer(format!(
            "player `{}` already answered `{}`",
            player.id, question.id
        )));
    }
    let player_id = player.id;
    let player_name = player.name.clone();

    session.machine.apply(plan)?;

    Ok(Dispatch::default()
        .sender(ServerMessage::AnswerSubmitted {
            is_correct: outcome.is_correct,
            points: outcome.points,
        })
        .room(
            session.id,
            ServerMessage::AnswerReceived {
                player_id,
                player_name,
            },
        ))
}

fn end_question(session: &mut Session, index: usize) -> Result<Dispatch, ServiceError> {
    let plan = session.machine.plan(SessionEvent::EndQuestion)?;
    if session.current_question_index != Some(index) {
        return Err(ServiceError::InvalidTransition(format!(
            "question {index} is not the active question"
        )));
    }

    session.machine.apply(plan)?;
    session.question_started_at = None;

    Ok(Dispatch::default().room(
        session.id,
        ServerMessage::QuestionEnded {
            question_index: index,
            leaderboard: leaderboard::build(&session.roster()),
        },
    ))
}

fn end_session(session: &mut Session) -> Result<Dispatch, ServiceError> {
    let plan = session.machine.plan(SessionEvent::End)?;
    session.machine.apply(plan)?;
    session.ended_at = Some(SystemTime::now());
    session.question_started_at = None;

    let roster = session.roster();
    let leaderboard = leaderboard::build(&roster);
    let winners = prize::resolve(session.prize_mode, &leaderboard, &roster);

    Ok(Dispatch::default().room(
        session.id,
        ServerMessage::SessionEnded {
            leaderboard,
            winners,
            prize_mode: session.prize_mode,
        },
    ))
}

fn send_reaction(session: &mut Session, payload: ReactionPayload) -> Result<Dispatch, ServiceError> {
    let plan = session.machine.plan(SessionEvent::ReactionSent)?;

    let player = session
        .players
        .get_mut(&payload.player_id)
        .ok_or_else(|| ServiceError::NotFound(format!("player `{}` not found", payload.player_id)))?;
    player.reactions.push(Reaction {
        kind: payload.kind.clone(),
        sent_at: SystemTime::now(),
    });
    let player_name = player.name.clone();

    session.machine.apply(plan)?;

    Ok(Dispatch::default().room(
        session.id,
        ServerMessage::ReactionSent {
            player_id: payload.player_id,
            player_name,
            kind: payload.kind,
        },
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        dao::session_store::memory::InMemorySessionStore,
        dto::ws::{QuestionRef, SessionRef},
        state::{
            quiz::{CorrectAnswer, Question, QuestionType},
            session::{AnswerValue, PrizeMode, ReactionType},
            state_machine::SessionStatus,
        },
    };

    fn question(id: &str, correct: f64) -> Question {
        Question {
            id: id.into(),
            kind: QuestionType::MultipleChoice,
            title: format!("Question {id}"),
            time_limit: 20,
            points: 1000,
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answer: Some(CorrectAnswer::Number(correct)),
            scale_min: None,
            scale_max: None,
            scale_labels: None,
        }
    }

    fn fixture(prize_mode: PrizeMode) -> (Session, Quiz) {
        let quiz = Quiz::new(
            "General knowledge".into(),
            None,
            vec![question("q1", 1.0), question("q2", 2.0)],
            "host".into(),
        );
        let session = Session::new(quiz.id, "quick-quiz".into(), "host".into(), prize_mode);
        (session, quiz)
    }

    fn join_msg(session_id: Uuid, name: Option<&str>, is_host: bool, player_id: Option<Uuid>) -> ClientMessage {
        ClientMessage::JoinSession(JoinSessionPayload {
            session_id,
            player_name: name.map(Into::into),
            is_host,
            player_id,
        })
    }

    fn reaction_msg(session_id: Uuid, player_id: Uuid) -> ClientMessage {
        ClientMessage::SendReaction(ReactionPayload {
            session_id,
            player_id,
            kind: ReactionType::ThumbsUp,
        })
    }

    fn join_player(session: &mut Session, quiz: &Quiz, name: &str) -> Uuid {
        let message = join_msg(session.id, Some(name), false, None);
        let dispatch = apply(session, quiz, message, Instant::now()).unwrap();
        match dispatch.deliveries().last() {
            Some(Delivery::Sender(ServerMessage::SessionJoined {
                player_id: Some(id), ..
            })) => *id,
            other => panic!("unexpected delivery {other:?}"),
        }
    }

    fn session_event(session: &mut Session, quiz: &Quiz, message: ClientMessage) -> Result<Dispatch, ServiceError> {
        apply(session, quiz, message, Instant::now())
    }

    fn start(session: &mut Session, quiz: &Quiz) {
        let id = session.id;
        session_event(session, quiz, ClientMessage::StartSession(SessionRef { session_id: id })).unwrap();
    }

    fn start_question_at(session: &mut Session, quiz: &Quiz, index: usize, at: Instant) -> Result<Dispatch, ServiceError> {
        let session_id = session.id;
        apply(
            session,
            quiz,
            ClientMessage::StartQuestion(QuestionRef {
                session_id,
                question_index: index,
            }),
            at,
        )
    }

    fn answer_at(
        session: &mut Session,
        quiz: &Quiz,
        player_id: Uuid,
        question_id: &str,
        value: f64,
        at: Instant,
    ) -> Result<Dispatch, ServiceError> {
        let session_id = session.id;
        apply(
            session,
            quiz,
            ClientMessage::SubmitAnswer(SubmitAnswerPayload {
                session_id,
                player_id,
                question_id: question_id.into(),
                answer: AnswerValue::Number(value),
            }),
            at,
        )
    }

    fn end_question_msg(session: &Session, index: usize) -> ClientMessage {
        ClientMessage::EndQuestion(QuestionRef {
            session_id: session.id,
            question_index: index,
        })
    }

    #[test]
    fn host_join_subscribes_without_player() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        let message = join_msg(session.id, None, true, None);
        let dispatch = session_event(&mut session, &quiz, message).unwrap();

        assert_eq!(dispatch.deliveries()[0], Delivery::Subscribe(session.id));
        assert!(matches!(
            &dispatch.deliveries()[1],
            Delivery::Sender(ServerMessage::SessionJoined { player_id: None, .. })
        ));
        assert!(session.players.is_empty());
    }

    #[test]
    fn player_join_broadcasts_then_replies() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        let player_id = join_player(&mut session, &quiz, "  Alice ");

        assert_eq!(session.players[&player_id].name, "Alice");

        let message = join_msg(session.id, Some("Bob"), false, None);
        let again = session_event(&mut session, &quiz, message).unwrap();
        let kinds: Vec<_> = again
            .deliveries()
            .iter()
            .map(|delivery| match delivery {
                Delivery::Subscribe(_) => "subscribe",
                Delivery::Room(_, message) | Delivery::Sender(message) => message.event_name(),
            })
            .collect();
        assert_eq!(kinds, vec!["subscribe", "player:joined", "session:joined"]);
    }

    #[test]
    fn rejoin_with_known_identity_is_idempotent() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        let player_id = join_player(&mut session, &quiz, "Alice");

        let message = join_msg(session.id, Some("Alice"), false, Some(player_id));
        let dispatch = session_event(&mut session, &quiz, message).unwrap();

        assert_eq!(session.players.len(), 1);
        assert!(
            dispatch
                .deliveries()
                .iter()
                .all(|delivery| !matches!(delivery, Delivery::Room(..)))
        );
    }

    #[test]
    fn join_requires_a_name_and_a_live_session() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        let id = session.id;
        let blank = session_event(&mut session, &quiz, join_msg(id, Some("   "), false, None));
        assert!(matches!(blank, Err(ServiceError::InvalidInput(_))));

        session_event(&mut session, &quiz, ClientMessage::EndSession(SessionRef { session_id: id })).unwrap();
        let late = session_event(&mut session, &quiz, join_msg(id, Some("Late"), false, None));
        assert!(matches!(late, Err(ServiceError::InvalidTransition(_))));
    }

    #[test]
    fn answer_is_scored_from_server_clock() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        let alice = join_player(&mut session, &quiz, "Alice");
        let bob = join_player(&mut session, &quiz, "Bob");
        start(&mut session, &quiz);

        let t0 = Instant::now();
        start_question_at(&mut session, &quiz, 0, t0).unwrap();
        assert_eq!(session.status(), SessionStatus::QuestionActive);

        let dispatch = answer_at(&mut session, &quiz, alice, "q1", 1.0, t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(
            dispatch.deliveries()[0],
            Delivery::Sender(ServerMessage::AnswerSubmitted {
                is_correct: true,
                points: 750
            })
        );
        assert_eq!(
            dispatch.deliveries()[1],
            Delivery::Room(
                session.id,
                ServerMessage::AnswerReceived {
                    player_id: alice,
                    player_name: "Alice".into()
                }
            )
        );

        answer_at(&mut session, &quiz, bob, "q1", 1.0, t0 + Duration::from_secs(20)).unwrap();
        assert_eq!(session.players[&alice].score, 750);
        assert_eq!(session.players[&bob].score, 500);
    }

    #[test]
    fn duplicate_answer_is_rejected_without_changing_score() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        let alice = join_player(&mut session, &quiz, "Alice");
        start(&mut session, &quiz);
        let t0 = Instant::now();
        start_question_at(&mut session, &quiz, 0, t0).unwrap();

        answer_at(&mut session, &quiz, alice, "q1", 2.0, t0).unwrap();
        let second = answer_at(&mut session, &quiz, alice, "q1", 1.0, t0);

        assert!(matches!(second, Err(ServiceError::DuplicateAnswer(_))));
        assert_eq!(session.players[&alice].score, 0);
        assert_eq!(session.players[&alice].answers.len(), 1);
    }

    #[test]
    fn answers_outside_the_active_question_are_rejected() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        let alice = join_player(&mut session, &quiz, "Alice");
        let now = Instant::now();

        let early = answer_at(&mut session, &quiz, alice, "q1", 1.0, now);
        assert!(matches!(early, Err(ServiceError::InvalidTransition(_))));

        start(&mut session, &quiz);
        start_question_at(&mut session, &quiz, 0, now).unwrap();

        let wrong = answer_at(&mut session, &quiz, alice, "q2", 2.0, now);
        assert!(matches!(wrong, Err(ServiceError::InvalidTransition(_))));
        let unknown = answer_at(&mut session, &quiz, alice, "nope", 1.0, now);
        assert!(matches!(unknown, Err(ServiceError::NotFound(_))));
        let stranger = answer_at(&mut session, &quiz, Uuid::new_v4(), "q1", 1.0, now);
        assert!(matches!(stranger, Err(ServiceError::NotFound(_))));

        let end = end_question_msg(&session, 0);
        session_event(&mut session, &quiz, end).unwrap();
        let late = answer_at(&mut session, &quiz, alice, "q1", 1.0, now);
        assert!(matches!(late, Err(ServiceError::InvalidTransition(_))));
        assert_eq!(session.players[&alice].score, 0);
    }

    #[test]
    fn end_question_requires_matching_active_question() {
        let (mut session, quiz) = fixture(PrizeMode::None);

        let waiting = end_question_msg(&session, 0);
        assert!(matches!(
            session_event(&mut session, &quiz, waiting),
            Err(ServiceError::InvalidTransition(_))
        ));
        assert_eq!(session.status(), SessionStatus::Waiting);

        start(&mut session, &quiz);
        start_question_at(&mut session, &quiz, 1, Instant::now()).unwrap();

        let stale = end_question_msg(&session, 0);
        assert!(matches!(
            session_event(&mut session, &quiz, stale),
            Err(ServiceError::InvalidTransition(_))
        ));

        let current = end_question_msg(&session, 1);
        let dispatch = session_event(&mut session, &quiz, current).unwrap();
        assert!(matches!(
            &dispatch.deliveries()[0],
            Delivery::Room(_, ServerMessage::QuestionEnded { question_index: 1, .. })
        ));
        assert_eq!(session.status(), SessionStatus::QuestionResults);
    }

    #[test]
    fn question_index_must_exist() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        start(&mut session, &quiz);

        let result = start_question_at(&mut session, &quiz, 5, Instant::now());
        assert!(matches!(result, Err(ServiceError::InvalidTransition(_))));
        assert_eq!(session.status(), SessionStatus::Started);
        assert_eq!(session.current_question_index, None);
    }

    #[test]
    fn host_may_reopen_or_skip_questions_from_results() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        start(&mut session, &quiz);
        let now = Instant::now();

        start_question_at(&mut session, &quiz, 1, now).unwrap();
        let end = end_question_msg(&session, 1);
        session_event(&mut session, &quiz, end).unwrap();
        start_question_at(&mut session, &quiz, 0, now).unwrap();

        assert_eq!(session.current_question_index, Some(0));
        assert!(matches!(
            start_question_at(&mut session, &quiz, 1, now),
            Err(ServiceError::InvalidTransition(_))
        ));
    }

    #[test]
    fn late_joiner_can_answer_the_open_question() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        start(&mut session, &quiz);
        let t0 = Instant::now();
        start_question_at(&mut session, &quiz, 0, t0).unwrap();

        let late = join_player(&mut session, &quiz, "Latecomer");
        answer_at(&mut session, &quiz, late, "q1", 1.0, t0).unwrap();
        assert_eq!(session.players[&late].score, 1000);
    }

    #[test]
    fn session_end_publishes_leaderboard_and_winners_once() {
        let (mut session, quiz) = fixture(PrizeMode::TopScore);
        let alice = join_player(&mut session, &quiz, "Alice");
        let bob = join_player(&mut session, &quiz, "Bob");
        start(&mut session, &quiz);
        let t0 = Instant::now();
        start_question_at(&mut session, &quiz, 0, t0).unwrap();
        answer_at(&mut session, &quiz, bob, "q1", 1.0, t0).unwrap();

        let id = session.id;
        let dispatch =
            session_event(&mut session, &quiz, ClientMessage::EndSession(SessionRef { session_id: id })).unwrap();

        let Delivery::Room(_, ServerMessage::SessionEnded { leaderboard, winners, prize_mode }) =
            &dispatch.deliveries()[0]
        else {
            panic!("expected session:ended");
        };
        assert_eq!(*prize_mode, PrizeMode::TopScore);
        assert_eq!(leaderboard[0].player_id, bob);
        assert_eq!(leaderboard[1].player_id, alice);
        assert_eq!(winners.len(), 2);
        assert!(session.ended_at.is_some());

        let again = session_event(&mut session, &quiz, ClientMessage::EndSession(SessionRef { session_id: id }));
        assert!(matches!(again, Err(ServiceError::InvalidTransition(_))));
    }

    #[test]
    fn reactions_are_relayed_in_any_state() {
        let (mut session, quiz) = fixture(PrizeMode::None);
        let alice = join_player(&mut session, &quiz, "Alice");

        let id = session.id;
        let dispatch = session_event(&mut session, &quiz, reaction_msg(id, alice)).unwrap();
        assert!(matches!(
            &dispatch.deliveries()[0],
            Delivery::Room(_, ServerMessage::ReactionSent { player_name, .. }) if player_name == "Alice"
        ));
        assert_eq!(session.players[&alice].reactions.len(), 1);
        assert_eq!(session.players[&alice].score, 0);

        let unknown = session_event(&mut session, &quiz, reaction_msg(id, Uuid::new_v4()));
        assert!(matches!(unknown, Err(ServiceError::NotFound(_))));
    }

    #[derive(Default)]
    struct Recorder {
        deliveries: Mutex<Vec<Delivery>>,
    }

    impl Outbox for Recorder {
        fn subscribe(&self, session_id: Uuid) {
            self.deliveries.lock().unwrap().push(Delivery::Subscribe(session_id));
        }

        fn broadcast(&self, session_id: Uuid, message: &ServerMessage) {
            self.deliveries
                .lock()
                .unwrap()
                .push(Delivery::Room(session_id, message.clone()));
        }

        fn reply(&self, message: &ServerMessage) {
            self.deliveries.lock().unwrap().push(Delivery::Sender(message.clone()));
        }
    }

    async fn engine_fixture() -> (SessionEngine, Arc<dyn SessionStore>, Uuid) {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let (session, quiz) = fixture(PrizeMode::None);
        let session_id = session.id;
        store.insert_quiz(quiz).await.unwrap();
        store.insert_session(session).await.unwrap();
        (
            SessionEngine::new(store.clone(), Duration::from_secs(5)),
            store,
            session_id,
        )
    }

    #[tokio::test]
    async fn rejected_event_commits_and_delivers_nothing() {
        let (engine, store, session_id) = engine_fixture().await;
        let outbox = Recorder::default();

        let result = engine
            .execute(
                ClientMessage::EndQuestion(QuestionRef {
                    session_id,
                    question_index: 0,
                }),
                &outbox,
            )
            .await;

        assert!(matches!(result, Err(ServiceError::InvalidTransition(_))));
        assert!(outbox.deliveries.lock().unwrap().is_empty());
        let stored = store.require(session_id).await.unwrap();
        assert_eq!(stored.status(), SessionStatus::Waiting);
        assert_eq!(stored.machine.version(), 0);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (engine, _store, _) = engine_fixture().await;
        let result = engine
            .execute(
                ClientMessage::StartSession(SessionRef {
                    session_id: Uuid::new_v4(),
                }),
                &Recorder::default(),
            )
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_session_lock_times_out() {
        let (engine, store, session_id) = engine_fixture().await;
        let _held = store.lock_required(session_id).await.unwrap();

        let result = engine
            .execute(ClientMessage::StartSession(SessionRef { session_id }), &Recorder::default())
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));
    }
}
