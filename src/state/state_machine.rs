use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle states of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Lobby: players are joining, nothing has started.
    #[default]
    Waiting,
    /// Host started the session; no question shown yet.
    Started,
    /// A question is open for answers.
    QuestionActive,
    /// The current question is closed and the leaderboard is displayed.
    QuestionResults,
    /// Terminal state; the final leaderboard and winners were published.
    Ended,
}

/// Events that can be applied to a session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new player was admitted into the session.
    PlayerJoined,
    /// Host starts the session from the lobby.
    Start,
    /// Host opens the question at `index`.
    StartQuestion {
        /// Zero-based index into the quiz questions.
        index: usize,
    },
    /// A player answered the active question.
    AnswerSubmitted,
    /// Host closes the active question.
    EndQuestion,
    /// Host ends the whole session.
    End,
    /// A player sent a reaction.
    ReactionSent,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the session was in when the invalid event was received.
    pub from: SessionStatus,
    /// The event that cannot be applied from this status.
    pub event: SessionEvent,
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// Session status changed since the plan was created.
    PhaseMismatch {
        /// Status when the plan was created.
        expected: SessionStatus,
        /// Current status.
        actual: SessionStatus,
    },
    /// Session version changed since the plan was created.
    VersionMismatch {
        /// Version the plan expects after applying.
        expected: u64,
        /// Version the machine would reach instead.
        actual: u64,
    },
}

/// A validated transition that has not been applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Status the session is currently in.
    pub from: SessionStatus,
    /// Status the session will transition to.
    pub to: SessionStatus,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: u64,
}

/// Per-session state machine enforcing the host-driven quiz flow.
///
/// Nothing advances on its own: every transition comes from an explicit event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStateMachine {
    status: SessionStatus,
    version: u64,
}

impl SessionStateMachine {
    /// Create a new state machine in the waiting state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Validate that `event` can be applied from the current status.
    pub fn plan(&self, event: SessionEvent) -> Result<Plan, InvalidTransition> {
        let to = self.compute_transition(&event)?;
        Ok(Plan {
            from: self.status,
            to,
            event,
            version_next: self.version + 1,
        })
    }

    /// Apply a plan produced by [`Self::plan`] on this same machine.
    ///
    /// The engine plans and applies within one locked, synchronous step, so these checks only
    /// trip on misuse: a plan replayed after it was applied, or computed on another copy of
    /// the session. [`Plan`] is a plain value and stays checked wherever it travels.
    pub fn apply(&mut self, plan: Plan) -> Result<SessionStatus, ApplyError> {
        if self.status != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.status,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.status = plan.to;
        self.version = plan.version_next;
        Ok(self.status)
    }

    fn compute_transition(&self, event: &SessionEvent) -> Result<SessionStatus, InvalidTransition> {
        use SessionStatus::*;

        let next = match (self.status, event) {
            (Ended, SessionEvent::PlayerJoined) => return Err(self.invalid(event)),
            (current, SessionEvent::PlayerJoined) => current,
            (Waiting, SessionEvent::Start) => Started,
            (Started | QuestionResults, SessionEvent::StartQuestion { .. }) => QuestionActive,
            (QuestionActive, SessionEvent::AnswerSubmitted) => QuestionActive,
            (QuestionActive, SessionEvent::EndQuestion) => QuestionResults,
            (Ended, SessionEvent::End) => return Err(self.invalid(event)),
            (_, SessionEvent::End) => Ended,
            (current, SessionEvent::ReactionSent) => current,
            _ => return Err(self.invalid(event)),
        };

        Ok(next)
    }

    fn invalid(&self, event: &SessionEvent) -> InvalidTransition {
        InvalidTransition {
            from: self.status,
            event: event.clone(),
        }
    }
}
