use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{validation::validate_join_code, ws::SessionSnapshot},
    state::session::PrizeMode,
};

/// Payload used to open a session for an existing quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Quiz to play; must exist.
    pub quiz_id: Uuid,
    /// Defaults to an anonymous host.
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub host_id: Option<String>,
    /// Defaults to `none`.
    #[serde(default)]
    pub prize_mode: Option<PrizeMode>,
}

/// Query string of `GET /sessions`.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SessionQuery {
    /// Code shown by the host, case-insensitive. Without it every session is listed.
    #[serde(default)]
    #[validate(custom(function = "validate_join_code"))]
    pub join_code: Option<String>,
}

/// Body of `GET /sessions`: the session owning the code, or all sessions.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SessionLookup {
    /// Match for the requested join code.
    One(SessionSnapshot),
    /// Every session, oldest first.
    All(Vec<SessionSnapshot>),
}

/// Payload of the demo endpoint adding a player without a socket.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DemoPlayerRequest {
    /// Session receiving the player.
    pub session_id: Uuid,
    /// Display name, trimmed before use.
    #[validate(length(min = 1, max = 100))]
    pub player_name: String,
}
