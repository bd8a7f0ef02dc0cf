use rand::seq::IndexedRandom;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    services::leaderboard::LeaderboardEntry,
    state::session::{Player, PrizeMode},
};

/// Number of winners announced in top score mode.
const TOP_SCORE_WINNERS: usize = 3;

/// Player selected by the prize resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrizeWinner {
    /// Winning player.
    pub player_id: Uuid,
    /// Display name of that player.
    pub player_name: String,
}

/// Pick the winners of a finished session according to `mode`.
///
/// Raffle and wheel draws ignore scores and use the thread-local RNG.
pub fn resolve(mode: PrizeMode, leaderboard: &[LeaderboardEntry], players: &[Player]) -> Vec<PrizeWinner> {
    match mode {
        PrizeMode::None => Vec::new(),
        PrizeMode::TopScore => leaderboard
            .iter()
            .take(TOP_SCORE_WINNERS)
            .map(|entry| PrizeWinner {
                player_id: entry.player_id,
                player_name: entry.player_name.clone(),
            })
            .collect(),
        PrizeMode::RandomRaffle | PrizeMode::SpinWheel => players
            .choose(&mut rand::rng())
            .map(|player| PrizeWinner {
                player_id: player.id,
                player_name: player.name.clone(),
            })
            .into_iter()
            .collect(),
    }
}
