use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::session::Player;

/// Ranked projection of a player, derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Ranked player.
    pub player_id: Uuid,
    /// Display name of that player.
    pub player_name: String,
    /// Score at the time the board was built.
    pub score: u64,
    /// 1-based position; tied scores still get distinct consecutive ranks.
    pub rank: usize,
}

/// Rank players by score, highest first.
///
/// Equal scores keep the order of `players` (join order), since `sort_by` is stable.
pub fn build(players: &[Player]) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&Player> = players.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, player)| LeaderboardEntry {
            player_id: player.id,
            player_name: player.name.clone(),
            score: player.score,
            rank: index + 1,
        })
        .collect()
}
