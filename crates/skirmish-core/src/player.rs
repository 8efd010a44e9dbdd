//! Player and team records.
//!
//! This module contains:
//! - Player identifiers and the human/AI split
//! - `PlayerRecord` with its elimination flag
//! - `TeamRecord` grouping players for team play

use crate::bot::{AiProfile, BotDifficulty};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Player identifier
pub type PlayerId = u8;

/// Team identifier
pub type TeamId = u8;

/// Who is making the decisions for a player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerKind {
    /// Decisions arrive from outside the engine
    Human,
    /// Decisions are made by a `Bot` with this profile
    Ai(AiProfile),
}

impl PlayerKind {
    /// AI player using one of the difficulty presets
    pub fn ai(difficulty: BotDifficulty) -> Self {
        PlayerKind::Ai(difficulty.profile())
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, PlayerKind::Ai(_))
    }

    /// The AI profile, if this is a computer player
    pub fn ai_profile(&self) -> Option<AiProfile> {
        match self {
            PlayerKind::Human => None,
            PlayerKind::Ai(profile) => Some(*profile),
        }
    }
}

/// A participant in the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub display_name: String,
    pub kind: PlayerKind,
    pub team_id: Option<TeamId>,
    /// Set once the player owns no living units
    pub eliminated: bool,
}

impl PlayerRecord {
    pub fn new(id: PlayerId, display_name: impl Into<String>, kind: PlayerKind) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            kind,
            team_id: None,
            eliminated: false,
        }
    }

    /// Builder-style team assignment
    pub fn on_team(mut self, team: TeamId) -> Self {
        self.team_id = Some(team);
        self
    }

    pub fn is_ai(&self) -> bool {
        self.kind.is_ai()
    }
}

/// A group of players that win or lose together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: TeamId,
    pub member_player_ids: BTreeSet<PlayerId>,
    /// Set once every member is eliminated
    pub eliminated: bool,
}

impl TeamRecord {
    pub fn new(id: TeamId) -> Self {
        Self {
            id,
            member_player_ids: BTreeSet::new(),
            eliminated: false,
        }
    }

    /// Collect team records from the `team_id` of each player, ordered by team id
    pub fn from_players(players: &[PlayerRecord]) -> Vec<TeamRecord> {
        let mut teams: Vec<TeamRecord> = Vec::new();
        for player in players {
            let Some(team_id) = player.team_id else {
                continue;
            };
            match teams.iter_mut().find(|t| t.id == team_id) {
                Some(team) => {
                    team.member_player_ids.insert(player.id);
                }
                None => {
                    let mut team = TeamRecord::new(team_id);
                    team.member_player_ids.insert(player.id);
                    teams.push(team);
                }
            }
        }
        teams.sort_by_key(|t| t.id);
        teams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_kind_helpers() {
        assert!(!PlayerKind::Human.is_ai());
        assert!(PlayerKind::Human.ai_profile().is_none());

        let ai = PlayerKind::ai(BotDifficulty::Hard);
        assert!(ai.is_ai());
        assert_eq!(ai.ai_profile(), Some(BotDifficulty::Hard.profile()));
    }

    #[test]
    fn test_teams_from_players() {
        let players = vec![
            PlayerRecord::new(0, "A1", PlayerKind::Human).on_team(1),
            PlayerRecord::new(1, "B1", PlayerKind::Human).on_team(0),
            PlayerRecord::new(2, "A2", PlayerKind::Human).on_team(1),
            PlayerRecord::new(3, "Loner", PlayerKind::Human),
        ];

        let teams = TeamRecord::from_players(&players);
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].id, 0);
        assert_eq!(teams[0].member_player_ids, BTreeSet::from([1]));
        assert_eq!(teams[1].member_player_ids, BTreeSet::from([0, 2]));
    }
}
