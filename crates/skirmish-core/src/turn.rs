//! Whole-game turn order: initiative, rounds, elimination and victory.

use crate::actions::GameEvent;
use crate::board::Board;
use crate::player::{PlayerId, PlayerRecord, TeamId, TeamRecord};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Rule used once per game to fix the order players take turns in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InitiativePolicy {
    /// Order as configured
    #[default]
    Fixed,
    /// One shuffle at game start
    Random,
    /// Sides take turns one player at a time
    Alternating,
    /// Reserved; currently identical to `Fixed`
    Speed,
}

/// One participant in the win condition: a team in team play, otherwise a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Team(TeamId),
    Player(PlayerId),
}

/// How a finished game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Winner(Side),
    /// Nobody left standing, or the round limit was hit
    Draw,
}

/// Arrange players according to an initiative policy
pub fn arrange_initiative<R: Rng>(
    mut players: Vec<PlayerRecord>,
    policy: InitiativePolicy,
    rng: &mut R,
) -> Vec<PlayerRecord> {
    match policy {
        InitiativePolicy::Fixed | InitiativePolicy::Speed => players,
        InitiativePolicy::Random => {
            players.shuffle(rng);
            players
        }
        InitiativePolicy::Alternating => {
            players.sort_by_key(|p| (p.team_id, p.id));

            // Teamless players each form a side of their own
            let mut sides: Vec<VecDeque<PlayerRecord>> = Vec::new();
            for player in players {
                match sides.last_mut() {
                    Some(side)
                        if player.team_id.is_some()
                            && side.front().map(|p| p.team_id) == Some(player.team_id) =>
                    {
                        side.push_back(player)
                    }
                    _ => sides.push(VecDeque::from([player])),
                }
            }

            let mut order = Vec::new();
            while sides.iter().any(|side| !side.is_empty()) {
                for side in sides.iter_mut() {
                    if let Some(player) = side.pop_front() {
                        order.push(player);
                    }
                }
            }
            order
        }
    }
}

/// Turn order for a whole game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOrder {
    /// Players in the order they take turns
    players: Vec<PlayerRecord>,
    teams: Vec<TeamRecord>,
    current: usize,
    /// Round counter, starting at 1
    round: u32,
    team_play: bool,
}

impl TurnOrder {
    /// `players` must already be in initiative order and non-empty
    pub fn new(players: Vec<PlayerRecord>, team_play: bool) -> Self {
        let teams = TeamRecord::from_players(&players);
        Self {
            players,
            teams,
            current: 0,
            round: 1,
            team_play,
        }
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn teams(&self) -> &[TeamRecord] {
        &self.teams
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn team(&self, id: TeamId) -> Option<&TeamRecord> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn active_player(&self) -> &PlayerRecord {
        &self.players[self.current]
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn team_play(&self) -> bool {
        self.team_play
    }

    /// The side a player fights for
    pub fn side_of(&self, player: &PlayerRecord) -> Side {
        match (self.team_play, player.team_id) {
            (true, Some(team)) => Side::Team(team),
            _ => Side::Player(player.id),
        }
    }

    /// Whether units of `a` may attack units of `b`
    pub fn is_hostile(&self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return false;
        }
        match (self.player(a), self.player(b)) {
            (Some(pa), Some(pb)) => self.side_of(pa) != self.side_of(pb),
            _ => true,
        }
    }

    /// Move to the next player who is still in the game.
    /// Returns the new round number if the order wrapped around.
    pub(crate) fn advance(&mut self) -> Option<u32> {
        let len = self.players.len();
        let mut wrapped = false;

        for _ in 0..len {
            self.current += 1;
            if self.current >= len {
                self.current = 0;
                wrapped = true;
            }
            if !self.players[self.current].eliminated {
                break;
            }
        }

        if wrapped {
            self.round += 1;
            Some(self.round)
        } else {
            None
        }
    }

    /// Flag players without living units, and teams without surviving members
    pub(crate) fn update_eliminations(&mut self, board: &Board) -> Vec<GameEvent> {
        let mut events = Vec::new();

        for player in self.players.iter_mut().filter(|p| !p.eliminated) {
            if board.living_unit_count(player.id) == 0 {
                player.eliminated = true;
                debug!(player = player.id, "player eliminated");
                events.push(GameEvent::PlayerEliminated { player: player.id });
            }
        }

        if self.team_play {
            for team in self.teams.iter_mut().filter(|t| !t.eliminated) {
                let all_out = team.member_player_ids.iter().all(|id| {
                    self.players
                        .iter()
                        .find(|p| p.id == *id)
                        .map_or(true, |p| p.eliminated)
                });
                if all_out {
                    team.eliminated = true;
                    debug!(team = team.id, "team eliminated");
                    events.push(GameEvent::TeamEliminated { team: team.id });
                }
            }
        }

        events
    }

    /// The result of the game if it is decided, based on the elimination flags
    pub fn outcome(&self) -> Option<GameOutcome> {
        let mut remaining: Vec<Side> = Vec::new();
        for player in self.players.iter().filter(|p| !p.eliminated) {
            let side = self.side_of(player);
            if !remaining.contains(&side) {
                remaining.push(side);
            }
        }

        match remaining.as_slice() {
            [] => Some(GameOutcome::Draw),
            [winner] => Some(GameOutcome::Winner(*winner)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Terrain;
    use crate::hex::GridPosition;
    use crate::player::PlayerKind;
    use crate::unit::UnitStats;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn player(id: PlayerId, team: Option<TeamId>) -> PlayerRecord {
        let record = PlayerRecord::new(id, format!("P{}", id), PlayerKind::Human);
        match team {
            Some(team) => record.on_team(team),
            None => record,
        }
    }

    fn ids(players: &[PlayerRecord]) -> Vec<PlayerId> {
        players.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_fixed_and_speed_keep_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let players = vec![player(2, None), player(0, None), player(1, None)];

        let fixed = arrange_initiative(players.clone(), InitiativePolicy::Fixed, &mut rng);
        assert_eq!(ids(&fixed), vec![2, 0, 1]);

        let speed = arrange_initiative(players, InitiativePolicy::Speed, &mut rng);
        assert_eq!(ids(&speed), vec![2, 0, 1]);
    }

    #[test]
    fn test_random_is_a_seeded_permutation() {
        let players: Vec<_> = (0..6).map(|id| player(id, None)).collect();

        let a = arrange_initiative(
            players.clone(),
            InitiativePolicy::Random,
            &mut StdRng::seed_from_u64(7),
        );
        let b = arrange_initiative(
            players,
            InitiativePolicy::Random,
            &mut StdRng::seed_from_u64(7),
        );

        assert_eq!(ids(&a), ids(&b));
        let mut sorted = ids(&a);
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_alternating_ping_pongs_between_teams() {
        let mut rng = StdRng::seed_from_u64(1);
        let players = vec![
            player(0, Some(1)),
            player(1, Some(1)),
            player(2, Some(0)),
            player(3, Some(0)),
            player(4, Some(1)),
        ];

        let order = arrange_initiative(players, InitiativePolicy::Alternating, &mut rng);
        // Team 0 = {2, 3}, team 1 = {0, 1, 4}
        assert_eq!(ids(&order), vec![2, 0, 3, 1, 4]);
    }

    #[test]
    fn test_advance_wraps_and_counts_rounds() {
        let mut order = TurnOrder::new(vec![player(0, None), player(1, None)], false);
        assert_eq!(order.round(), 1);
        assert_eq!(order.active_player().id, 0);

        assert_eq!(order.advance(), None);
        assert_eq!(order.active_player().id, 1);

        assert_eq!(order.advance(), Some(2));
        assert_eq!(order.active_player().id, 0);
    }

    #[test]
    fn test_advance_skips_eliminated() {
        let mut order = TurnOrder::new(
            vec![player(0, None), player(1, None), player(2, None)],
            false,
        );
        order.players[1].eliminated = true;

        order.advance();
        assert_eq!(order.active_player().id, 2);
    }

    #[test]
    fn test_hostility_respects_team_play() {
        let players = vec![player(0, Some(0)), player(1, Some(0)), player(2, Some(1))];

        let teams = TurnOrder::new(players.clone(), true);
        assert!(teams.team_play());
        assert!(!teams.is_hostile(0, 1));
        assert!(teams.is_hostile(0, 2));
        assert!(!teams.is_hostile(2, 2));

        let free_for_all = TurnOrder::new(players, false);
        assert!(!free_for_all.team_play());
        assert!(free_for_all.is_hostile(0, 1));
    }

    #[test]
    fn test_team_victory() {
        let mut board = Board::filled(4, 4, Terrain::Grass).unwrap();
        board
            .spawn_unit(1, UnitStats::infantry(), GridPosition::new(0, 0))
            .unwrap();

        let players = vec![player(0, Some(0)), player(1, Some(0)), player(2, Some(1))];
        let mut order = TurnOrder::new(players, true);

        let events = order.update_eliminations(&board);
        assert!(events.contains(&GameEvent::PlayerEliminated { player: 0 }));
        assert!(events.contains(&GameEvent::PlayerEliminated { player: 2 }));
        assert!(events.contains(&GameEvent::TeamEliminated { team: 1 }));
        assert!(!events.contains(&GameEvent::TeamEliminated { team: 0 }));
        assert_eq!(order.teams().len(), 2);
        assert!(order.team(1).unwrap().eliminated);
        let survivors = order.team(0).unwrap();
        assert!(!survivors.eliminated);
        assert_eq!(
            survivors.member_player_ids.iter().copied().collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert!(order.team(7).is_none());

        assert_eq!(order.outcome(), Some(GameOutcome::Winner(Side::Team(0))));
    }

    #[test]
    fn test_individual_victory_and_draw() {
        let mut board = Board::filled(4, 4, Terrain::Grass).unwrap();
        let players = vec![player(0, None), player(1, None)];

        let mut order = TurnOrder::new(players.clone(), false);
        let id = board
            .spawn_unit(0, UnitStats::infantry(), GridPosition::new(0, 0))
            .unwrap();
        board
            .spawn_unit(1, UnitStats::infantry(), GridPosition::new(1, 1))
            .unwrap();
        order.update_eliminations(&board);
        assert_eq!(order.outcome(), None);

        board.apply_damage(id, 1000).unwrap();
        order.update_eliminations(&board);
        assert_eq!(order.outcome(), Some(GameOutcome::Winner(Side::Player(1))));

        let empty = Board::filled(2, 2, Terrain::Grass).unwrap();
        let mut order = TurnOrder::new(players, false);
        order.update_eliminations(&empty);
        assert_eq!(order.outcome(), Some(GameOutcome::Draw));
    }
}
