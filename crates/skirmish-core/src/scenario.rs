//! Map input and game setup.
//!
//! This module contains:
//! - The `MapSource` contract the board is built from
//! - `TerrainGrid`, a text-row map format
//! - `Scenario`, a serializable description of a whole game

use crate::board::{Board, Terrain};
use crate::bot::{AiProfile, BotDifficulty};
use crate::config::GameConfig;
use crate::game::{GameError, GameSession};
use crate::hex::GridPosition;
use crate::player::{PlayerId, PlayerKind, PlayerRecord, TeamId};
use crate::unit::UnitStats;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Anything that can describe the terrain of a rectangular map
pub trait MapSource {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    /// Terrain at an in-bounds position
    fn terrain_at(&self, pos: GridPosition) -> Terrain;
}

/// Errors raised while building a game
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Map has no tiles")]
    EmptyMap,

    #[error("Map row {row} has {found} tiles, expected {expected}")]
    RaggedMap {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unknown terrain symbol {symbol:?} at row {row}, column {col}")]
    UnknownTerrain { symbol: char, row: usize, col: usize },

    #[error("Map has no passable tiles")]
    NoPassableTiles,

    #[error("Game needs at least one player")]
    NoPlayers,

    #[error("Player {0} is listed twice")]
    DuplicatePlayer(PlayerId),

    #[error("Unit owner {0} is not a player")]
    UnknownOwner(PlayerId),

    #[error("Player {0} has no units")]
    PlayerWithoutUnits(PlayerId),

    #[error("Cannot place unit at {position}: {source}")]
    Spawn {
        position: GridPosition,
        source: GameError,
    },

    #[error("Invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Terrain stored as rows, `rows[row][col]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    rows: Vec<Vec<Terrain>>,
}

impl TerrainGrid {
    /// Grid of one terrain kind
    pub fn filled(width: i32, height: i32, terrain: Terrain) -> Self {
        let width = width.max(0) as usize;
        let height = height.max(0) as usize;
        Self {
            rows: vec![vec![terrain; width]; height],
        }
    }

    /// Parse text rows of terrain symbols (see [`Terrain::symbol`]).
    /// Line `i` becomes row `i`.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self, SetupError> {
        let mut rows = Vec::with_capacity(lines.len());

        for (row, line) in lines.iter().enumerate() {
            let parsed = line
                .as_ref()
                .chars()
                .enumerate()
                .map(|(col, symbol)| {
                    Terrain::from_symbol(symbol).ok_or(SetupError::UnknownTerrain {
                        symbol,
                        row,
                        col,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(parsed);
        }

        let expected = rows.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(SetupError::EmptyMap);
        }
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(SetupError::RaggedMap {
                row,
                expected,
                found,
            });
        }

        Ok(Self { rows })
    }

    /// Text rows in the format accepted by [`TerrainGrid::parse`]
    pub fn to_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Terrain::symbol).collect())
            .collect()
    }
}

impl MapSource for TerrainGrid {
    fn width(&self) -> i32 {
        self.rows.first().map_or(0, Vec::len) as i32
    }

    fn height(&self) -> i32 {
        self.rows.len() as i32
    }

    fn terrain_at(&self, pos: GridPosition) -> Terrain {
        self.rows
            .get(pos.row as usize)
            .and_then(|row| row.get(pos.col as usize))
            .copied()
            .unwrap_or_default()
    }
}

/// Who controls a player in a scenario file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Controller {
    Human,
    Ai(BotDifficulty),
    CustomAi(AiProfile),
}

impl From<Controller> for PlayerKind {
    fn from(controller: Controller) -> Self {
        match controller {
            Controller::Human => PlayerKind::Human,
            Controller::Ai(difficulty) => PlayerKind::ai(difficulty),
            Controller::CustomAi(profile) => PlayerKind::Ai(profile),
        }
    }
}

/// A player entry in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub id: PlayerId,
    pub name: String,
    pub controller: Controller,
    #[serde(default)]
    pub team: Option<TeamId>,
}

impl PlayerSetup {
    fn to_record(&self) -> PlayerRecord {
        let record = PlayerRecord::new(self.id, self.name.clone(), self.controller.into());
        match self.team {
            Some(team) => record.on_team(team),
            None => record,
        }
    }
}

/// A unit to place at game start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPlacement {
    pub owner: PlayerId,
    pub at: GridPosition,
    #[serde(default)]
    pub stats: UnitStats,
}

/// Everything needed to start a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub config: GameConfig,
    /// Text rows, see [`TerrainGrid::parse`]
    pub map: Vec<String>,
    pub players: Vec<PlayerSetup>,
    pub units: Vec<UnitPlacement>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SetupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the board, place units and start the game
    pub fn build(&self) -> Result<GameSession, SetupError> {
        let grid = TerrainGrid::parse(&self.map)?;
        let mut board = Board::from_source(&grid)?;

        if self.players.is_empty() {
            return Err(SetupError::NoPlayers);
        }
        for placement in &self.units {
            if !self.players.iter().any(|p| p.id == placement.owner) {
                return Err(SetupError::UnknownOwner(placement.owner));
            }
            board
                .spawn_unit(placement.owner, placement.stats, placement.at)
                .map_err(|source| SetupError::Spawn {
                    position: placement.at,
                    source,
                })?;
        }

        let players = self.players.iter().map(PlayerSetup::to_record).collect();
        GameSession::new(board, players, self.config.clone())
    }

    /// Built-in two-player map used when no scenario is given
    pub fn border_clash() -> Self {
        let map = [
            "..h...m...",
            "..h..ww...",
            ".....wW...",
            "...c..W.h.",
            ".h....w...",
            "....m.....",
            "...ww..h..",
            "........r.",
        ];
        let units = [
            (0, (0, 1), UnitStats::infantry()),
            (0, (1, 3), UnitStats::archer()),
            (0, (0, 5), UnitStats::cavalry()),
            (1, (9, 2), UnitStats::infantry()),
            (1, (8, 4), UnitStats::archer()),
            (1, (9, 6), UnitStats::cavalry()),
        ];

        Self {
            name: "Border Clash".to_string(),
            config: GameConfig {
                max_rounds: Some(60),
                ..GameConfig::default()
            },
            map: map.iter().map(|row| row.to_string()).collect(),
            players: vec![
                PlayerSetup {
                    id: 0,
                    name: "West".to_string(),
                    controller: Controller::Ai(BotDifficulty::Medium),
                    team: None,
                },
                PlayerSetup {
                    id: 1,
                    name: "East".to_string(),
                    controller: Controller::Ai(BotDifficulty::Hard),
                    team: None,
                },
            ],
            units: units
                .into_iter()
                .map(|(owner, (col, row), stats)| UnitPlacement {
                    owner,
                    at: GridPosition::new(col, row),
                    stats,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grid() {
        let grid = TerrainGrid::parse(&[".hW", "crs"]).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.terrain_at(GridPosition::new(1, 0)), Terrain::Hills);
        assert_eq!(grid.terrain_at(GridPosition::new(2, 0)), Terrain::DeepWater);
        assert_eq!(grid.terrain_at(GridPosition::new(0, 1)), Terrain::City);
        assert_eq!(grid.to_lines(), vec![".hW", "crs"]);
    }

    #[test]
    fn test_parse_errors() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            TerrainGrid::parse(&empty),
            Err(SetupError::EmptyMap)
        ));
        assert!(matches!(
            TerrainGrid::parse(&["...", ".."]),
            Err(SetupError::RaggedMap {
                row: 1,
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            TerrainGrid::parse(&["..x"]),
            Err(SetupError::UnknownTerrain {
                symbol: 'x',
                row: 0,
                col: 2
            })
        ));
    }

    #[test]
    fn test_border_clash_builds() {
        let scenario = Scenario::border_clash();
        let game = scenario.build().unwrap();

        assert_eq!(game.board().width(), 10);
        assert_eq!(game.board().height(), 8);
        assert_eq!(game.board().units().count(), 6);
        assert_eq!(game.turns().players().len(), 2);
        assert!(game.turns().players().iter().all(|p| p.is_ai()));
    }

    #[test]
    fn test_scenario_json_round_trip() {
        let scenario = Scenario::border_clash();
        let json = scenario.to_json().unwrap();
        assert_eq!(Scenario::from_json(&json).unwrap(), scenario);
    }

    #[test]
    fn test_minimal_json_scenario() {
        let json = r#"{
            "name": "tiny",
            "map": ["...", "..."],
            "players": [
                {"id": 0, "name": "A", "controller": "Human"},
                {"id": 1, "name": "B", "controller": {"Ai": "Easy"}}
            ],
            "units": [
                {"owner": 0, "at": {"col": 0, "row": 0}},
                {"owner": 1, "at": {"col": 2, "row": 1}}
            ]
        }"#;

        let game = Scenario::from_json(json).unwrap().build().unwrap();
        assert_eq!(game.config(), &GameConfig::default());
        assert_eq!(game.board().units().next().unwrap().max_health, 100);
    }

    #[test]
    fn test_build_errors() {
        let mut scenario = Scenario::border_clash();
        scenario.units[0].owner = 9;
        assert!(matches!(
            scenario.build(),
            Err(SetupError::UnknownOwner(9))
        ));

        let mut scenario = Scenario::border_clash();
        // Deep water at (6, 2)
        scenario.units[0].at = GridPosition::new(6, 2);
        assert!(matches!(
            scenario.build(),
            Err(SetupError::Spawn {
                source: GameError::IllegalMove { .. },
                ..
            })
        ));

        assert!(matches!(
            Scenario::from_json("{ not json"),
            Err(SetupError::Parse(_))
        ));
    }
}
