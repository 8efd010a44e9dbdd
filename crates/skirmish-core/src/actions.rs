//! Player inputs and the notifications they produce.
//!
//! This module defines all possible actions a player can take and the events
//! the engine emits for presentation layers to consume.

use crate::board::Terrain;
use crate::game::GamePhase;
use crate::hex::GridPosition;
use crate::player::{PlayerId, TeamId};
use crate::turn::GameOutcome;
use crate::unit::UnitId;
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Pick one of your units to act with
    SelectUnit(UnitId),
    /// Pick a tile: a move destination, an attack target, or the selected
    /// unit's own tile to hold position / wait
    SelectTile(GridPosition),
    /// Drop the current selection without spending anything
    CancelSelection,
    /// End your turn
    EndTurn,
}

/// Why a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEndReason {
    /// The player asked for it
    Requested,
    /// Every unit of the player was spent
    AutoEnd,
    /// The turn time limit ran out
    TimeLimit,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The phase machine changed state
    PhaseChanged { from: GamePhase, to: GamePhase },

    /// A player's turn began
    TurnStarted { player: PlayerId, round: u32 },

    /// The turn order wrapped around
    RoundStarted { round: u32 },

    /// A unit changed tiles
    UnitMoved {
        unit: UnitId,
        from: GridPosition,
        to: GridPosition,
    },

    /// A unit took damage from an attack
    UnitDamaged {
        attacker: UnitId,
        target: UnitId,
        damage: u32,
        remaining_health: u32,
    },

    /// A unit was removed from the board
    UnitDied {
        unit: UnitId,
        owner: PlayerId,
        at: GridPosition,
    },

    /// A gameplay-only terrain kind was swapped
    TerrainChanged {
        at: GridPosition,
        from: Terrain,
        to: Terrain,
    },

    /// A turn ended
    TurnEnded {
        player: PlayerId,
        reason: TurnEndReason,
    },

    /// A player lost their last unit
    PlayerEliminated { player: PlayerId },

    /// Every member of a team was eliminated
    TeamEliminated { team: TeamId },

    /// The game finished
    GameFinished { outcome: GameOutcome },
}
