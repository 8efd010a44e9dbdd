//! Core game state machine.
//!
//! This module contains the `GameSession` struct, the per-turn phase machine
//! and all rules for moving, attacking and ending turns.

use crate::actions::{GameAction, GameEvent, TurnEndReason};
use crate::board::{Board, Terrain};
use crate::combat::damage_against;
use crate::config::GameConfig;
use crate::hex::GridPosition;
use crate::player::{PlayerId, PlayerRecord};
use crate::scenario::SetupError;
use crate::turn::{arrange_initiative, GameOutcome, Side, TurnOrder};
use crate::unit::{Unit, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the active player to pick a unit
    SelectingUnit,

    /// A unit is selected and may move
    MovingUnit { unit: UnitId },

    /// A unit has moved and may attack
    ChoosingAttackTarget { unit: UnitId },

    /// Transient: the turn is being wrapped up
    EndingTurn,

    /// Game is over
    GameOver { outcome: GameOutcome },
}

impl GamePhase {
    /// The unit currently selected, if any
    pub fn selected_unit(&self) -> Option<UnitId> {
        match self {
            GamePhase::MovingUnit { unit } | GamePhase::ChoosingAttackTarget { unit } => {
                Some(*unit)
            }
            _ => None,
        }
    }
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Position {0} is outside the board")]
    OutOfBounds(GridPosition),

    #[error("Cannot move to {to}")]
    IllegalMove { unit: Option<UnitId>, to: GridPosition },

    #[error("Unit {attacker} cannot attack {at}")]
    IllegalAttack { attacker: UnitId, at: GridPosition },

    #[error("Invalid action for current phase")]
    InvalidPhaseOperation,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Unit {0} belongs to another player")]
    NotYourUnit(UnitId),

    #[error("Unit {0} has already moved and attacked")]
    UnitSpent(UnitId),

    #[error("No living unit {0}")]
    UnknownUnit(UnitId),

    #[error("Cannot change terrain at {at} from {from:?} to {to:?}")]
    IllegalTerrainChange {
        at: GridPosition,
        from: Terrain,
        to: Terrain,
    },

    #[error("Game is over")]
    GameOver,
}

/// A running game: board, turn order and the per-turn phase machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    board: Board,
    turns: TurnOrder,
    phase: GamePhase,
    config: GameConfig,
    /// Time spent in the current turn, as reported through `tick`
    turn_elapsed: Duration,
}

impl GameSession {
    /// Create a game from a populated board.
    ///
    /// Players are arranged by the configured initiative policy and the first
    /// player's turn is started.
    pub fn new(
        board: Board,
        players: Vec<PlayerRecord>,
        config: GameConfig,
    ) -> Result<Self, SetupError> {
        if players.is_empty() {
            return Err(SetupError::NoPlayers);
        }

        let mut seen = HashSet::new();
        for player in &players {
            if !seen.insert(player.id) {
                return Err(SetupError::DuplicatePlayer(player.id));
            }
        }
        if let Some(unit) = board.units().find(|u| !seen.contains(&u.owner)) {
            return Err(SetupError::UnknownOwner(unit.owner));
        }
        if let Some(player) = players
            .iter()
            .find(|p| board.living_unit_count(p.id) == 0)
        {
            return Err(SetupError::PlayerWithoutUnits(player.id));
        }

        let mut rng = config.rng();
        let ordered = arrange_initiative(players, config.initiative, &mut rng);
        let turns = TurnOrder::new(ordered, config.team_play);

        let mut session = Self {
            board,
            turns,
            phase: GamePhase::SelectingUnit,
            config,
            turn_elapsed: Duration::ZERO,
        };
        let first = session.turns.active_player().id;
        session.board.reset_turn_flags(first);

        info!(
            players = session.turns.players().len(),
            first_player = first,
            "game started"
        );
        Ok(session)
    }

    /// Events describing the start of the game, for hosts that announce it
    pub fn opening_events(&self) -> Vec<GameEvent> {
        vec![
            GameEvent::RoundStarted { round: 1 },
            GameEvent::TurnStarted {
                player: self.turns.active_player().id,
                round: 1,
            },
        ]
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turns(&self) -> &TurnOrder {
        &self.turns
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn active_player(&self) -> &PlayerRecord {
        self.turns.active_player()
    }

    pub fn active_player_id(&self) -> PlayerId {
        self.turns.active_player().id
    }

    pub fn round(&self) -> u32 {
        self.turns.round()
    }

    pub fn turn_elapsed(&self) -> Duration {
        self.turn_elapsed
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::GameOver { .. })
    }

    /// How the game ended, once it has
    pub fn outcome(&self) -> Option<GameOutcome> {
        match self.phase {
            GamePhase::GameOver { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// The winning side, if the game ended with one
    pub fn winner(&self) -> Option<Side> {
        match self.outcome() {
            Some(GameOutcome::Winner(side)) => Some(side),
            _ => None,
        }
    }

    pub fn is_hostile(&self, a: PlayerId, b: PlayerId) -> bool {
        self.turns.is_hostile(a, b)
    }

    /// Tiles the unit could move to right now
    pub fn movement_range(&self, unit: UnitId) -> HashSet<GridPosition> {
        self.board.movement_range(unit)
    }

    /// Hostile living units within the unit's attack range, in id order
    pub fn attack_targets(&self, unit: UnitId) -> Vec<UnitId> {
        let Some(attacker) = self.board.unit(unit) else {
            return Vec::new();
        };
        self.board
            .units_within(attacker.position, attacker.attack_range)
            .filter(|target| self.is_hostile(attacker.owner, target.owner))
            .map(|target| target.id)
            .collect()
    }

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();
        if self.is_finished() || player != self.active_player_id() {
            return actions;
        }

        let selected = self.phase.selected_unit();
        let selectable = self
            .board
            .units_owned_by(player)
            .filter(|u| u.can_act() && Some(u.id) != selected)
            .map(|u| GameAction::SelectUnit(u.id));

        match self.phase {
            GamePhase::SelectingUnit => {
                actions.extend(selectable);
            }

            GamePhase::MovingUnit { unit } => {
                if let Some(u) = self.board.unit(unit) {
                    let mut tiles: Vec<_> = self.movement_range(unit).into_iter().collect();
                    tiles.sort();
                    actions.push(GameAction::SelectTile(u.position));
                    actions.extend(tiles.into_iter().map(GameAction::SelectTile));
                }
                actions.push(GameAction::CancelSelection);
                actions.extend(selectable);
            }

            GamePhase::ChoosingAttackTarget { unit } => {
                if let Some(u) = self.board.unit(unit) {
                    actions.push(GameAction::SelectTile(u.position));
                    for target in self.attack_targets(unit) {
                        if let Some(t) = self.board.unit(target) {
                            actions.push(GameAction::SelectTile(t.position));
                        }
                    }
                }
                actions.push(GameAction::CancelSelection);
                actions.extend(selectable);
            }

            GamePhase::EndingTurn | GamePhase::GameOver { .. } => return actions,
        }

        // Can always end turn
        actions.push(GameAction::EndTurn);
        actions
    }

    /// Apply an action to the game state
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        // Check game not over
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if player != self.active_player_id() {
            return Err(GameError::NotYourTurn);
        }

        let mut events = match action {
            GameAction::SelectUnit(unit) => self.handle_select_unit(player, unit)?,
            GameAction::SelectTile(pos) => self.handle_select_tile(pos)?,
            GameAction::CancelSelection => self.handle_cancel()?,
            GameAction::EndTurn => return Ok(self.end_turn(TurnEndReason::Requested)),
        };

        if self.auto_end_due() {
            events.extend(self.end_turn(TurnEndReason::AutoEnd));
        }

        Ok(events)
    }

    pub fn select_unit(
        &mut self,
        player: PlayerId,
        unit: UnitId,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::SelectUnit(unit))
    }

    pub fn select_tile(
        &mut self,
        player: PlayerId,
        pos: GridPosition,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::SelectTile(pos))
    }

    pub fn cancel_selection(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::CancelSelection)
    }

    pub fn request_end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::EndTurn)
    }

    /// Advance the turn clock, ending the turn once the time limit is reached
    pub fn tick(&mut self, dt: Duration) -> Vec<GameEvent> {
        let Some(limit) = self.config.turn_time_limit() else {
            return Vec::new();
        };
        if self.is_finished() {
            return Vec::new();
        }

        self.turn_elapsed += dt;
        if self.turn_elapsed >= limit {
            debug!(player = self.active_player_id(), "turn time limit reached");
            self.end_turn(TurnEndReason::TimeLimit)
        } else {
            Vec::new()
        }
    }

    /// End the current turn because its time ran out, whatever the phase
    pub fn expire_turn(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        Ok(self.end_turn(TurnEndReason::TimeLimit))
    }

    /// Swap a gameplay-only terrain kind, for scenario scripting
    pub fn replace_gameplay_terrain(
        &mut self,
        at: GridPosition,
        terrain: Terrain,
    ) -> Result<Vec<GameEvent>, GameError> {
        let from = self.board.replace_gameplay_terrain(at, terrain)?;
        Ok(vec![GameEvent::TerrainChanged {
            at,
            from,
            to: terrain,
        }])
    }

    // ==================== Selection ====================

    fn handle_select_unit(
        &mut self,
        player: PlayerId,
        id: UnitId,
    ) -> Result<Vec<GameEvent>, GameError> {
        if !matches!(
            self.phase,
            GamePhase::SelectingUnit
                | GamePhase::MovingUnit { .. }
                | GamePhase::ChoosingAttackTarget { .. }
        ) {
            return Err(GameError::InvalidPhaseOperation);
        }

        let unit = self.board.unit(id).ok_or(GameError::UnknownUnit(id))?;
        if unit.owner != player {
            return Err(GameError::NotYourUnit(id));
        }
        if unit.is_spent() {
            return Err(GameError::UnitSpent(id));
        }

        let next = if unit.has_moved_this_turn {
            GamePhase::ChoosingAttackTarget { unit: id }
        } else {
            GamePhase::MovingUnit { unit: id }
        };
        Ok(vec![self.set_phase(next)])
    }

    fn handle_select_tile(&mut self, pos: GridPosition) -> Result<Vec<GameEvent>, GameError> {
        self.board.tile_at(pos)?;

        match self.phase {
            GamePhase::MovingUnit { unit } => self.handle_move(unit, pos),
            GamePhase::ChoosingAttackTarget { unit } => self.handle_attack(unit, pos),
            _ => Err(GameError::InvalidPhaseOperation),
        }
    }

    fn handle_cancel(&mut self) -> Result<Vec<GameEvent>, GameError> {
        match self.phase {
            GamePhase::MovingUnit { .. } | GamePhase::ChoosingAttackTarget { .. } => {
                Ok(vec![self.set_phase(GamePhase::SelectingUnit)])
            }
            _ => Err(GameError::InvalidPhaseOperation),
        }
    }

    // ==================== Movement ====================

    fn handle_move(&mut self, id: UnitId, dest: GridPosition) -> Result<Vec<GameEvent>, GameError> {
        let from = self
            .board
            .unit(id)
            .ok_or(GameError::UnknownUnit(id))?
            .position;

        let mut events = Vec::new();
        // Selecting the unit's own tile holds position
        if dest != from {
            self.board.move_unit(id, dest)?;
            events.push(GameEvent::UnitMoved {
                unit: id,
                from,
                to: dest,
            });
        }

        let unit = self.board.unit_mut(id).ok_or(GameError::UnknownUnit(id))?;
        unit.has_moved_this_turn = true;

        let next = if unit.has_attacked_this_turn {
            GamePhase::SelectingUnit
        } else {
            GamePhase::ChoosingAttackTarget { unit: id }
        };
        events.push(self.set_phase(next));
        Ok(events)
    }

    // ==================== Combat ====================

    fn handle_attack(
        &mut self,
        id: UnitId,
        at: GridPosition,
    ) -> Result<Vec<GameEvent>, GameError> {
        let attacker = self.board.unit(id).ok_or(GameError::UnknownUnit(id))?;
        let mut events = Vec::new();

        if at == attacker.position {
            // Wait: spend the attack without attacking
            if let Some(unit) = self.board.unit_mut(id) {
                unit.has_attacked_this_turn = true;
            }
            events.push(self.set_phase(GamePhase::SelectingUnit));
            return Ok(events);
        }

        let illegal = GameError::IllegalAttack { attacker: id, at };
        let target = self.board.unit_at(at).ok_or(illegal.clone())?;
        if !self.is_hostile(attacker.owner, target.owner)
            || attacker.position.distance_to(&target.position) > attacker.attack_range
        {
            return Err(illegal);
        }

        let damage = damage_against(attacker, target, self.board.tile_at(at)?);
        let (target_id, target_owner) = (target.id, target.owner);

        let remaining_health = self.board.apply_damage(target_id, damage)?;
        if let Some(unit) = self.board.unit_mut(id) {
            unit.has_attacked_this_turn = true;
        }
        debug!(attacker = %id, target = %target_id, damage, remaining_health, "attack resolved");

        events.push(GameEvent::UnitDamaged {
            attacker: id,
            target: target_id,
            damage,
            remaining_health,
        });
        if remaining_health == 0 {
            events.push(GameEvent::UnitDied {
                unit: target_id,
                owner: target_owner,
                at,
            });
        }
        events.push(self.set_phase(GamePhase::SelectingUnit));
        Ok(events)
    }

    // ==================== Turn Management ====================

    fn auto_end_due(&self) -> bool {
        let active = self.turns.active_player();
        self.config.auto_end_when_done
            && !active.is_ai()
            && self.phase == GamePhase::SelectingUnit
            && self.board.units_owned_by(active.id).all(Unit::is_spent)
    }

    fn end_turn(&mut self, reason: TurnEndReason) -> Vec<GameEvent> {
        let player = self.active_player_id();
        let mut events = vec![self.set_phase(GamePhase::EndingTurn)];
        events.push(GameEvent::TurnEnded { player, reason });
        debug!(player, ?reason, "turn ended");

        events.extend(self.turns.update_eliminations(&self.board));
        if let Some(outcome) = self.turns.outcome() {
            events.extend(self.finish(outcome));
            return events;
        }

        if let Some(round) = self.turns.advance() {
            if self.config.max_rounds.is_some_and(|max| round > max) {
                events.extend(self.finish(GameOutcome::Draw));
                return events;
            }
            events.push(GameEvent::RoundStarted { round });
        }

        events.extend(self.start_turn());
        events
    }

    fn start_turn(&mut self) -> Vec<GameEvent> {
        let player = self.active_player_id();
        let round = self.turns.round();
        self.board.reset_turn_flags(player);
        self.turn_elapsed = Duration::ZERO;
        debug!(player, round, "turn started");

        vec![
            GameEvent::TurnStarted { player, round },
            self.set_phase(GamePhase::SelectingUnit),
        ]
    }

    fn finish(&mut self, outcome: GameOutcome) -> Vec<GameEvent> {
        info!(?outcome, round = self.turns.round(), "game over");
        vec![
            self.set_phase(GamePhase::GameOver { outcome }),
            GameEvent::GameFinished { outcome },
        ]
    }

    fn set_phase(&mut self, to: GamePhase) -> GameEvent {
        let from = std::mem::replace(&mut self.phase, to);
        debug!(?from, ?to, "phase changed");
        GameEvent::PhaseChanged { from, to }
    }
}
