//! AI players for Skirmish.
//!
//! A bot plays one unit at a time through an explicit step machine:
//! pick a unit, pick a target, pick a tile to attack from, move, attack.
//! Every decision is carried out through `GameSession::apply_action`, so a bot
//! can never do anything a human player couldn't.
//!
//! Difficulty presets tune three knobs:
//! - Easy: passive, often misjudges targets, prefers defensive ground
//! - Medium: balanced
//! - Hard: aggressive and never misjudges

use crate::actions::{GameAction, GameEvent};
use crate::board::Terrain;
use crate::game::{GamePhase, GameSession};
use crate::hex::GridPosition;
use crate::player::{PlayerId, PlayerRecord};
use crate::unit::{Unit, UnitId};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Upper bound on steps in one turn, in case a session keeps rejecting the bot
const MAX_STEPS_PER_TURN: usize = 10_000;

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
    Hard,
}

impl BotDifficulty {
    pub fn profile(self) -> AiProfile {
        match self {
            BotDifficulty::Easy => AiProfile {
                look_ahead_depth: 1,
                aggression_level: 0.4,
                mistake_chance: 0.4,
                preferred_range: RangePreference::Defensive,
            },
            BotDifficulty::Medium => AiProfile {
                look_ahead_depth: 1,
                aggression_level: 0.7,
                mistake_chance: 0.15,
                preferred_range: RangePreference::Balanced,
            },
            BotDifficulty::Hard => AiProfile {
                look_ahead_depth: 1,
                aggression_level: 0.95,
                mistake_chance: 0.0,
                preferred_range: RangePreference::Aggressive,
            },
        }
    }
}

/// How a bot weighs safe ground against closing in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangePreference {
    Aggressive,
    Balanced,
    Defensive,
}

impl RangePreference {
    /// `(defense weight, proximity weight)` for position scoring
    pub fn weights(self) -> (f64, f64) {
        match self {
            RangePreference::Aggressive => (0.3, 0.7),
            RangePreference::Balanced => (0.5, 0.5),
            RangePreference::Defensive => (0.7, 0.3),
        }
    }
}

/// Tunable behavior of an AI player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Only a depth of 1 is searched
    pub look_ahead_depth: u8,
    /// In `[0, 1]`
    pub aggression_level: f64,
    /// Chance in `[0, 1]` to misjudge a target's score
    pub mistake_chance: f64,
    pub preferred_range: RangePreference,
}

impl Default for AiProfile {
    fn default() -> Self {
        BotDifficulty::Medium.profile()
    }
}

/// What a unit intends to do this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Get in range of this unit and attack it
    Engage(UnitId),
    /// Nothing to attack nearby; close in on this position
    Reposition(GridPosition),
    /// Stay put
    Hold,
}

/// The next thing a bot will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotStep {
    NextUnit,
    PickTarget {
        unit: UnitId,
    },
    PickPosition {
        unit: UnitId,
        intent: Intent,
    },
    Move {
        unit: UnitId,
        destination: GridPosition,
        target: Option<UnitId>,
    },
    Attack {
        unit: UnitId,
        target: Option<UnitId>,
    },
    EndTurn,
    Done,
}

/// A bot player that drives one player's turns
pub struct Bot {
    pub player_id: PlayerId,
    pub profile: AiProfile,
    rng: StdRng,
    step: BotStep,
    /// Units already handled this turn
    handled: BTreeSet<UnitId>,
}

impl Bot {
    pub fn new(player_id: PlayerId, profile: AiProfile) -> Self {
        Self::with_rng(player_id, profile, StdRng::from_entropy())
    }

    pub fn with_seed(player_id: PlayerId, profile: AiProfile, seed: u64) -> Self {
        Self::with_rng(player_id, profile, StdRng::seed_from_u64(seed))
    }

    fn with_rng(player_id: PlayerId, profile: AiProfile, rng: StdRng) -> Self {
        Self {
            player_id,
            profile,
            rng,
            step: BotStep::Done,
            handled: BTreeSet::new(),
        }
    }

    /// Bot for an AI player record, `None` for humans
    pub fn for_player(player: &PlayerRecord, seed: Option<u64>) -> Option<Self> {
        let profile = player.kind.ai_profile()?;
        Some(match seed {
            Some(seed) => Self::with_seed(player.id, profile, seed),
            None => Self::new(player.id, profile),
        })
    }

    /// The step `step` will perform next
    pub fn current_step(&self) -> BotStep {
        self.step
    }

    pub fn is_done(&self) -> bool {
        self.step == BotStep::Done
    }

    /// Prepare for a fresh turn
    pub fn begin_turn(&mut self) {
        self.step = BotStep::NextUnit;
        self.handled.clear();
    }

    /// Play a whole turn without pacing
    pub fn play_turn(&mut self, session: &mut GameSession) -> Vec<GameEvent> {
        self.begin_turn();
        let mut events = Vec::new();
        for _ in 0..MAX_STEPS_PER_TURN {
            if self.is_done() {
                break;
            }
            events.extend(self.step(session));
        }
        events
    }

    /// Perform exactly one step of the turn
    pub fn step(&mut self, session: &mut GameSession) -> Vec<GameEvent> {
        if session.is_finished() || session.active_player_id() != self.player_id {
            self.step = BotStep::Done;
            return Vec::new();
        }

        let (next, events) = match self.step {
            BotStep::NextUnit => (self.next_unit(session), Vec::new()),
            BotStep::PickTarget { unit } => (self.pick_target(session, unit), Vec::new()),
            BotStep::PickPosition { unit, intent } => {
                (self.pick_position(session, unit, intent), Vec::new())
            }
            BotStep::Move {
                unit,
                destination,
                target,
            } => self.execute_move(session, unit, destination, target),
            BotStep::Attack { unit, target } => self.execute_attack(session, unit, target),
            BotStep::EndTurn => self.execute_end_turn(session),
            BotStep::Done => (BotStep::Done, Vec::new()),
        };

        debug!(player = self.player_id, ?next, "bot step");
        self.step = next;
        events
    }

    // ==================== Decisions ====================

    fn next_unit(&mut self, session: &GameSession) -> BotStep {
        let next = session
            .board()
            .units_owned_by(self.player_id)
            .find(|u| u.can_act() && !self.handled.contains(&u.id))
            .map(|u| u.id);

        match next {
            Some(unit) => {
                self.handled.insert(unit);
                BotStep::PickTarget { unit }
            }
            None => BotStep::EndTurn,
        }
    }

    fn pick_target(&mut self, session: &GameSession, unit: UnitId) -> BotStep {
        let board = session.board();
        let Some(me) = board.unit(unit) else {
            return BotStep::NextUnit;
        };
        let radius = session.config().ai_scan_radius;

        let mut best: Option<(UnitId, f64)> = None;
        for enemy in board
            .units_within(me.position, radius)
            .filter(|u| session.is_hostile(me.owner, u.owner))
        {
            let score = self.score_target(me, enemy, radius);
            // Units come in id order, so ties keep the lowest id
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((enemy.id, score));
            }
        }

        let intent = match best {
            Some((target, _)) => Intent::Engage(target),
            None => board
                .units()
                .filter(|u| session.is_hostile(me.owner, u.owner))
                .min_by_key(|u| me.position.distance_to(&u.position))
                .map_or(Intent::Hold, |u| Intent::Reposition(u.position)),
        };
        BotStep::PickPosition { unit, intent }
    }

    /// `aggression * (health_weight + proximity_weight)`, sometimes misjudged
    fn score_target(&mut self, me: &Unit, enemy: &Unit, radius: u32) -> f64 {
        let health_weight = 1.0 - enemy.health_ratio();
        let distance = me.position.distance_to(&enemy.position) as f64;
        let proximity_weight = 1.0 - distance / (radius as f64 + 1.0);
        let mut score = self.profile.aggression_level * (health_weight + proximity_weight);

        if self.rng.gen_bool(self.profile.mistake_chance.clamp(0.0, 1.0)) {
            score *= self.rng.gen_range(0.5..=1.5);
        }
        score
    }

    fn pick_position(&mut self, session: &GameSession, unit: UnitId, intent: Intent) -> BotStep {
        let board = session.board();
        let Some(me) = board.unit(unit) else {
            return BotStep::NextUnit;
        };
        let stay = BotStep::Move {
            unit,
            destination: me.position,
            target: None,
        };
        if me.has_moved_this_turn {
            // Selecting it again goes straight to target choice
            return BotStep::Move {
                unit,
                destination: me.position,
                target: match intent {
                    Intent::Engage(target) => Some(target),
                    _ => None,
                },
            };
        }

        let mut reachable: Vec<GridPosition> =
            session.movement_range(unit).into_iter().collect();
        reachable.sort();

        match intent {
            Intent::Hold => stay,

            Intent::Reposition(toward) => BotStep::Move {
                unit,
                destination: closest_to(me.position, &reachable, toward),
                target: None,
            },

            Intent::Engage(target) => {
                let Some(enemy) = board.unit(target) else {
                    return stay;
                };
                let destination = if me.position.distance_to(&enemy.position) <= me.attack_range {
                    me.position
                } else {
                    self.best_attack_position(session, me, enemy, &reachable)
                        .unwrap_or_else(|| closest_to(me.position, &reachable, enemy.position))
                };
                BotStep::Move {
                    unit,
                    destination,
                    target: Some(target),
                }
            }
        }
    }

    /// Highest scoring reachable tile within attack range of `enemy`
    fn best_attack_position(
        &self,
        session: &GameSession,
        me: &Unit,
        enemy: &Unit,
        reachable: &[GridPosition],
    ) -> Option<GridPosition> {
        let (defense_weight, proximity_weight) = self.profile.preferred_range.weights();
        let best_defense = max_defense_multiplier();

        let mut best: Option<(GridPosition, f64)> = None;
        for &pos in reachable {
            let distance = pos.distance_to(&enemy.position);
            if distance > me.attack_range {
                continue;
            }
            let Ok(tile) = session.board().tile_at(pos) else {
                continue;
            };
            let defense_norm = tile.defense_multiplier() / best_defense;
            let proximity_norm = 1.0 - distance as f64 / (me.attack_range as f64 + 1.0);
            let score = defense_weight * defense_norm + proximity_weight * proximity_norm;

            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pos, score));
            }
        }
        best.map(|(pos, _)| pos)
    }

    // ==================== Execution ====================

    fn execute_move(
        &mut self,
        session: &mut GameSession,
        unit: UnitId,
        destination: GridPosition,
        target: Option<UnitId>,
    ) -> (BotStep, Vec<GameEvent>) {
        let mut events = match session.apply_action(self.player_id, GameAction::SelectUnit(unit)) {
            Ok(events) => events,
            Err(err) => {
                warn!(player = self.player_id, unit = %unit, %err, "bot could not select unit");
                return (BotStep::NextUnit, Vec::new());
            }
        };

        if matches!(session.phase(), GamePhase::MovingUnit { .. }) {
            // Selecting the unit's own tile holds position
            match session.apply_action(self.player_id, GameAction::SelectTile(destination)) {
                Ok(more) => events.extend(more),
                Err(err) => {
                    warn!(
                        player = self.player_id,
                        unit = %unit,
                        to = %destination,
                        %err,
                        "bot move rejected"
                    );
                    events.extend(self.cancel(session));
                    return (BotStep::NextUnit, events);
                }
            }
        }

        (BotStep::Attack { unit, target }, events)
    }

    fn execute_attack(
        &mut self,
        session: &mut GameSession,
        unit: UnitId,
        target: Option<UnitId>,
    ) -> (BotStep, Vec<GameEvent>) {
        if session.phase() != (GamePhase::ChoosingAttackTarget { unit }) {
            return (BotStep::NextUnit, Vec::new());
        }
        let Some(me) = session.board().unit(unit) else {
            return (BotStep::NextUnit, Vec::new());
        };

        let in_range = target
            .filter(|t| session.attack_targets(unit).contains(t))
            .and_then(|t| session.board().unit(t))
            .map(|t| t.position);
        // Waiting on the unit's own tile spends the attack
        let tile = in_range.unwrap_or(me.position);

        match session.apply_action(self.player_id, GameAction::SelectTile(tile)) {
            Ok(events) => (BotStep::NextUnit, events),
            Err(err) => {
                warn!(player = self.player_id, unit = %unit, at = %tile, %err, "bot attack rejected");
                (BotStep::NextUnit, self.cancel(session))
            }
        }
    }

    fn execute_end_turn(&mut self, session: &mut GameSession) -> (BotStep, Vec<GameEvent>) {
        match session.apply_action(self.player_id, GameAction::EndTurn) {
            Ok(events) => (BotStep::Done, events),
            Err(err) => {
                warn!(player = self.player_id, %err, "bot could not end turn");
                (BotStep::Done, Vec::new())
            }
        }
    }

    fn cancel(&mut self, session: &mut GameSession) -> Vec<GameEvent> {
        session
            .apply_action(self.player_id, GameAction::CancelSelection)
            .unwrap_or_default()
    }
}

/// Reachable tile closest to `goal`, or `origin` if none is closer
fn closest_to(origin: GridPosition, reachable: &[GridPosition], goal: GridPosition) -> GridPosition {
    let mut best = origin;
    for &pos in reachable {
        if pos.distance_to(&goal) < best.distance_to(&goal) {
            best = pos;
        }
    }
    best
}

fn max_defense_multiplier() -> f64 {
    Terrain::ALL
        .iter()
        .filter(|t| t.is_passable())
        .map(Terrain::defense_multiplier)
        .fold(1.0, f64::max)
}
