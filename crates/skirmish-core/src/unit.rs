//! Combat units and their per-turn bookkeeping.

use crate::hex::GridPosition;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a unit in the board's unit arena.
///
/// Ids are never reused within a game, so a stale id simply stops resolving
/// once its unit has died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Static stat block used when spawning a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub max_health: u32,
    pub attack_power: u32,
    pub defense: u32,
    pub movement_range: u32,
    pub attack_range: u32,
}

impl UnitStats {
    /// Sturdy melee line unit
    pub const fn infantry() -> Self {
        Self {
            max_health: 100,
            attack_power: 25,
            defense: 10,
            movement_range: 3,
            attack_range: 1,
        }
    }

    /// Fragile unit that hits from a distance
    pub const fn archer() -> Self {
        Self {
            max_health: 70,
            attack_power: 20,
            defense: 5,
            movement_range: 3,
            attack_range: 3,
        }
    }

    /// Fast hard-hitting unit with light armour
    pub const fn cavalry() -> Self {
        Self {
            max_health: 90,
            attack_power: 30,
            defense: 8,
            movement_range: 5,
            attack_range: 1,
        }
    }
}

impl Default for UnitStats {
    fn default() -> Self {
        Self::infantry()
    }
}

/// A combatant on the battlefield
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub max_health: u32,
    pub current_health: u32,
    pub attack_power: u32,
    pub defense: u32,
    pub movement_range: u32,
    pub attack_range: u32,
    pub has_moved_this_turn: bool,
    pub has_attacked_this_turn: bool,
    pub position: GridPosition,
}

impl Unit {
    /// Create a fresh unit at full health
    pub fn new(id: UnitId, owner: PlayerId, stats: UnitStats, position: GridPosition) -> Self {
        Self {
            id,
            owner,
            max_health: stats.max_health,
            current_health: stats.max_health,
            attack_power: stats.attack_power,
            defense: stats.defense,
            movement_range: stats.movement_range,
            attack_range: stats.attack_range,
            has_moved_this_turn: false,
            has_attacked_this_turn: false,
            position,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_health > 0
    }

    /// A unit is spent once it has both moved and attacked this turn
    pub fn is_spent(&self) -> bool {
        self.has_moved_this_turn && self.has_attacked_this_turn
    }

    /// Whether the unit may still be selected this turn
    pub fn can_act(&self) -> bool {
        self.is_alive() && !self.is_spent()
    }

    /// Fraction of health remaining in `[0, 1]`
    pub fn health_ratio(&self) -> f64 {
        if self.max_health == 0 {
            return 0.0;
        }
        self.current_health as f64 / self.max_health as f64
    }

    pub(crate) fn reset_turn_flags(&mut self) {
        self.has_moved_this_turn = false;
        self.has_attacked_this_turn = false;
    }

    /// Reduce health, clamping at zero. Returns the new health.
    pub(crate) fn take_damage(&mut self, amount: u32) -> u32 {
        self.current_health = self.current_health.saturating_sub(amount);
        self.current_health
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Unit {
        Unit::new(UnitId(0), 0, UnitStats::infantry(), GridPosition::new(0, 0))
    }

    #[test]
    fn test_new_unit_is_fresh() {
        let unit = sample();
        assert_eq!(unit.current_health, unit.max_health);
        assert!(unit.is_alive());
        assert!(unit.can_act());
        assert!(!unit.is_spent());
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut unit = sample();
        assert_eq!(unit.take_damage(30), 70);
        assert_eq!(unit.take_damage(500), 0);
        assert!(!unit.is_alive());
        assert!(!unit.can_act());
    }

    #[test]
    fn test_spent_after_move_and_attack() {
        let mut unit = sample();
        unit.has_moved_this_turn = true;
        assert!(unit.can_act());
        unit.has_attacked_this_turn = true;
        assert!(unit.is_spent());

        unit.reset_turn_flags();
        assert!(unit.can_act());
    }

    #[test]
    fn test_health_ratio() {
        let mut unit = sample();
        unit.take_damage(25);
        assert!((unit.health_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
