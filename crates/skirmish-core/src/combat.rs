//! Damage calculation.

use crate::board::Tile;
use crate::unit::Unit;

/// Minimum damage any attack deals, so combat always makes progress
pub const MIN_DAMAGE: u32 = 1;

/// `max(1, attack_power - round(defense * defense_multiplier))`
pub fn compute_damage(attack_power: u32, defense: u32, defense_multiplier: f64) -> u32 {
    let mitigation = (defense as f64 * defense_multiplier).round().max(0.0) as u64;
    let raw = (attack_power as u64).saturating_sub(mitigation);
    (raw as u32).max(MIN_DAMAGE)
}

/// Damage `attacker` deals to `defender` standing on `defender_tile`
pub fn damage_against(attacker: &Unit, defender: &Unit, defender_tile: &Tile) -> u32 {
    compute_damage(
        attacker.attack_power,
        defender.defense,
        defender_tile.defense_multiplier(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Terrain;

    #[test]
    fn test_hills_example() {
        // 25 - round(10 * 1.3) = 12
        assert_eq!(
            compute_damage(25, 10, Terrain::Hills.defense_multiplier()),
            12
        );
    }

    #[test]
    fn test_damage_floor() {
        assert_eq!(compute_damage(5, 40, 1.5), MIN_DAMAGE);
        assert_eq!(compute_damage(0, 0, 1.0), MIN_DAMAGE);

        for attack in 0..40 {
            for defense in 0..40 {
                for terrain in Terrain::ALL {
                    assert!(compute_damage(attack, defense, terrain.defense_multiplier()) >= 1);
                }
            }
        }
    }

    #[test]
    fn test_rounding_of_mitigation() {
        // 7 * 0.8 = 5.6 rounds to 6
        assert_eq!(compute_damage(20, 7, 0.8), 14);
        // 5 * 1.1 = 5.5 rounds away from zero to 6
        assert_eq!(compute_damage(20, 5, 1.1), 14);
    }
}
