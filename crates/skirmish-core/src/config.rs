//! Per-game settings.

use crate::turn::InitiativePolicy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between AI steps, in milliseconds
pub const DEFAULT_AI_PACING_MS: u64 = 400;

/// Default radius within which the AI looks for targets
pub const DEFAULT_AI_SCAN_RADIUS: u32 = 12;

/// Settings fixed for the lifetime of a game.
///
/// Missing fields take their default when deserialized, so a scenario file
/// only needs to name the settings it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub initiative: InitiativePolicy,
    /// Players sharing a team win together and cannot attack each other
    pub team_play: bool,
    /// Per-turn wall-clock limit; `None` means unlimited
    pub turn_time_limit_ms: Option<u64>,
    /// End a human player's turn once all of their units are spent
    pub auto_end_when_done: bool,
    /// Delay between AI steps, for presentation only
    pub ai_pacing_ms: u64,
    pub ai_scan_radius: u32,
    /// Declare a draw once this many rounds have been played
    pub max_rounds: Option<u32>,
    /// Seed for initiative shuffles; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initiative: InitiativePolicy::Fixed,
            team_play: false,
            turn_time_limit_ms: None,
            auto_end_when_done: true,
            ai_pacing_ms: DEFAULT_AI_PACING_MS,
            ai_scan_radius: DEFAULT_AI_SCAN_RADIUS,
            max_rounds: None,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn turn_time_limit(&self) -> Option<Duration> {
        self.turn_time_limit_ms.map(Duration::from_millis)
    }

    pub fn ai_pacing(&self) -> Duration {
        Duration::from_millis(self.ai_pacing_ms)
    }

    /// Random source for game setup
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"team_play": true, "turn_time_limit_ms": 1500}"#).unwrap();

        assert!(config.team_play);
        assert_eq!(config.turn_time_limit(), Some(Duration::from_millis(1500)));
        assert!(config.auto_end_when_done);
        assert_eq!(config.ai_scan_radius, DEFAULT_AI_SCAN_RADIUS);
        assert_eq!(config.initiative, InitiativePolicy::Fixed);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;

        let config = GameConfig {
            seed: Some(99),
            ..GameConfig::default()
        };
        let a: u64 = config.rng().gen();
        let b: u64 = config.rng().gen();
        assert_eq!(a, b);
    }
}
