//! WebAssembly bindings for the Skirmish engine.
//!
//! This module exposes a game session to JavaScript through wasm-bindgen.
//! Everything crosses the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::actions::GameAction;
use crate::bot::Bot;
use crate::game::GameSession;
use crate::hex::GridPosition;
use crate::scenario::Scenario;
use crate::unit::UnitId;
use std::time::Duration;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_json<T: serde::Serialize>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmSession {
    session: GameSession,
}

#[wasm_bindgen]
impl WasmSession {
    /// Start a game from a scenario JSON document, or the built-in map if empty
    #[wasm_bindgen(constructor)]
    pub fn new(scenario_json: &str) -> Result<WasmSession, JsValue> {
        let scenario = if scenario_json.trim().is_empty() {
            Scenario::border_clash()
        } else {
            Scenario::from_json(scenario_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid scenario: {}", e)))?
        };
        let session = scenario
            .build()
            .map_err(|e| JsValue::from_str(&format!("Cannot start game: {}", e)))?;
        Ok(WasmSession { session })
    }

    /// Get the whole session as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        to_json(&self.session, "{}")
    }

    #[wasm_bindgen(js_name = getActivePlayer)]
    pub fn get_active_player(&self) -> u8 {
        self.session.active_player_id()
    }

    #[wasm_bindgen(js_name = isActivePlayerAi)]
    pub fn is_active_player_ai(&self) -> bool {
        self.session.active_player().is_ai()
    }

    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        to_json(&self.session.phase(), "\"Unknown\"")
    }

    /// Get valid actions for a player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self, player: u8) -> String {
        to_json(&self.session.valid_actions(player), "[]")
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.session.apply_action(player, action) {
            Ok(events) => Ok(to_json(&events, "[]")),
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Report elapsed milliseconds to the turn clock, returns events JSON
    pub fn tick(&mut self, elapsed_ms: u32) -> String {
        let events = self
            .session
            .tick(Duration::from_millis(u64::from(elapsed_ms)));
        to_json(&events, "[]")
    }

    /// Play the active AI player's whole turn, returns events JSON
    #[wasm_bindgen(js_name = playBotTurn)]
    pub fn play_bot_turn(&mut self, seed: u32) -> String {
        let Some(mut bot) = Bot::for_player(self.session.active_player(), Some(u64::from(seed)))
        else {
            return "[]".to_string();
        };
        to_json(&bot.play_turn(&mut self.session), "[]")
    }

    /// Tiles a unit can move to, as JSON array of positions
    #[wasm_bindgen(js_name = getMovementRange)]
    pub fn get_movement_range(&self, unit: u32) -> String {
        let mut tiles: Vec<GridPosition> = self
            .session
            .movement_range(UnitId(unit))
            .into_iter()
            .collect();
        tiles.sort();
        to_json(&tiles, "[]")
    }

    /// Units a unit can attack, as JSON array of ids
    #[wasm_bindgen(js_name = getAttackTargets)]
    pub fn get_attack_targets(&self, unit: u32) -> String {
        to_json(&self.session.attack_targets(UnitId(unit)), "[]")
    }

    /// Positions within `radius` hops, for highlighting
    #[wasm_bindgen(js_name = getNeighboringTiles)]
    pub fn get_neighboring_tiles(&self, col: i32, row: i32, radius: u32) -> String {
        match self
            .session
            .board()
            .neighboring_tiles(GridPosition::new(col, row), radius)
        {
            Ok(tiles) => to_json(&tiles, "[]"),
            Err(_) => "[]".to_string(),
        }
    }

    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    /// The outcome as JSON, `null` while the game runs
    #[wasm_bindgen(js_name = getOutcome)]
    pub fn get_outcome(&self) -> String {
        to_json(&self.session.outcome(), "null")
    }
}
