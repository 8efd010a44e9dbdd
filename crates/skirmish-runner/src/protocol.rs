//! JSON-lines protocol between the runner and its controlling front end.

use serde::{Deserialize, Serialize};
use skirmish_core::{GameAction, GameError, GameEvent, GameOutcome, GridPosition, UnitId};

/// Messages read from stdin, one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Select a unit of the active human player
    SelectUnit { unit: UnitId },

    /// Select a tile: move destination, attack target, or own tile to hold / wait
    SelectTile { col: i32, row: i32 },

    /// Drop the current selection
    CancelSelection,

    /// End the active human player's turn
    EndTurn,

    /// Request a full state snapshot
    State,

    /// Ping for keepalive
    Ping,
}

impl ClientMessage {
    /// The game action this message stands for, if any
    pub fn to_action(&self) -> Option<GameAction> {
        match *self {
            ClientMessage::SelectUnit { unit } => Some(GameAction::SelectUnit(unit)),
            ClientMessage::SelectTile { col, row } => {
                Some(GameAction::SelectTile(GridPosition::new(col, row)))
            }
            ClientMessage::CancelSelection => Some(GameAction::CancelSelection),
            ClientMessage::EndTurn => Some(GameAction::EndTurn),
            ClientMessage::State | ClientMessage::Ping => None,
        }
    }
}

/// Messages written to stdout, one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Something happened in the game
    Event { event: GameEvent },

    /// A command was refused; nothing changed
    ActionRejected { error: GameError },

    /// Full session snapshot
    State { state: serde_json::Value },

    /// Pong response
    Pong,

    /// Game finished
    GameOver { outcome: GameOutcome },

    /// Error occurred
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"SelectTile","payload":{"col":3,"row":1}}"#).unwrap();
        assert_eq!(msg, ClientMessage::SelectTile { col: 3, row: 1 });
        assert_eq!(
            msg.to_action(),
            Some(GameAction::SelectTile(GridPosition::new(3, 1)))
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"SelectUnit","payload":{"unit":4}}"#).unwrap();
        assert_eq!(msg.to_action(), Some(GameAction::SelectUnit(UnitId(4))));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"Ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
        assert_eq!(msg.to_action(), None);
    }

    #[test]
    fn test_reject_unknown_message() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"Teleport"}"#).is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let msg = ServerMessage::ActionRejected {
            error: GameError::NotYourTurn,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ActionRejected");
        assert_eq!(json["payload"]["error"], "NotYourTurn");

        let json = serde_json::to_value(&ServerMessage::Pong).unwrap();
        assert_eq!(json["type"], "Pong");
    }
}
