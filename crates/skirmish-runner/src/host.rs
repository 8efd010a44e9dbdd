//! Match hosting: owns the game session and schedules human and AI turns.

use crate::protocol::{ClientMessage, ServerMessage};
use skirmish_core::{Bot, GameError, GameEvent, GameOutcome, GameSession, PlayerId};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

/// Errors that end a hosted match early
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Command input closed while waiting for player {0}")]
    InputClosed(PlayerId),

    #[error("No bot for AI player {0}")]
    MissingBot(PlayerId),

    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

/// Runs a single match. The host is the only writer of the session.
pub struct MatchHost {
    session: GameSession,
    bots: HashMap<PlayerId, Bot>,
    out: mpsc::UnboundedSender<ServerMessage>,
}

impl MatchHost {
    /// Create a host with a bot for every AI player.
    /// With a seed, bot `n` is seeded with `seed + n`.
    pub fn new(
        session: GameSession,
        seed: Option<u64>,
        out: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        let bots = session
            .turns()
            .players()
            .iter()
            .filter_map(|p| {
                Bot::for_player(p, seed.map(|s| s.wrapping_add(p.id as u64)))
                    .map(|bot| (p.id, bot))
            })
            .collect();

        Self { session, bots, out }
    }

    /// Play until the game is over
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ClientMessage>,
    ) -> Result<GameOutcome, HostError> {
        emit(&self.out, self.session.opening_events());

        loop {
            if let Some(outcome) = self.session.outcome() {
                info!(?outcome, round = self.session.round(), "match finished");
                let _ = self.out.send(ServerMessage::GameOver { outcome });
                return Ok(outcome);
            }

            let player = self.session.active_player_id();
            if self.session.active_player().is_ai() {
                self.play_ai_turn(player).await?;
                self.reject_queued(player, &mut commands);
            } else {
                self.await_human_turn(player, &mut commands).await?;
            }
        }
    }

    /// Step the player's bot with pacing until its turn ends
    async fn play_ai_turn(&mut self, player: PlayerId) -> Result<(), HostError> {
        let pacing = self.session.config().ai_pacing();
        let deadline = self.turn_deadline();
        let bot = self
            .bots
            .get_mut(&player)
            .ok_or(HostError::MissingBot(player))?;

        debug!(player, "AI turn started");
        bot.begin_turn();
        while !bot.is_done() {
            emit(&self.out, bot.step(&mut self.session));

            if deadline.is_some_and(|d| Instant::now() >= d) && !bot.is_done() {
                warn!(player, "AI turn ran out of time");
                emit(&self.out, self.session.expire_turn()?);
                break;
            }
            if !pacing.is_zero() && !bot.is_done() {
                sleep(pacing).await;
            }
        }
        Ok(())
    }

    /// Answer commands that arrived while an AI player was acting.
    /// Actions are rejected rather than carried into the next human turn.
    fn reject_queued(
        &mut self,
        player: PlayerId,
        commands: &mut mpsc::UnboundedReceiver<ClientMessage>,
    ) {
        while let Ok(msg) = commands.try_recv() {
            match msg.to_action() {
                Some(action) => {
                    debug!(player, ?action, "command arrived during AI turn");
                    let _ = self.out.send(ServerMessage::ActionRejected {
                        error: GameError::NotYourTurn,
                    });
                }
                None => {
                    self.handle_command(player, msg);
                }
            }
        }
    }

    /// Apply commands from the front end until the human player's turn ends
    async fn await_human_turn(
        &mut self,
        player: PlayerId,
        commands: &mut mpsc::UnboundedReceiver<ClientMessage>,
    ) -> Result<(), HostError> {
        let deadline = self.turn_deadline();
        debug!(player, "waiting for human commands");

        loop {
            let msg = match deadline {
                Some(deadline) => tokio::select! {
                    msg = commands.recv() => msg,
                    _ = sleep_until(deadline) => {
                        info!(player, "turn time limit reached");
                        emit(&self.out, self.session.expire_turn()?);
                        return Ok(());
                    }
                },
                None => commands.recv().await,
            };

            let msg = msg.ok_or(HostError::InputClosed(player))?;
            if self.handle_command(player, msg) {
                return Ok(());
            }
        }
    }

    /// Apply one command. Returns true when the turn is over.
    fn handle_command(&mut self, player: PlayerId, msg: ClientMessage) -> bool {
        let Some(action) = msg.to_action() else {
            match msg {
                ClientMessage::Ping => {
                    let _ = self.out.send(ServerMessage::Pong);
                }
                _ => self.send_state(),
            }
            return false;
        };

        match self.session.apply_action(player, action) {
            Ok(events) => {
                let turn_over = events
                    .iter()
                    .any(|e| matches!(e, GameEvent::TurnEnded { .. }));
                emit(&self.out, events);
                turn_over
            }
            Err(error) => {
                warn!(player, ?action, %error, "action rejected");
                let _ = self.out.send(ServerMessage::ActionRejected { error });
                false
            }
        }
    }

    fn send_state(&self) {
        let msg = match serde_json::to_value(&self.session) {
            Ok(state) => ServerMessage::State { state },
            Err(e) => ServerMessage::Error {
                message: format!("Failed to serialize state: {}", e),
            },
        };
        let _ = self.out.send(msg);
    }

    fn turn_deadline(&self) -> Option<Instant> {
        self.session
            .config()
            .turn_time_limit()
            .map(|limit| Instant::now() + limit)
    }
}

/// Forward events to the output channel. A closed channel is ignored.
fn emit(out: &mpsc::UnboundedSender<ServerMessage>, events: Vec<GameEvent>) {
    for event in events {
        let _ = out.send(ServerMessage::Event { event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{
        Controller, GameConfig, GridPosition, Scenario, TurnEndReason, UnitId,
    };

    fn quick(mut scenario: Scenario) -> Scenario {
        scenario.config.ai_pacing_ms = 0;
        scenario
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    fn duel(config: GameConfig) -> Scenario {
        let json = r#"{
            "name": "duel",
            "map": ["......"],
            "players": [
                {"id": 0, "name": "Human", "controller": "Human"},
                {"id": 1, "name": "Bot", "controller": {"Ai": "Hard"}}
            ],
            "units": [
                {"owner": 0, "at": {"col": 0, "row": 0}},
                {"owner": 1, "at": {"col": 5, "row": 0}}
            ]
        }"#;
        let mut scenario = Scenario::from_json(json).unwrap();
        scenario.config = config;
        quick(scenario)
    }

    #[tokio::test]
    async fn test_ai_match_runs_to_completion() {
        let session = quick(Scenario::border_clash()).build().unwrap();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let outcome = MatchHost::new(session, Some(1), out_tx)
            .run(cmd_rx)
            .await
            .unwrap();

        let messages = drain(&mut out_rx);
        assert_eq!(
            messages.last(),
            Some(&ServerMessage::GameOver { outcome })
        );
    }

    #[tokio::test]
    async fn test_human_commands_are_applied() {
        let session = duel(GameConfig {
            auto_end_when_done: false,
            max_rounds: Some(1),
            ai_pacing_ms: 0,
            ..GameConfig::default()
        })
        .build()
        .unwrap();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        cmd_tx.send(ClientMessage::Ping).unwrap();
        // Bot's unit is not ours
        cmd_tx
            .send(ClientMessage::SelectUnit { unit: UnitId(1) })
            .unwrap();
        cmd_tx
            .send(ClientMessage::SelectUnit { unit: UnitId(0) })
            .unwrap();
        cmd_tx
            .send(ClientMessage::SelectTile { col: 2, row: 0 })
            .unwrap();
        cmd_tx.send(ClientMessage::EndTurn).unwrap();

        let outcome = MatchHost::new(session, Some(1), out_tx)
            .run(cmd_rx)
            .await
            .unwrap();
        assert_eq!(outcome, GameOutcome::Draw);

        let messages = drain(&mut out_rx);
        assert!(messages.contains(&ServerMessage::Pong));
        assert!(messages.contains(&ServerMessage::ActionRejected {
            error: GameError::NotYourUnit(UnitId(1)),
        }));
        assert!(messages.contains(&ServerMessage::Event {
            event: GameEvent::UnitMoved {
                unit: UnitId(0),
                from: GridPosition::new(0, 0),
                to: GridPosition::new(2, 0),
            }
        }));
    }

    #[tokio::test]
    async fn test_idle_human_loses_turn_to_time_limit() {
        let mut scenario = duel(GameConfig {
            turn_time_limit_ms: Some(20),
            max_rounds: Some(2),
            ai_pacing_ms: 0,
            ..GameConfig::default()
        });
        scenario.players[1].controller = Controller::Ai(skirmish_core::BotDifficulty::Easy);
        let session = scenario.build().unwrap();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        MatchHost::new(session, Some(2), out_tx)
            .run(cmd_rx)
            .await
            .unwrap();

        let messages = drain(&mut out_rx);
        assert!(messages.contains(&ServerMessage::Event {
            event: GameEvent::TurnEnded {
                player: 0,
                reason: TurnEndReason::TimeLimit,
            }
        }));
    }

    #[tokio::test]
    async fn test_slow_ai_loses_turn_to_time_limit() {
        let mut scenario = duel(GameConfig {
            turn_time_limit_ms: Some(20),
            max_rounds: Some(1),
            ..GameConfig::default()
        });
        scenario.players[0].controller = Controller::Ai(skirmish_core::BotDifficulty::Hard);
        scenario.config.ai_pacing_ms = 50;
        let session = scenario.build().unwrap();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let outcome = MatchHost::new(session, Some(4), out_tx)
            .run(cmd_rx)
            .await
            .unwrap();
        assert_eq!(outcome, GameOutcome::Draw);

        let messages = drain(&mut out_rx);
        for player in [0, 1] {
            assert!(messages.contains(&ServerMessage::Event {
                event: GameEvent::TurnEnded {
                    player,
                    reason: TurnEndReason::TimeLimit,
                }
            }));
        }
    }

    #[tokio::test]
    async fn test_commands_during_ai_turn_are_rejected() {
        let mut scenario = duel(GameConfig {
            auto_end_when_done: false,
            turn_time_limit_ms: Some(200),
            max_rounds: Some(1),
            ..GameConfig::default()
        });
        // Bot plays first, the human second
        scenario.players[0].controller = Controller::Ai(skirmish_core::BotDifficulty::Hard);
        scenario.players[1].controller = Controller::Human;
        let session = scenario.build().unwrap();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        cmd_tx.send(ClientMessage::EndTurn).unwrap();
        cmd_tx.send(ClientMessage::Ping).unwrap();

        MatchHost::new(session, Some(3), out_tx)
            .run(cmd_rx)
            .await
            .unwrap();

        let messages = drain(&mut out_rx);
        assert!(messages.contains(&ServerMessage::ActionRejected {
            error: GameError::NotYourTurn,
        }));
        assert!(messages.contains(&ServerMessage::Pong));
        // The queued EndTurn did not end the human's turn
        assert!(messages.contains(&ServerMessage::Event {
            event: GameEvent::TurnEnded {
                player: 1,
                reason: TurnEndReason::TimeLimit,
            }
        }));
    }

    #[tokio::test]
    async fn test_closed_input_stops_human_turn() {
        let session = duel(GameConfig::default()).build().unwrap();
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        drop(cmd_tx);

        let result = MatchHost::new(session, None, out_tx).run(cmd_rx).await;
        assert!(matches!(result, Err(HostError::InputClosed(0))));
    }
}
