//! Line-oriented stdin/stdout plumbing.

use crate::protocol::{ClientMessage, ServerMessage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Parse one JSON command per line and forward it to the host.
/// Malformed lines are answered with an `Error` message and skipped.
pub async fn read_commands<R>(
    reader: R,
    commands: mpsc::UnboundedSender<ClientMessage>,
    out: mpsc::UnboundedSender<ServerMessage>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read command: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<ClientMessage>(line) {
            Ok(msg) => {
                if commands.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Invalid command: {}", line);
                let _ = out.send(ServerMessage::Error {
                    message: format!("Invalid command: {}", e),
                });
            }
        }
    }
}

/// Write every outgoing message as a JSON line until all senders are gone
pub async fn write_messages<W>(mut writer: W, mut messages: mpsc::UnboundedReceiver<ServerMessage>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = messages.recv().await {
        let Ok(mut text) = serde_json::to_string(&msg) else {
            continue;
        };
        text.push('\n');
        if writer.write_all(text.as_bytes()).await.is_err() || writer.flush().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_commands_skips_bad_lines() {
        let input = "{\"type\":\"Ping\"}\n\nnot json\n{\"type\":\"EndTurn\"}\n";
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        read_commands(BufReader::new(input.as_bytes()), cmd_tx, out_tx).await;

        assert_eq!(cmd_rx.recv().await, Some(ClientMessage::Ping));
        assert_eq!(cmd_rx.recv().await, Some(ClientMessage::EndTurn));
        assert_eq!(cmd_rx.recv().await, None);
        assert!(matches!(
            out_rx.recv().await,
            Some(ServerMessage::Error { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_messages_as_lines() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ServerMessage::Pong).unwrap();
        tx.send(ServerMessage::Error {
            message: "boom".into(),
        })
        .unwrap();
        drop(tx);

        let mut buffer = Vec::new();
        write_messages(&mut buffer, rx).await;

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"type":"Pong"}"#);
    }
}
