//! Skirmish match runner.
//!
//! Hosts one match and speaks JSON lines: commands on stdin, events on
//! stdout. Logs go to stderr.

use anyhow::Context;
use skirmish_core::Scenario;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod host;
mod protocol;
mod stdio;

use host::MatchHost;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout is reserved for the protocol
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load scenario from env or use the built-in one
    let scenario = match std::env::var("SKIRMISH_SCENARIO") {
        Ok(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading scenario {}", path))?;
            Scenario::from_json(&text).with_context(|| format!("parsing scenario {}", path))?
        }
        Err(_) => Scenario::border_clash(),
    };
    let seed = match std::env::var("SKIRMISH_BOT_SEED") {
        Ok(value) => Some(value.parse::<u64>().context("SKIRMISH_BOT_SEED")?),
        Err(_) => None,
    };

    info!(scenario = %scenario.name, "Starting Skirmish runner...");
    let session = scenario.build()?;

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let writer = tokio::spawn(stdio::write_messages(tokio::io::stdout(), out_rx));
    let reader = tokio::spawn(stdio::read_commands(
        BufReader::new(tokio::io::stdin()),
        cmd_tx,
        out_tx.clone(),
    ));

    let result = MatchHost::new(session, seed, out_tx).run(cmd_rx).await;

    // Stdin may never close; stop reading so the writer sees the last sender go
    reader.abort();
    let _ = reader.await;
    writer.await?;

    let outcome = result?;
    info!(?outcome, "Runner finished");
    Ok(())
}
