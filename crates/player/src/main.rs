//! combatdesk Player - follows one encounter from the terminal.
//!
//! Keys (one per line): `n`/`p` next/previous turn, `t`/`T` cycle target,
//! `r` re-fetch, `q` quit.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use combatdesk_player::application::{Navigator, Reconciler, Step};
use combatdesk_player::infrastructure::config::ClientConfig;
use combatdesk_player::infrastructure::http_client::HttpTrackerApi;
use combatdesk_player::infrastructure::websocket::{ConnectionEvent, ConnectionState, EngineClient};
use combatdesk_player::ports::TrackerApiPort;
use combatdesk_player::presentation::render;
use combatdesk_player::state::EncounterState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "combatdesk_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env();
    let encounter_id = config
        .encounter_id
        .context("COMBATDESK_ENCOUNTER_ID must be set to a valid encounter id")?;

    tracing::info!(encounter_id = %encounter_id, engine = %config.engine_url, "Starting combatdesk Player");

    let api: Arc<dyn TrackerApiPort> = Arc::new(HttpTrackerApi::new(&config.engine_url));
    let state = EncounterState::shared(encounter_id);
    let reconciler = Reconciler::new(api.clone(), state.clone());
    let navigator = Navigator::new(api, state.clone());

    let client = EngineClient::new(config.engine_ws_url.clone());
    let (events_tx, mut events_rx) = mpsc::channel::<ConnectionEvent>(64);
    let ws_task = {
        let client = client.clone();
        tokio::spawn(async move { client.run(events_tx).await })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                if let ConnectionEvent::StateChanged(conn) = &event {
                    tracing::info!(state = conn.as_str(), "Connection state changed");
                    if *conn == ConnectionState::Failed {
                        break;
                    }
                }
                if !reconciler.handle_event(event).await.is_empty() {
                    print!("{}", render(&*state.read().await));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "n" | "p" => {
                        let step = if line.trim() == "n" { Step::Next } else { Step::Prev };
                        if let Err(e) = navigator.step(step).await {
                            eprintln!("Turn change failed: {e}");
                        }
                    }
                    "t" => {
                        state.write().await.cycle_target(true);
                    }
                    "T" => {
                        state.write().await.cycle_target(false);
                    }
                    "r" => reconciler.refetch_all().await,
                    "q" => break,
                    "" => {}
                    other => {
                        eprintln!("Unknown command: {other}");
                        continue;
                    }
                }
                print!("{}", render(&*state.read().await));
            }
        }
    }

    client.disconnect().await;
    let _ = ws_task.await;
    tracing::info!("Player stopped");
    Ok(())
}
