//! latticelabd - long-running host for one graph simulation and one cell automaton.
//!
//! Clients send newline-delimited JSON requests (`{"type": "RunGraph", ...}`) over TCP and
//! receive one JSON response line per request.

mod error;
mod paths;
mod state;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::time::{self, Duration};
use tracing::{error, info};

use paths::AppPaths;
use state::{DaemonState, Outcome};

const LISTEN_ADDR: &str = "127.0.0.1:9877";

async fn handle_client(
    stream: TcpStream,
    state: Arc<RwLock<DaemonState>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        // Long runs hold the session lock; other clients queue on it without tying up
        // a runtime worker.
        let outcome = {
            let state = Arc::clone(&state);
            tokio::task::spawn_blocking(move || state.blocking_write().dispatch(&line)).await?
        };

        let (response, shutdown) = match outcome {
            Outcome::Reply(r) => (r, false),
            Outcome::Shutdown(r) => (r, true),
        };
        writer
            .write_all(serde_json::to_string(&response)?.as_bytes())
            .await?;
        writer.write_all(b"\n").await?;

        if shutdown {
            writer.flush().await?;
            tokio::spawn(async {
                // Give the response a moment to flush before exiting.
                time::sleep(Duration::from_millis(50)).await;
                std::process::exit(0);
            });
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let paths = AppPaths::new()?;
    info!("Persistence initialized at {:?}", paths.data_dir());

    let state = Arc::new(RwLock::new(DaemonState::new(paths)));

    // Save on Ctrl-C so the config persists even if the daemon is stopped abruptly.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let s = state.read().await;
                if let Err(e) = s.save_config() {
                    error!("Ctrl-C save failed: {}", e);
                } else {
                    info!("Ctrl-C: cell config saved");
                }
                std::process::exit(0);
            }
        });
    }

    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!("latticelab daemon listening on {}", LISTEN_ADDR);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("Client connected: {}", addr);
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, state_clone).await {
                error!("Client handler error: {}", e);
            }
        });
    }
}
