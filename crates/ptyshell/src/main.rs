//! # ptyshell
//!
//! Interactive console over persistent PTY shell sessions.
//!
//! ## Overview
//!
//! ptyshell starts a login shell inside a pseudo-terminal and turns its raw
//! output into structured command history:
//! - Session management (create, switch, close)
//! - Command submission, raw input and interrupts
//! - Interactive prompt and full-screen program handling
//!
//! Usage: `ptyshell [--config <file.yaml>]`

use std::sync::Arc;

use anyhow::Context;
use ptyshell::{parse_line, render, Driver, Flow};
use ptyshell_core::AppConfig;
use ptyshell_session::SessionManager;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

fn config_path() -> anyhow::Result<Option<String>> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config requires a path")?;
                return Ok(Some(path));
            }
            other => anyhow::bail!("Unknown argument: {other}"),
        }
    }
    Ok(None)
}

async fn print(text: &str) {
    let mut stdout = tokio::io::stdout();
    let _ = stdout.write_all(text.as_bytes()).await;
    let _ = stdout.flush().await;
}

/// Print events for the selected session until the channel closes.
fn spawn_event_printer(manager: Arc<SessionManager>) -> tokio::task::JoinHandle<()> {
    let mut events = manager.events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let state = manager.snapshot();
                    if let Some(text) = render::event(&state, &event) {
                        print(&format!("{text}\n")).await;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Console fell behind, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match config_path()? {
        Some(path) => AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => AppConfig::default(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("ptyshell v{} starting...", env!("CARGO_PKG_VERSION"));

    let manager = Arc::new(SessionManager::new(config)?);
    let printer = spawn_event_printer(Arc::clone(&manager));
    let driver = Driver::new(Arc::clone(&manager));

    manager.create_session().await?;
    tracing::info!("First session created, reading console input");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print(&render::prompt(&manager.snapshot())).await;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                if let Err(e) = manager.send_interrupt_signal().await {
                    tracing::warn!("Interrupt failed: {}", e);
                }
                print("\n").await;
                continue;
            }
        };

        let Some(line) = line else {
            tracing::info!("Console input closed");
            manager.close_all().await;
            break;
        };

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(e) => {
                print(&format!("{e}\n")).await;
                continue;
            }
        };

        match driver.execute(command).await {
            Ok(Flow::Continue(Some(text))) => print(&format!("{text}\n")).await,
            Ok(Flow::Continue(None)) => {}
            Ok(Flow::Quit) => break,
            Err(e) => print(&format!("error: {e}\n")).await,
        }
    }

    drop(driver);
    printer.abort();
    tracing::info!("ptyshell shutting down");

    Ok(())
}
