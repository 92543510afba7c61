// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RFCOMM Chat command line client

use anyhow::{anyhow, Context, Result};
use bluer::Address;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rfcomm_chat::bluetooth::BluezTransport;
use rfcomm_chat::config::Config;
use rfcomm_chat::{ChatSession, SessionError, SessionEvent};

#[derive(Parser)]
#[command(name = "rfcomm-chat")]
#[command(version)]
#[command(about = "Two-peer chat over a Bluetooth RFCOMM channel", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Advertise the chat service and wait for one client
    Serve,

    /// Connect to a peer that is serving the chat service
    Connect {
        /// Bluetooth address of the peer, e.g. 00:11:22:33:44:55
        address: String,
    },
}

/// Interactive commands typed on stdin.
enum Input {
    Send(String),
    Start,
    Disconnect,
    Quit,
}

impl Input {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "/quit" => Input::Quit,
            "/start" => Input::Start,
            "/disconnect" => Input::Disconnect,
            "" => Input::Send(String::new()),
            // The protocol frames on '\n', so each typed line is terminated here.
            _ => Input::Send(format!("{}\n", line)),
        }
    }
}

/// Transport failures were already printed as status events.
fn log_session_error(e: &SessionError) {
    match e {
        SessionError::Transport(_) => debug!("{}", e),
        SessionError::AlreadyActive(_) => warn!("{}", e),
        SessionError::Encoding(_) => error!("{}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, the chat transcript to stdout.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rfcomm_chat=info".parse()?),
        )
        .init();

    info!("Starting RFCOMM Chat v{}...", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    info!("Configuration loaded");

    let transport = Arc::new(BluezTransport::new(config.bluetooth.rfcomm_channel).await?);
    if config.bluetooth.power_on {
        transport.power_on().await?;
    }
    if let Some(alias) = &config.bluetooth.adapter_alias {
        transport.set_name(alias).await?;
    }

    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(32);
    let mut session = ChatSession::new(
        transport,
        config.bluetooth.service_uuid,
        &config.bluetooth.service_name,
        event_tx,
    )?;

    // Print session events
    let display_timestamps = config.chat.display_timestamps;
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event, SessionEvent::StateChanged(_)) {
                continue;
            }
            if display_timestamps {
                println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), event);
            } else {
                println!("{}", event);
            }
        }
    });

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => session.start().await,
        Command::Connect { address } => {
            let peer: Address = address
                .parse()
                .map_err(|_| anyhow!("Invalid Bluetooth address: {}", address))?;
            session.connect(peer).await
        }
    };
    if let Err(e) = result {
        log_session_error(&e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            signal = session.next_signal() => session.handle_signal(signal).await,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                };
                match Input::parse(&line) {
                    Input::Send(text) => session.send_message(&text).await,
                    Input::Start => {
                        if let Err(e) = session.start().await {
                            log_session_error(&e);
                        }
                    }
                    Input::Disconnect => session.disconnect().await,
                    Input::Quit => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    session.disconnect().await;
    drop(session);
    let _ = printer.await;
    info!("RFCOMM Chat stopped");
    Ok(())
}
