//! hasibot - Telegram / XMPP / IRC relay bot
//!
//! Joins an XMPP room that the server maps onto an IRC channel, a native
//! XMPP room and optionally a Telegram group, and relays every message
//! posted in one of them to the others.

mod bridge;
mod common;
mod config;
mod telegram;
mod xmpp;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, error, info, warn};

use bridge::{run_relay_loop, ChannelBundle, Dispatcher, Relay, Router, TelegramTransport};
use config::load_and_validate;
use telegram::TelegramClient;
use xmpp::{XmppClient, XmppHandle};

#[derive(Debug, Parser)]
#[command(name = "hasibot", version, about = "Relay between Telegram, XMPP and IRC rooms")]
struct Cli {
    /// Configuration file (.yaml/.yml, otherwise HOCON)
    #[arg(short = 'c', long, env = "HASIBOT_CONFIG", default_value = "hasibot.yaml")]
    conf: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(short, long)]
    log: Option<PathBuf>,
}

fn init_logging(log: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    info!("hasibot v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    info!("Loading configuration from {}...", cli.conf.display());
    let config = load_and_validate(&cli.conf).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", cli.conf.display());
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  JID: {}", config.jid);
    info!("  IRC room: {}", config.irc);
    info!("  XMPP room: {}", config.xmpp);
    match config.tg_chat {
        Some(chat) => info!("  Telegram chat: {}", chat),
        None => info!("  Telegram: disabled"),
    }
    info!("  Nick: {}", config.nick);

    let router = Arc::new(Router::from_config(&config)?);
    let channels = ChannelBundle::new();
    let event_tx = channels.relay.event_tx;

    // ============================================================
    // Telegram (three-endpoint variant only)
    // ============================================================
    let (telegram_handle, telegram_task) = match config.tg_token.as_deref() {
        Some(token) if config.telegram_enabled() => {
            info!("Connecting to Telegram...");
            let client = TelegramClient::connect(token).await.map_err(|e| {
                error!("Telegram startup failed: {}", e);
                e
            })?;
            let handle: Arc<dyn TelegramTransport> = Arc::new(client.handle());
            let task = tokio::spawn(client.run(event_tx.clone()));
            (Some(handle), task)
        }
        _ => (None, tokio::spawn(std::future::pending::<()>())),
    };
    drop(event_tx);

    // ============================================================
    // XMPP session and relay loop
    // ============================================================
    let rooms = router.registry().xmpp_rooms().map(|room| room.id.clone()).collect();
    let xmpp_client = XmppClient::new(&config.jid, config.pw.clone(), rooms, channels.xmpp)?;
    let mut xmpp_task = tokio::spawn(xmpp_client.run());

    let dispatcher = Dispatcher::new(
        Arc::new(XmppHandle::new(channels.relay.xmpp_command_tx)),
        telegram_handle,
    );
    let relay = Arc::new(Relay::new(router, dispatcher));
    let relay_task = tokio::spawn(run_relay_loop(relay, channels.relay.event_rx));

    let shutdown_tx = channels.control.shutdown_tx;

    // ============================================================
    // Run until a signal or a task exit
    // ============================================================
    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - leaving rooms...");
            true
        }
        result = &mut xmpp_task => {
            match result {
                Ok(Ok(())) => warn!("XMPP task ended"),
                Ok(Err(e)) => {
                    error!("XMPP startup failed: {}", e);
                    return Err(e.into());
                }
                Err(e) => error!("XMPP task panicked: {}", e),
            }
            false
        }
        _ = telegram_task => {
            error!("Telegram task ended");
            false
        }
        _ = relay_task => {
            error!("Relay task ended");
            false
        }
    };

    if shutdown {
        // Fire-and-forget: if the channel is closed the session is already gone
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (XMPP task already exited): {}", e);
        }
        let timeout = tokio::time::Duration::from_secs(5);
        match tokio::time::timeout(timeout, xmpp_task).await {
            Ok(Ok(_)) => info!("XMPP session closed gracefully"),
            Ok(Err(e)) => warn!("XMPP task panicked: {}", e),
            Err(_) => warn!("XMPP logout timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
