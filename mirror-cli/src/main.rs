//! # ccmirror
//!
//! Mirror a local directory to a remote peer through a WebSocket relay.
//!
//! Every file and directory change under the root is sent to the peer
//! attached to the session identified by `<CODE>`. Changes made while the
//! peer is away are held and replayed once it attaches.
//!
//! ## Commands (stdin)
//!
//! - `d <target>`: start a debug session on the peer
//! - `dc`: disconnect and exit
//!
//! ## Example
//!
//! ```bash
//! # Mirror the current directory
//! ccmirror ABC123
//!
//! # Mirror ./src through a local relay, with verbose logs
//! RUST_LOG=debug ccmirror --server ws://localhost:25580/ --root src ABC123
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ccmirror_client::{FsContentSource, Session, WebSocketTransport};

mod config;
mod console;
mod watch;

use config::Config;

/// Mirror a local directory to a remote peer through a WebSocket relay.
#[derive(Parser, Debug)]
#[command(name = "ccmirror")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Association code of the remote session
    code: String,

    /// TOML config file (default: <config dir>/ccmirror/ccmirror.toml if present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Relay WebSocket URL (overrides config)
    #[arg(long, short)]
    server: Option<String>,

    /// Directory to mirror
    #[arg(long, short, default_value = ".")]
    root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.server {
        config.server.url = url;
    }
    config.validate()?;

    let root = std::fs::canonicalize(&cli.root)
        .with_context(|| format!("Cannot open root directory {}", cli.root.display()))?;

    let (session, events) = Session::new(
        config.session_config(&cli.code),
        WebSocketTransport::new(),
        FsContentSource::new(&root),
    );

    let _watcher = watch::spawn(&root, config.watch.ignore_hidden, session.changes())
        .context("Failed to watch root directory")?;
    tracing::info!(root = %root.display(), "watching for changes");

    let printer = console::spawn_printer(events);
    let commands = console::spawn_stdin_reader();

    let result = session.run(commands).await;

    // The session is gone, so the printer drains and stops
    let _ = printer.await;

    // anyhow reports the error on the way out
    Ok(result?)
}
