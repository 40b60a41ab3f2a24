//! chatd server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite presence store, reconciles it against the directory, and serves
//! the JSON API over HTTP.
//!
//! Every setting can be overridden from the environment, nested keys
//! separated by `__`:
//!
//! ```text
//! CHATD_PORT=9304 CHATD_DIRECTORY__TOKEN=... chatd --config /etc/chatd.toml
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chatd_core::event::Bus;
use chatd_engine::{ChannelBus, Engine};
use chatd_server::{ServerConfig, directory::DirectoryClient};
use chatd_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "chatd presence server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Serve from the existing store without reconciling it first.
  #[arg(long)]
  skip_bootstrap: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("CHATD")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let (bus, events) = ChannelBus::new();
  let drain = chatd_server::spawn_event_drain(events);
  let engine = Engine::new(
    Arc::new(store),
    Arc::new(bus) as Arc<dyn Bus>,
    server_cfg.directory.reconciler_options(),
  );

  if cli.skip_bootstrap {
    tracing::info!("bootstrap skipped");
  } else {
    let directory = DirectoryClient::new(server_cfg.directory.clone())?;
    // An unreachable directory leaves the store as it was; serve it anyway.
    match engine.reconciler.bootstrap(&directory).await {
      Ok(applied) => tracing::info!(changes = applied.total(), "bootstrap complete"),
      Err(e) => tracing::warn!(error = %e, "bootstrap failed; serving existing store"),
    }
  }

  let app = chatd_server::router(engine);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  drain.abort();
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
