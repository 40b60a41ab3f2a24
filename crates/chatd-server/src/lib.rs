//! Service wiring for the chatd binary: configuration, the HTTP directory
//! client, the outbound event drain, and the top-level router.

pub mod directory;

use std::{path::PathBuf, time::Duration};

use axum::Router;
use chatd_core::store::PresenceStore;
use chatd_engine::{Engine, Envelope, ReconcilerOptions};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CHATD_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  pub directory:  DirectoryConfig,
}

/// Where and how to fetch the directory snapshot.
#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryConfig {
  /// Base URL of the identity service (tenants, sessions).
  pub auth_url:           String,
  /// Base URL of the configuration service (users).
  pub confd_url:          String,
  /// Sent as `X-Auth-Token`; empty means no header.
  #[serde(default)]
  pub token:              String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:       u64,
  #[serde(default = "default_true")]
  pub announce_new_users: bool,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 9304 }
fn default_timeout_secs() -> u64 { 30 }
fn default_true() -> bool { true }

impl DirectoryConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  pub fn reconciler_options(&self) -> ReconcilerOptions {
    ReconcilerOptions {
      fetch_timeout:      self.timeout(),
      announce_new_users: self.announce_new_users,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted under `/1.0`, with request tracing.
pub fn router<S>(engine: Engine<S>) -> Router
where
  S: PresenceStore + 'static,
{
  Router::new()
    .nest("/1.0", chatd_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

// ─── Event drain ──────────────────────────────────────────────────────────────

/// Forward published events to the log until every sender is gone.
pub fn spawn_event_drain(mut events: mpsc::UnboundedReceiver<Envelope>) -> JoinHandle<()> {
  tokio::spawn(async move {
    while let Some(envelope) = events.recv().await {
      match serde_json::to_string(&envelope) {
        Ok(payload) => tracing::info!(
          event = envelope.event.name(),
          user = %envelope.event.user_uuid(),
          %payload,
          "event",
        ),
        Err(e) => tracing::warn!(error = %e, "failed to serialise event"),
      }
    }
    tracing::debug!("event bus closed");
  })
}
