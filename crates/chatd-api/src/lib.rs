//! JSON REST API for chatd.
//!
//! Exposes an axum [`Router`] over an [`Engine`] backed by any
//! [`PresenceStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility; tenant scoping is taken from an optional `tenant_uuid`
//! query parameter.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/1.0", chatd_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod events;
pub mod presences;
pub mod rooms;

use axum::{
  Router,
  routing::{get, post},
};
use chatd_core::store::PresenceStore;
use chatd_engine::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
pub fn api_router<S>(engine: Engine<S>) -> Router<()>
where
  S: PresenceStore + 'static,
{
  Router::new()
    // Presences
    .route("/users/presences", get(presences::list::<S>))
    .route(
      "/users/{uuid}/presences",
      get(presences::get_one::<S>).put(presences::update::<S>),
    )
    // Rooms
    .route("/rooms", get(rooms::list::<S>).post(rooms::create::<S>))
    .route(
      "/rooms/{uuid}/messages",
      get(rooms::list_messages::<S>).post(rooms::create_message::<S>),
    )
    // Directory events
    .route("/events", post(events::handler::<S>))
    .with_state(engine)
}

// ─── Shared shapes ───────────────────────────────────────────────────────────

/// A list response: `{"items": [...], "total": n}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Listing<T> {
  pub items: Vec<T>,
  pub total: usize,
}

impl<T> Listing<T> {
  pub fn new(items: Vec<T>) -> Self {
    let total = items.len();
    Self { items, total }
  }
}

/// `?tenant_uuid=` restricting a request to one tenant.
#[derive(Debug, Default, Deserialize)]
pub struct TenantParams {
  pub tenant_uuid: Option<Uuid>,
}

impl TenantParams {
  /// `None` means every tenant.
  pub fn scope(&self) -> Option<Vec<Uuid>> { self.tenant_uuid.map(|t| vec![t]) }
}
