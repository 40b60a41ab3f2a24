//! Async services of the chatd presence engine.
//!
//! [`Engine`] wires one store and one bus into the three services that
//! mutate presence state: [`SessionTracker`], [`Reconciler`] and
//! [`RoomService`]. All of them commit first and notify second, through a
//! shared [`EventNotifier`].
//!
//! # Wiring
//!
//! ```rust,ignore
//! let (bus, events) = ChannelBus::new();
//! let engine = Engine::new(Arc::new(store), Arc::new(bus), ReconcilerOptions::default());
//! engine.reconciler.bootstrap(&fetcher).await?;
//! ```

pub mod bus;
pub mod error;
pub mod event;
pub mod notifier;
pub mod reconciler;
pub mod rooms;
pub mod tracker;

use std::sync::Arc;

use chatd_core::{
  event::Bus,
  store::PresenceStore,
  user::RefreshToken,
};

pub use bus::{ChannelBus, Envelope};
pub use error::{Error, Result};
pub use event::DirectoryEvent;
pub use notifier::EventNotifier;
pub use reconciler::{Reconciler, ReconcilerOptions};
pub use rooms::RoomService;
pub use tracker::SessionTracker;

/// The engine's services, sharing one store and one notifier.
pub struct Engine<S> {
  pub tracker:    SessionTracker<S>,
  pub reconciler: Reconciler<S>,
  pub rooms:      RoomService<S>,
}

impl<S> Clone for Engine<S> {
  fn clone(&self) -> Self {
    Self {
      tracker:    self.tracker.clone(),
      reconciler: self.reconciler.clone(),
      rooms:      self.rooms.clone(),
    }
  }
}

impl<S: PresenceStore> Engine<S> {
  pub fn new(store: Arc<S>, bus: Arc<dyn Bus>, options: ReconcilerOptions) -> Self {
    let notifier = EventNotifier::new(bus);
    Self {
      tracker:    SessionTracker::new(Arc::clone(&store), notifier.clone()),
      reconciler: Reconciler::new(Arc::clone(&store), notifier.clone(), options),
      rooms:      RoomService::new(store, notifier),
    }
  }

  /// Route one live directory event to the service that owns it.
  pub async fn handle(&self, event: DirectoryEvent) -> Result<()> {
    tracing::debug!(event = event.name(), "directory event received");
    match event {
      DirectoryEvent::SessionCreated(session) => {
        self.tracker.on_session_added(session).await?;
      }
      DirectoryEvent::SessionDeleted { uuid } => {
        self.tracker.on_session_removed(uuid).await?;
      }
      DirectoryEvent::TenantCreated { uuid } => {
        self.reconciler.on_tenant_created(uuid).await?;
      }
      DirectoryEvent::TenantDeleted { uuid } => {
        self.reconciler.on_tenant_deleted(uuid).await?;
      }
      DirectoryEvent::UserCreated { uuid, tenant_uuid } => {
        self.reconciler.on_user_created(uuid, tenant_uuid).await?;
      }
      DirectoryEvent::UserDeleted { uuid } => {
        self.reconciler.on_user_deleted(uuid).await?;
      }
      DirectoryEvent::RefreshTokenCreated { client_id, user_uuid, tenant_uuid, mobile } => {
        let token = RefreshToken { client_id, user_uuid, mobile };
        self.tracker.on_refresh_token_added(token, tenant_uuid).await?;
      }
      DirectoryEvent::RefreshTokenDeleted { client_id, user_uuid } => {
        self.tracker.on_refresh_token_removed(client_id, user_uuid).await?;
      }
    }
    Ok(())
  }
}
