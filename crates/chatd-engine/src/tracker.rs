//! [`SessionTracker`]: live session, refresh-token and manual presence
//! updates.
//!
//! Each call is one store transaction; a presence-updated event follows the
//! commit unless the call turned out to be a no-op.

use std::sync::Arc;

use chatd_core::{
  presence::{self, PresenceChange},
  store::PresenceStore,
  user::{NewSession, PresenceState, RefreshToken, UserPresence},
};
use uuid::Uuid;

use crate::{Error, Result, notifier::EventNotifier};

pub struct SessionTracker<S> {
  store:    Arc<S>,
  notifier: EventNotifier,
}

impl<S> Clone for SessionTracker<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      notifier: self.notifier.clone(),
    }
  }
}

impl<S: PresenceStore> SessionTracker<S> {
  pub fn new(store: Arc<S>, notifier: EventNotifier) -> Self { Self { store, notifier } }

  /// Apply a session-created event. Redelivery of a known session is a
  /// no-op and returns `None`.
  pub async fn on_session_added(&self, session: NewSession) -> Result<Option<UserPresence>> {
    let session_uuid = session.uuid;
    let change = self
      .store
      .transaction(move |tx| presence::add_session(tx, &session))
      .await
      .map_err(Error::from_store)?;

    if let Some(change) = &change {
      tracing::debug!(session = %session_uuid, user = %change.user.uuid, created = change.user_created, "session added");
    }
    Ok(change.map(|c| self.announce(c)))
  }

  /// Apply a session-deleted event. An unknown session is a no-op and
  /// returns `None`.
  pub async fn on_session_removed(&self, session_uuid: Uuid) -> Result<Option<UserPresence>> {
    let change = self
      .store
      .transaction(move |tx| presence::remove_session(tx, session_uuid))
      .await
      .map_err(Error::from_store)?;

    if change.is_some() {
      tracing::debug!(session = %session_uuid, "session removed");
    }
    Ok(change.map(|c| self.announce(c)))
  }

  pub async fn on_refresh_token_added(
    &self,
    token: RefreshToken,
    tenant_uuid: Uuid,
  ) -> Result<Option<UserPresence>> {
    let change = self
      .store
      .transaction(move |tx| presence::add_refresh_token(tx, &token, tenant_uuid))
      .await
      .map_err(Error::from_store)?;
    Ok(change.map(|c| self.announce(c)))
  }

  pub async fn on_refresh_token_removed(
    &self,
    client_id: String,
    user_uuid: Uuid,
  ) -> Result<Option<UserPresence>> {
    let change = self
      .store
      .transaction(move |tx| presence::remove_refresh_token(tx, &client_id, user_uuid))
      .await
      .map_err(Error::from_store)?;
    Ok(change.map(|c| self.announce(c)))
  }

  /// Set state and status by hand. `tenant_uuids` restricts which users may
  /// be addressed (`None` = any tenant).
  pub async fn update_presence(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
    user_uuid: Uuid,
    state: PresenceState,
    status: Option<String>,
  ) -> Result<UserPresence> {
    let change = self
      .store
      .transaction(move |tx| {
        presence::update_presence(tx, tenant_uuids.as_deref(), user_uuid, state, status)
      })
      .await
      .map_err(Error::from_store)?;

    tracing::debug!(user = %user_uuid, %state, "presence updated manually");
    Ok(self.announce(change))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn presence(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
    user_uuid: Uuid,
  ) -> Result<UserPresence> {
    self
      .store
      .transaction(move |tx| {
        let user = chatd_core::store::scoped_user(tx, tenant_uuids.as_deref(), user_uuid)?;
        presence::user_presence(tx, &user)
      })
      .await
      .map_err(Error::from_store)
  }

  pub async fn list_presences(&self, tenant_uuids: Option<Vec<Uuid>>) -> Result<Vec<UserPresence>> {
    self
      .store
      .transaction(move |tx| presence::list_presences(tx, tenant_uuids.as_deref()))
      .await
      .map_err(Error::from_store)
  }

  fn announce(&self, change: PresenceChange) -> UserPresence {
    let presence = change.presence();
    self.notifier.presence_updated(presence.clone());
    presence
  }
}
