//! [`Reconciler`]: bootstrap from a directory snapshot, and the incremental
//! tenant/user handlers that keep the mirror current afterwards.

use std::{sync::Arc, time::Duration};

use chatd_core::{
  presence,
  reconcile::{self, AppliedChanges},
  snapshot::{Snapshot, SnapshotFetcher},
  store::PresenceStore,
  user::{User, UserPresence},
};
use uuid::Uuid;

use crate::{Error, Result, notifier::EventNotifier};

/// Tunables for [`Reconciler`].
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
  /// Upper bound on one snapshot fetch.
  pub fetch_timeout:      Duration,
  /// Publish a presence-created event for every user a bootstrap creates.
  pub announce_new_users: bool,
}

impl Default for ReconcilerOptions {
  fn default() -> Self {
    Self {
      fetch_timeout:      Duration::from_secs(30),
      announce_new_users: true,
    }
  }
}

pub struct Reconciler<S> {
  store:    Arc<S>,
  notifier: EventNotifier,
  options:  ReconcilerOptions,
}

impl<S> Clone for Reconciler<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      notifier: self.notifier.clone(),
      options:  self.options.clone(),
    }
  }
}

impl<S: PresenceStore> Reconciler<S> {
  pub fn new(store: Arc<S>, notifier: EventNotifier, options: ReconcilerOptions) -> Self {
    Self { store, notifier, options }
  }

  /// Apply `snapshot` in one transaction. Publishes nothing.
  pub async fn reconcile(&self, snapshot: Snapshot) -> Result<AppliedChanges> {
    let applied = self
      .store
      .transaction(move |tx| reconcile::reconcile(tx, &snapshot))
      .await
      .map_err(Error::from_store)?;

    tracing::info!(
      tenants_created = applied.created_tenants.len(),
      tenants_deleted = applied.deleted_tenants.len(),
      users_created = applied.created_users.len(),
      users_deleted = applied.deleted_users.len(),
      users_recreated = applied.recreated_users.len(),
      sessions_created = applied.created_sessions.len(),
      sessions_deleted = applied.deleted_sessions.len(),
      sessions_updated = applied.updated_sessions.len() + applied.recreated_sessions.len(),
      "reconciliation committed",
    );
    Ok(applied)
  }

  /// Fetch a snapshot, reconcile it, then announce newly created users.
  ///
  /// A fetch that fails or outlasts `fetch_timeout` yields
  /// `UpstreamUnavailable` and leaves the store untouched.
  pub async fn bootstrap<F: SnapshotFetcher>(&self, fetcher: &F) -> Result<AppliedChanges> {
    let snapshot = self.fetch(fetcher).await?;
    tracing::info!(
      tenants = snapshot.tenants.len(),
      users = snapshot.users.len(),
      sessions = snapshot.sessions.len(),
      "directory snapshot fetched",
    );

    let applied = self.reconcile(snapshot).await?;
    if self.options.announce_new_users {
      self.announce_new_users(&applied).await;
    }
    Ok(applied)
  }

  async fn fetch<F: SnapshotFetcher>(&self, fetcher: &F) -> Result<Snapshot> {
    let timeout = self.options.fetch_timeout;
    match tokio::time::timeout(timeout, fetcher.fetch_all()).await {
      Ok(Ok(snapshot)) => Ok(snapshot),
      Ok(Err(e @ chatd_core::Error::UpstreamUnavailable(_))) => Err(e.into()),
      Ok(Err(e)) => Err(chatd_core::Error::UpstreamUnavailable(e.to_string()).into()),
      Err(_) => Err(
        chatd_core::Error::UpstreamUnavailable(format!("snapshot fetch timed out after {timeout:?}"))
          .into(),
      ),
    }
  }

  /// The reconciliation has already committed, so a failed read here is
  /// logged rather than returned.
  async fn announce_new_users(&self, applied: &AppliedChanges) {
    let users: Vec<User> = applied.new_users().cloned().collect();
    if users.is_empty() {
      return;
    }

    let presences = self
      .store
      .transaction(move |tx| {
        users
          .iter()
          .map(|user| presence::user_presence(tx, user))
          .collect::<chatd_core::Result<Vec<UserPresence>>>()
      })
      .await;

    match presences {
      Ok(presences) => {
        tracing::info!(count = presences.len(), "announcing new users");
        for presence in presences {
          self.notifier.presence_created(presence);
        }
      }
      Err(e) => tracing::warn!(error = %e, "failed to read new users for announcement"),
    }
  }

  // ── Incremental ───────────────────────────────────────────────────────────

  /// Returns `true` if the tenant was created.
  pub async fn on_tenant_created(&self, uuid: Uuid) -> Result<bool> {
    let created = self
      .store
      .transaction(move |tx| reconcile::tenant_created(tx, uuid))
      .await
      .map_err(Error::from_store)?;
    if created {
      tracing::debug!(tenant = %uuid, "tenant created");
    }
    Ok(created)
  }

  /// Returns `true` if the tenant existed.
  pub async fn on_tenant_deleted(&self, uuid: Uuid) -> Result<bool> {
    let deleted = self
      .store
      .transaction(move |tx| reconcile::tenant_deleted(tx, uuid))
      .await
      .map_err(Error::from_store)?;
    if deleted {
      tracing::debug!(tenant = %uuid, "tenant deleted");
    }
    Ok(deleted)
  }

  /// Create the user if missing and announce it. Returns the new user.
  pub async fn on_user_created(&self, uuid: Uuid, tenant_uuid: Uuid) -> Result<Option<User>> {
    let created = self
      .store
      .transaction(move |tx| reconcile::user_created(tx, uuid, tenant_uuid))
      .await
      .map_err(Error::from_store)?;

    if let Some(user) = &created {
      tracing::debug!(user = %uuid, tenant = %tenant_uuid, "user created");
      self.notifier.presence_created(UserPresence::new(user, &[]));
    }
    Ok(created)
  }

  /// Returns `true` if the user existed.
  pub async fn on_user_deleted(&self, uuid: Uuid) -> Result<bool> {
    let deleted = self
      .store
      .transaction(move |tx| reconcile::user_deleted(tx, uuid))
      .await
      .map_err(Error::from_store)?;
    if deleted {
      tracing::debug!(user = %uuid, "user deleted");
    }
    Ok(deleted)
  }
}
