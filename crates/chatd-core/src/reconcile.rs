//! Snapshot reconciliation: directory snapshot → minimal store mutations.
//!
//! Three passes run in dependency order (tenants, users, sessions). Each pass
//! diffs the desired identity set against what the transaction currently sees,
//! creates what is missing, then deletes what is stale. Cascades triggered by
//! deletes are the store's business; a pass simply reads the store afresh.
//!
//! The incremental tenant/user handlers at the bottom reuse the same
//! [`StoreTx`] primitives, so live events and bootstrap cannot drift apart.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::{
  Result,
  snapshot::{Snapshot, SnapshotSession},
  store::{StoreTx, ensure_tenant, has_mobile_token},
  tenant::Tenant,
  user::{Session, User},
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Every mutation a reconciliation committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedChanges {
  pub created_tenants:    Vec<Uuid>,
  pub deleted_tenants:    Vec<Uuid>,
  pub created_users:      Vec<User>,
  pub deleted_users:      Vec<Uuid>,
  /// Users deleted and created again because their tenant changed upstream.
  pub recreated_users:    Vec<User>,
  pub created_sessions:   Vec<Uuid>,
  pub deleted_sessions:   Vec<Uuid>,
  /// Sessions deleted and created again because their owner changed upstream.
  pub recreated_sessions: Vec<Uuid>,
  /// Sessions whose `mobile` flag was corrected in place.
  pub updated_sessions:   Vec<Uuid>,
}

impl AppliedChanges {
  pub fn is_empty(&self) -> bool { self.total() == 0 }

  pub fn total(&self) -> usize {
    self.created_tenants.len()
      + self.deleted_tenants.len()
      + self.created_users.len()
      + self.deleted_users.len()
      + self.recreated_users.len()
      + self.created_sessions.len()
      + self.deleted_sessions.len()
      + self.recreated_sessions.len()
      + self.updated_sessions.len()
  }

  /// Users that did not exist locally (under their current tenant) before
  /// this reconciliation.
  pub fn new_users(&self) -> impl Iterator<Item = &User> {
    self.created_users.iter().chain(&self.recreated_users)
  }
}

// ─── Desired state ───────────────────────────────────────────────────────────

/// The identity sets a snapshot asks for, with implied parents filled in.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Desired {
  pub tenants:  BTreeSet<Uuid>,
  /// user → tenant
  pub users:    BTreeMap<Uuid, Uuid>,
  pub sessions: BTreeMap<Uuid, SnapshotSession>,
}

impl Desired {
  /// Collapse duplicates (last occurrence wins) and add the tenant of every
  /// user and the user of every session, so no child is left without a parent.
  pub fn from_snapshot(snapshot: &Snapshot) -> Self {
    let mut desired = Self::default();

    desired.tenants.extend(snapshot.tenants.iter().map(|t| t.uuid));
    for user in &snapshot.users {
      desired.users.insert(user.uuid, user.tenant_uuid);
    }
    for session in &snapshot.sessions {
      desired.sessions.insert(session.uuid, session.clone());
    }

    for session in desired.sessions.values() {
      desired.users.entry(session.user_uuid).or_insert_with(|| {
        tracing::debug!(user = %session.user_uuid, session = %session.uuid, "user implied by session");
        session.tenant_uuid
      });
    }
    for (user, tenant) in &desired.users {
      if desired.tenants.insert(*tenant) {
        tracing::debug!(%user, %tenant, "tenant implied by user");
      }
    }

    desired
  }
}

// ─── Reconcile ───────────────────────────────────────────────────────────────

/// Bring the store's tenant, user and session identity sets into exact
/// correspondence with `snapshot`. Never touches user state or status, except
/// for users that have to be recreated.
pub fn reconcile(tx: &mut dyn StoreTx, snapshot: &Snapshot) -> Result<AppliedChanges> {
  let desired = Desired::from_snapshot(snapshot);
  let mut applied = AppliedChanges::default();

  reconcile_tenants(tx, &desired, &mut applied)?;
  reconcile_users(tx, &desired, &mut applied)?;
  reconcile_sessions(tx, &desired, &mut applied)?;

  Ok(applied)
}

fn reconcile_tenants(
  tx: &mut dyn StoreTx,
  desired: &Desired,
  applied: &mut AppliedChanges,
) -> Result<()> {
  let current: BTreeSet<Uuid> = tx.list_tenants()?.into_iter().map(|t| t.uuid).collect();

  for &uuid in desired.tenants.difference(&current) {
    tx.insert_tenant(&Tenant::new(uuid))?;
    applied.created_tenants.push(uuid);
  }
  for &uuid in current.difference(&desired.tenants) {
    tx.delete_tenant(uuid)?;
    applied.deleted_tenants.push(uuid);
  }
  Ok(())
}

fn reconcile_users(
  tx: &mut dyn StoreTx,
  desired: &Desired,
  applied: &mut AppliedChanges,
) -> Result<()> {
  let current: BTreeMap<Uuid, User> =
    tx.list_users(None)?.into_iter().map(|u| (u.uuid, u)).collect();

  for (&uuid, &tenant_uuid) in &desired.users {
    match current.get(&uuid) {
      None => {
        let user = User::new(uuid, tenant_uuid);
        tx.insert_user(&user)?;
        applied.created_users.push(user);
      }
      Some(existing) if existing.tenant_uuid != tenant_uuid => {
        tracing::warn!(
          user = %uuid,
          stored_tenant = %existing.tenant_uuid,
          snapshot_tenant = %tenant_uuid,
          "user changed tenant upstream; recreating",
        );
        tx.delete_user(uuid)?;
        let user = User::new(uuid, tenant_uuid);
        tx.insert_user(&user)?;
        applied.recreated_users.push(user);
      }
      Some(_) => {}
    }
  }
  for &uuid in current.keys().filter(|u| !desired.users.contains_key(*u)) {
    tx.delete_user(uuid)?;
    applied.deleted_users.push(uuid);
  }
  Ok(())
}

fn reconcile_sessions(
  tx: &mut dyn StoreTx,
  desired: &Desired,
  applied: &mut AppliedChanges,
) -> Result<()> {
  let current: BTreeMap<Uuid, Session> =
    tx.list_sessions(None)?.into_iter().map(|s| (s.uuid, s)).collect();

  for (&uuid, wanted) in &desired.sessions {
    let session = Session {
      uuid,
      user_uuid: wanted.user_uuid,
      mobile: wanted.mobile || has_mobile_token(tx, wanted.user_uuid)?,
    };
    match current.get(&uuid) {
      None => {
        tx.insert_session(&session)?;
        applied.created_sessions.push(uuid);
      }
      Some(existing) if existing.user_uuid != session.user_uuid => {
        tracing::warn!(
          session = %uuid,
          stored_user = %existing.user_uuid,
          snapshot_user = %session.user_uuid,
          "session changed owner upstream; recreating",
        );
        tx.delete_session(uuid)?;
        tx.insert_session(&session)?;
        applied.recreated_sessions.push(uuid);
      }
      Some(existing) if existing.mobile != session.mobile => {
        tx.update_session(&session)?;
        applied.updated_sessions.push(uuid);
      }
      Some(_) => {}
    }
  }
  for &uuid in current.keys().filter(|s| !desired.sessions.contains_key(*s)) {
    tx.delete_session(uuid)?;
    applied.deleted_sessions.push(uuid);
  }
  Ok(())
}

// ─── Incremental events ──────────────────────────────────────────────────────

/// Returns `true` if the tenant was created.
pub fn tenant_created(tx: &mut dyn StoreTx, uuid: Uuid) -> Result<bool> {
  ensure_tenant(tx, uuid)
}

/// Returns `true` if the tenant existed and was deleted (with its users).
pub fn tenant_deleted(tx: &mut dyn StoreTx, uuid: Uuid) -> Result<bool> {
  tx.delete_tenant(uuid)
}

/// Create the user (and its tenant) if missing. A user already stored under
/// another tenant is recreated, as in [`reconcile`]. Returns the user if it
/// is new.
pub fn user_created(
  tx: &mut dyn StoreTx,
  uuid: Uuid,
  tenant_uuid: Uuid,
) -> Result<Option<User>> {
  match tx.get_user(uuid)? {
    Some(existing) if existing.tenant_uuid == tenant_uuid => return Ok(None),
    Some(existing) => {
      tracing::warn!(
        user = %uuid,
        stored_tenant = %existing.tenant_uuid,
        event_tenant = %tenant_uuid,
        "user changed tenant upstream; recreating",
      );
      tx.delete_user(uuid)?;
    }
    None => {}
  }

  ensure_tenant(tx, tenant_uuid)?;
  let user = User::new(uuid, tenant_uuid);
  tx.insert_user(&user)?;
  Ok(Some(user))
}

/// Returns `true` if the user existed and was deleted (with its sessions).
pub fn user_deleted(tx: &mut dyn StoreTx, uuid: Uuid) -> Result<bool> {
  tx.delete_user(uuid)
}
