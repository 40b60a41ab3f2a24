//! The `PresenceStore` trait and the transactional primitives beneath it.
//!
//! [`StoreTx`] is the synchronous, row-level vocabulary every algorithm in this
//! crate is written against. [`PresenceStore`] is the async surface used by the
//! services; its [`PresenceStore::transaction`] method runs a closure against a
//! `StoreTx`, committing on `Ok` and rolling back on `Err`.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  room::{NewMessage, NewRoom, Room, RoomMessage},
  tenant::Tenant,
  user::{RefreshToken, Session, User},
};

// ─── Transaction primitives ──────────────────────────────────────────────────

/// Row-level operations available inside one store transaction.
///
/// Lookups return `Option`; deletes and updates return whether a row was
/// affected. Deleting a tenant or user cascades to everything it owns.
pub trait StoreTx {
  // ── Tenants ───────────────────────────────────────────────────────────

  fn list_tenants(&mut self) -> Result<Vec<Tenant>>;
  fn get_tenant(&mut self, uuid: Uuid) -> Result<Option<Tenant>>;
  fn insert_tenant(&mut self, tenant: &Tenant) -> Result<()>;
  fn delete_tenant(&mut self, uuid: Uuid) -> Result<bool>;

  // ── Users ─────────────────────────────────────────────────────────────

  /// `None` means every tenant.
  fn list_users(&mut self, tenant_uuids: Option<&[Uuid]>) -> Result<Vec<User>>;
  fn count_users(&mut self, tenant_uuids: Option<&[Uuid]>) -> Result<usize>;
  fn get_user(&mut self, uuid: Uuid) -> Result<Option<User>>;
  fn insert_user(&mut self, user: &User) -> Result<()>;
  fn update_user(&mut self, user: &User) -> Result<bool>;
  fn delete_user(&mut self, uuid: Uuid) -> Result<bool>;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// `None` means every user.
  fn list_sessions(&mut self, user_uuid: Option<Uuid>) -> Result<Vec<Session>>;
  fn get_session(&mut self, uuid: Uuid) -> Result<Option<Session>>;
  fn count_sessions(&mut self, user_uuid: Uuid) -> Result<usize>;
  fn insert_session(&mut self, session: &Session) -> Result<()>;
  fn update_session(&mut self, session: &Session) -> Result<bool>;
  fn delete_session(&mut self, uuid: Uuid) -> Result<bool>;

  // ── Refresh tokens ────────────────────────────────────────────────────

  fn list_refresh_tokens(&mut self, user_uuid: Uuid) -> Result<Vec<RefreshToken>>;
  fn get_refresh_token(
    &mut self,
    client_id: &str,
    user_uuid: Uuid,
  ) -> Result<Option<RefreshToken>>;
  fn insert_refresh_token(&mut self, token: &RefreshToken) -> Result<()>;
  fn delete_refresh_token(&mut self, client_id: &str, user_uuid: Uuid) -> Result<bool>;

  // ── Rooms ─────────────────────────────────────────────────────────────

  /// Returns the room with its members and messages.
  fn get_room(&mut self, uuid: Uuid) -> Result<Option<Room>>;
  /// Rooms `user_uuid` belongs to, optionally restricted to tenants.
  fn list_rooms(
    &mut self,
    tenant_uuids: Option<&[Uuid]>,
    user_uuid: Option<Uuid>,
  ) -> Result<Vec<Room>>;
  /// Inserts the room and its memberships; `room.messages` is ignored.
  fn insert_room(&mut self, room: &Room) -> Result<()>;
  fn insert_message(&mut self, message: &RoomMessage) -> Result<()>;
  fn list_messages(&mut self, room_uuid: Uuid) -> Result<Vec<RoomMessage>>;
}

// ─── Helpers shared by every path ────────────────────────────────────────────

/// Create the tenant if it does not exist. Returns `true` if it was created.
pub fn ensure_tenant(tx: &mut dyn StoreTx, uuid: Uuid) -> Result<bool> {
  if tx.get_tenant(uuid)?.is_some() {
    return Ok(false);
  }
  tx.insert_tenant(&Tenant::new(uuid))?;
  Ok(true)
}

/// Fetch the user, creating it (and its tenant) if it does not exist.
/// Returns the user and whether it was created.
pub fn ensure_user(
  tx: &mut dyn StoreTx,
  uuid: Uuid,
  tenant_uuid: Uuid,
) -> Result<(User, bool)> {
  if let Some(user) = tx.get_user(uuid)? {
    if user.tenant_uuid != tenant_uuid {
      tracing::warn!(
        user = %uuid,
        stored_tenant = %user.tenant_uuid,
        event_tenant = %tenant_uuid,
        "event names a different tenant for an existing user; keeping stored tenant",
      );
    }
    return Ok((user, false));
  }
  ensure_tenant(tx, tenant_uuid)?;
  let user = User::new(uuid, tenant_uuid);
  tx.insert_user(&user)?;
  Ok((user, true))
}

/// Fetch a user visible within `tenant_uuids` (`None` = any tenant).
pub fn scoped_user(
  tx: &mut dyn StoreTx,
  tenant_uuids: Option<&[Uuid]>,
  uuid: Uuid,
) -> Result<User> {
  match tx.get_user(uuid)? {
    Some(user) if in_scope(tenant_uuids, user.tenant_uuid) => Ok(user),
    _ => Err(crate::Error::UnknownUser(uuid)),
  }
}

/// Whether the user holds at least one mobile refresh token.
pub fn has_mobile_token(tx: &mut dyn StoreTx, user_uuid: Uuid) -> Result<bool> {
  Ok(tx.list_refresh_tokens(user_uuid)?.iter().any(|t| t.mobile))
}

pub fn in_scope(tenant_uuids: Option<&[Uuid]>, tenant_uuid: Uuid) -> bool {
  tenant_uuids.is_none_or(|ts| ts.contains(&tenant_uuid))
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Backend errors that can carry a domain-level [`crate::Error`].
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// Recover the domain error (e.g. a typed not-found) if that is what this
  /// is; otherwise hand the backend error back.
  fn into_core(self) -> std::result::Result<crate::Error, Self>
  where
    Self: Sized;
}

/// Abstraction over a presence store backend.
///
/// Every method runs in its own transaction. Not-found errors are the typed
/// `Unknown*` variants of [`crate::Error`], carrying the offending id.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PresenceStore: Send + Sync {
  type Error: StoreError;

  /// Run `f` inside one transaction. `Ok` commits; `Err` rolls back and is
  /// returned wrapped in `Self::Error`.
  fn transaction<F, T>(
    &self,
    f: F,
  ) -> impl Future<Output = Result<T, Self::Error>> + Send + '_
  where
    F: FnOnce(&mut dyn StoreTx) -> Result<T> + Send + 'static,
    T: Send + 'static;

  // ── Tenants ───────────────────────────────────────────────────────────

  fn create_tenant(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<Tenant, Self::Error>> + Send + '_;

  /// Return the tenant, creating it first if needed.
  fn find_or_create_tenant(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<Tenant, Self::Error>> + Send + '_;

  fn get_tenant(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<Tenant, Self::Error>> + Send + '_;

  /// Delete the tenant and, by cascade, its users, sessions and rooms.
  fn delete_tenant(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_tenants(
    &self,
  ) -> impl Future<Output = Result<Vec<Tenant>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Fails with `UnknownTenant` if the user's tenant does not exist.
  fn create_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Fetch a user visible within `tenant_uuids` (`None` = any tenant).
  fn get_user(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
    uuid: Uuid,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn list_users(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  fn count_users(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Persist `state` and `status`; `tenant_uuid` is immutable and ignored.
  fn update_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn delete_user(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Attach a session to its user. Adding an existing session is a no-op.
  /// Fails with `UnknownUser` if the user does not exist.
  fn add_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove a session. Removing a missing session is a no-op.
  fn remove_session(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_sessions(
    &self,
    user_uuid: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + '_;

  // ── Refresh tokens ────────────────────────────────────────────────────

  /// Adding an existing token is a no-op. Fails with `UnknownUser` if the
  /// user does not exist.
  fn add_refresh_token(
    &self,
    token: RefreshToken,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fails with `UnknownRefreshToken` if the token does not exist.
  fn remove_refresh_token(
    &self,
    client_id: String,
    user_uuid: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_refresh_tokens(
    &self,
    user_uuid: Uuid,
  ) -> impl Future<Output = Result<Vec<RefreshToken>, Self::Error>> + Send + '_;

  // ── Rooms ─────────────────────────────────────────────────────────────

  /// Create a room with its members, creating the tenant if needed.
  fn create_room(
    &self,
    room: NewRoom,
  ) -> impl Future<Output = Result<Room, Self::Error>> + Send + '_;

  fn get_room(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
    uuid: Uuid,
  ) -> impl Future<Output = Result<Room, Self::Error>> + Send + '_;

  fn list_rooms(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
    user_uuid: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Room>, Self::Error>> + Send + '_;

  /// Append a message and return it together with the room it landed in.
  /// Fails with `UnknownRoom` if the room does not exist.
  fn create_message(
    &self,
    room_uuid: Uuid,
    message: NewMessage,
  ) -> impl Future<Output = Result<(Room, RoomMessage), Self::Error>> + Send + '_;

  /// Messages in creation order, oldest first.
  fn list_messages(
    &self,
    room_uuid: Uuid,
  ) -> impl Future<Output = Result<Vec<RoomMessage>, Self::Error>> + Send + '_;
}
