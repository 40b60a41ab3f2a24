//! [`SqliteStore`]: the SQLite implementation of [`PresenceStore`].

use std::path::Path;

use chatd_core::{
  room::{NewMessage, NewRoom, Room, RoomMessage},
  store::{PresenceStore, StoreTx, ensure_tenant, in_scope, scoped_user},
  tenant::Tenant,
  user::{RefreshToken, Session, User},
};
use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::{Result, schema::SCHEMA, tx::SqliteTx};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A presence store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one connection thread, so transactions never interleave.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    tracing::debug!(path = %path.as_ref().display(), "opening store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── PresenceStore impl ──────────────────────────────────────────────────────

impl PresenceStore for SqliteStore {
  type Error = crate::Error;

  async fn transaction<F, T>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut dyn StoreTx) -> chatd_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let result = f(&mut SqliteTx::new(&tx));
        match result {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          // Dropping `tx` rolls back.
          Err(e) => Ok(Err(e)),
        }
      })
      .await?;
    Ok(outcome?)
  }

  // ── Tenants ───────────────────────────────────────────────────────────────

  async fn create_tenant(&self, uuid: Uuid) -> Result<Tenant> {
    let tenant = Tenant::new(uuid);
    self
      .transaction(move |tx| tx.insert_tenant(&tenant))
      .await?;
    Ok(tenant)
  }

  async fn find_or_create_tenant(&self, uuid: Uuid) -> Result<Tenant> {
    self
      .transaction(move |tx| {
        ensure_tenant(tx, uuid)?;
        Ok(Tenant::new(uuid))
      })
      .await
  }

  async fn get_tenant(&self, uuid: Uuid) -> Result<Tenant> {
    self
      .transaction(move |tx| {
        tx.get_tenant(uuid)?
          .ok_or(chatd_core::Error::UnknownTenant(uuid))
      })
      .await
  }

  async fn delete_tenant(&self, uuid: Uuid) -> Result<()> {
    self
      .transaction(move |tx| {
        if tx.delete_tenant(uuid)? {
          Ok(())
        } else {
          Err(chatd_core::Error::UnknownTenant(uuid))
        }
      })
      .await
  }

  async fn list_tenants(&self) -> Result<Vec<Tenant>> {
    self.transaction(|tx| tx.list_tenants()).await
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, user: User) -> Result<User> {
    self
      .transaction(move |tx| {
        if tx.get_tenant(user.tenant_uuid)?.is_none() {
          return Err(chatd_core::Error::UnknownTenant(user.tenant_uuid));
        }
        tx.insert_user(&user)?;
        Ok(user)
      })
      .await
  }

  async fn get_user(&self, tenant_uuids: Option<Vec<Uuid>>, uuid: Uuid) -> Result<User> {
    self
      .transaction(move |tx| scoped_user(tx, tenant_uuids.as_deref(), uuid))
      .await
  }

  async fn list_users(&self, tenant_uuids: Option<Vec<Uuid>>) -> Result<Vec<User>> {
    self
      .transaction(move |tx| tx.list_users(tenant_uuids.as_deref()))
      .await
  }

  async fn count_users(&self, tenant_uuids: Option<Vec<Uuid>>) -> Result<usize> {
    self
      .transaction(move |tx| tx.count_users(tenant_uuids.as_deref()))
      .await
  }

  async fn update_user(&self, user: User) -> Result<User> {
    self
      .transaction(move |tx| {
        let Some(stored) = tx.get_user(user.uuid)? else {
          return Err(chatd_core::Error::UnknownUser(user.uuid));
        };
        let updated = User { tenant_uuid: stored.tenant_uuid, ..user };
        tx.update_user(&updated)?;
        Ok(updated)
      })
      .await
  }

  async fn delete_user(&self, uuid: Uuid) -> Result<()> {
    self
      .transaction(move |tx| {
        if tx.delete_user(uuid)? {
          Ok(())
        } else {
          Err(chatd_core::Error::UnknownUser(uuid))
        }
      })
      .await
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn add_session(&self, session: Session) -> Result<()> {
    self
      .transaction(move |tx| {
        if tx.get_user(session.user_uuid)?.is_none() {
          return Err(chatd_core::Error::UnknownUser(session.user_uuid));
        }
        if tx.get_session(session.uuid)?.is_none() {
          tx.insert_session(&session)?;
        }
        Ok(())
      })
      .await
  }

  async fn remove_session(&self, uuid: Uuid) -> Result<()> {
    self
      .transaction(move |tx| {
        tx.delete_session(uuid)?;
        Ok(())
      })
      .await
  }

  async fn list_sessions(&self, user_uuid: Option<Uuid>) -> Result<Vec<Session>> {
    self.transaction(move |tx| tx.list_sessions(user_uuid)).await
  }

  // ── Refresh tokens ────────────────────────────────────────────────────────

  async fn add_refresh_token(&self, token: RefreshToken) -> Result<()> {
    self
      .transaction(move |tx| {
        if tx.get_user(token.user_uuid)?.is_none() {
          return Err(chatd_core::Error::UnknownUser(token.user_uuid));
        }
        if tx.get_refresh_token(&token.client_id, token.user_uuid)?.is_none() {
          tx.insert_refresh_token(&token)?;
        }
        Ok(())
      })
      .await
  }

  async fn remove_refresh_token(&self, client_id: String, user_uuid: Uuid) -> Result<()> {
    self
      .transaction(move |tx| {
        if tx.delete_refresh_token(&client_id, user_uuid)? {
          Ok(())
        } else {
          Err(chatd_core::Error::UnknownRefreshToken(client_id))
        }
      })
      .await
  }

  async fn list_refresh_tokens(&self, user_uuid: Uuid) -> Result<Vec<RefreshToken>> {
    self.transaction(move |tx| tx.list_refresh_tokens(user_uuid)).await
  }

  // ── Rooms ─────────────────────────────────────────────────────────────────

  async fn create_room(&self, room: NewRoom) -> Result<Room> {
    let room = room.into_room();
    self
      .transaction(move |tx| {
        if tx.get_tenant(room.tenant_uuid)?.is_none() {
          return Err(chatd_core::Error::UnknownTenant(room.tenant_uuid));
        }
        tx.insert_room(&room)?;
        Ok(room)
      })
      .await
  }

  async fn get_room(&self, tenant_uuids: Option<Vec<Uuid>>, uuid: Uuid) -> Result<Room> {
    self
      .transaction(move |tx| match tx.get_room(uuid)? {
        Some(room) if in_scope(tenant_uuids.as_deref(), room.tenant_uuid) => Ok(room),
        _ => Err(chatd_core::Error::UnknownRoom(uuid)),
      })
      .await
  }

  async fn list_rooms(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
    user_uuid: Option<Uuid>,
  ) -> Result<Vec<Room>> {
    self
      .transaction(move |tx| tx.list_rooms(tenant_uuids.as_deref(), user_uuid))
      .await
  }

  async fn create_message(
    &self,
    room_uuid: Uuid,
    message: NewMessage,
  ) -> Result<(Room, RoomMessage)> {
    // Stored timestamps carry microseconds.
    let message = message.into_message(room_uuid, Utc::now().trunc_subsecs(6));
    self
      .transaction(move |tx| {
        let mut room = tx
          .get_room(room_uuid)?
          .ok_or(chatd_core::Error::UnknownRoom(room_uuid))?;
        tx.insert_message(&message)?;
        room.messages.push(message.clone());
        Ok((room, message))
      })
      .await
  }

  async fn list_messages(&self, room_uuid: Uuid) -> Result<Vec<RoomMessage>> {
    self
      .transaction(move |tx| {
        if tx.get_room(room_uuid)?.is_none() {
          return Err(chatd_core::Error::UnknownRoom(room_uuid));
        }
        tx.list_messages(room_uuid)
      })
      .await
  }
}
