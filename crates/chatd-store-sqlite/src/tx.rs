//! [`SqliteTx`]: the SQLite implementation of [`StoreTx`].
//!
//! Borrows a connection that is already inside a transaction; committing or
//! rolling back is the caller's job (see [`crate::SqliteStore`]).

use chatd_core::{
  Error, Result,
  room::{Room, RoomMessage},
  store::StoreTx,
  tenant::Tenant,
  user::{RefreshToken, Session, User},
};
use rusqlite::{Connection, OptionalExtension as _, Row, params, params_from_iter};
use uuid::Uuid;

use crate::encode::{
  RawMessage, RawRefreshToken, RawRoom, RawRoomUser, RawSession, RawUser, decode_tenant,
  decode_uuid, encode_dt, encode_uuid,
};

/// Map rusqlite failures into the domain error without losing the source.
trait Db<T> {
  fn db(self) -> Result<T>;
}

impl<T> Db<T> for rusqlite::Result<T> {
  fn db(self) -> Result<T> { self.map_err(Error::backend) }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "uuid, tenant_uuid, state, status";

fn raw_user(row: &Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    uuid:        row.get(0)?,
    tenant_uuid: row.get(1)?,
    state:       row.get(2)?,
    status:      row.get(3)?,
  })
}

fn raw_session(row: &Row<'_>) -> rusqlite::Result<RawSession> {
  Ok(RawSession {
    uuid:      row.get(0)?,
    user_uuid: row.get(1)?,
    mobile:    row.get(2)?,
  })
}

fn raw_token(row: &Row<'_>) -> rusqlite::Result<RawRefreshToken> {
  Ok(RawRefreshToken {
    client_id: row.get(0)?,
    user_uuid: row.get(1)?,
    mobile:    row.get(2)?,
  })
}

fn raw_room(row: &Row<'_>) -> rusqlite::Result<RawRoom> {
  Ok(RawRoom {
    uuid:        row.get(0)?,
    tenant_uuid: row.get(1)?,
    name:        row.get(2)?,
  })
}

/// `column IN (?, ?, …)` for a tenant scope, or a tautology for `None`.
fn tenant_filter(column: &str, tenant_uuids: Option<&[Uuid]>) -> (String, Vec<String>) {
  match tenant_uuids {
    None => ("1 = 1".to_owned(), Vec::new()),
    Some(uuids) => {
      let placeholders = vec!["?"; uuids.len()].join(", ");
      (
        format!("{column} IN ({placeholders})"),
        uuids.iter().copied().map(encode_uuid).collect(),
      )
    }
  }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

pub(crate) struct SqliteTx<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteTx<'c> {
  pub(crate) fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn room_users(&self, room_uuid: &str) -> Result<Vec<chatd_core::room::RoomUser>> {
    let mut stmt = self
      .conn
      .prepare("SELECT uuid, tenant_uuid FROM room_users WHERE room_uuid = ?1 ORDER BY rowid")
      .db()?;
    let raws = stmt
      .query_map(params![room_uuid], |row| {
        Ok(RawRoomUser { uuid: row.get(0)?, tenant_uuid: row.get(1)? })
      })
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    raws.into_iter().map(RawRoomUser::into_room_user).collect()
  }

  /// Attach members and messages to a bare `rooms` row.
  fn hydrate_room(&mut self, raw: RawRoom) -> Result<Room> {
    let uuid = decode_uuid(&raw.uuid)?;
    Ok(Room {
      uuid,
      tenant_uuid: decode_uuid(&raw.tenant_uuid)?,
      name: raw.name,
      users: self.room_users(&raw.uuid)?,
      messages: self.list_messages(uuid)?,
    })
  }
}

impl StoreTx for SqliteTx<'_> {
  // ── Tenants ───────────────────────────────────────────────────────────────

  fn list_tenants(&mut self) -> Result<Vec<Tenant>> {
    let mut stmt = self.conn.prepare("SELECT uuid FROM tenants").db()?;
    let raws = stmt
      .query_map([], |row| row.get::<_, String>(0))
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    raws.iter().map(|s| decode_tenant(s)).collect()
  }

  fn get_tenant(&mut self, uuid: Uuid) -> Result<Option<Tenant>> {
    let raw: Option<String> = self
      .conn
      .query_row(
        "SELECT uuid FROM tenants WHERE uuid = ?1",
        params![encode_uuid(uuid)],
        |row| row.get(0),
      )
      .optional()
      .db()?;
    raw.as_deref().map(decode_tenant).transpose()
  }

  fn insert_tenant(&mut self, tenant: &Tenant) -> Result<()> {
    self
      .conn
      .execute("INSERT INTO tenants (uuid) VALUES (?1)", params![encode_uuid(tenant.uuid)])
      .db()?;
    Ok(())
  }

  fn delete_tenant(&mut self, uuid: Uuid) -> Result<bool> {
    let n = self
      .conn
      .execute("DELETE FROM tenants WHERE uuid = ?1", params![encode_uuid(uuid)])
      .db()?;
    Ok(n > 0)
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  fn list_users(&mut self, tenant_uuids: Option<&[Uuid]>) -> Result<Vec<User>> {
    let (filter, args) = tenant_filter("tenant_uuid", tenant_uuids);
    let mut stmt = self
      .conn
      .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}"))
      .db()?;
    let raws = stmt
      .query_map(params_from_iter(args), raw_user)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    raws.into_iter().map(RawUser::into_user).collect()
  }

  fn count_users(&mut self, tenant_uuids: Option<&[Uuid]>) -> Result<usize> {
    let (filter, args) = tenant_filter("tenant_uuid", tenant_uuids);
    let n: i64 = self
      .conn
      .query_row(
        &format!("SELECT COUNT(*) FROM users WHERE {filter}"),
        params_from_iter(args),
        |row| row.get(0),
      )
      .db()?;
    Ok(n as usize)
  }

  fn get_user(&mut self, uuid: Uuid) -> Result<Option<User>> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE uuid = ?1"),
        params![encode_uuid(uuid)],
        raw_user,
      )
      .optional()
      .db()?;
    raw.map(RawUser::into_user).transpose()
  }

  fn insert_user(&mut self, user: &User) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO users (uuid, tenant_uuid, state, status) VALUES (?1, ?2, ?3, ?4)",
        params![
          encode_uuid(user.uuid),
          encode_uuid(user.tenant_uuid),
          user.state.as_str(),
          user.status,
        ],
      )
      .db()?;
    Ok(())
  }

  fn update_user(&mut self, user: &User) -> Result<bool> {
    let n = self
      .conn
      .execute(
        "UPDATE users SET state = ?2, status = ?3 WHERE uuid = ?1",
        params![encode_uuid(user.uuid), user.state.as_str(), user.status],
      )
      .db()?;
    Ok(n > 0)
  }

  fn delete_user(&mut self, uuid: Uuid) -> Result<bool> {
    let n = self
      .conn
      .execute("DELETE FROM users WHERE uuid = ?1", params![encode_uuid(uuid)])
      .db()?;
    Ok(n > 0)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  fn list_sessions(&mut self, user_uuid: Option<Uuid>) -> Result<Vec<Session>> {
    let raws = match user_uuid {
      Some(user_uuid) => {
        let mut stmt = self
          .conn
          .prepare("SELECT uuid, user_uuid, mobile FROM sessions WHERE user_uuid = ?1")
          .db()?;
        stmt
          .query_map(params![encode_uuid(user_uuid)], raw_session)
          .db()?
          .collect::<rusqlite::Result<Vec<_>>>()
          .db()?
      }
      None => {
        let mut stmt = self
          .conn
          .prepare("SELECT uuid, user_uuid, mobile FROM sessions")
          .db()?;
        stmt
          .query_map([], raw_session)
          .db()?
          .collect::<rusqlite::Result<Vec<_>>>()
          .db()?
      }
    };
    raws.into_iter().map(RawSession::into_session).collect()
  }

  fn get_session(&mut self, uuid: Uuid) -> Result<Option<Session>> {
    let raw = self
      .conn
      .query_row(
        "SELECT uuid, user_uuid, mobile FROM sessions WHERE uuid = ?1",
        params![encode_uuid(uuid)],
        raw_session,
      )
      .optional()
      .db()?;
    raw.map(RawSession::into_session).transpose()
  }

  fn count_sessions(&mut self, user_uuid: Uuid) -> Result<usize> {
    let n: i64 = self
      .conn
      .query_row(
        "SELECT COUNT(*) FROM sessions WHERE user_uuid = ?1",
        params![encode_uuid(user_uuid)],
        |row| row.get(0),
      )
      .db()?;
    Ok(n as usize)
  }

  fn insert_session(&mut self, session: &Session) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO sessions (uuid, user_uuid, mobile) VALUES (?1, ?2, ?3)",
        params![encode_uuid(session.uuid), encode_uuid(session.user_uuid), session.mobile],
      )
      .db()?;
    Ok(())
  }

  fn update_session(&mut self, session: &Session) -> Result<bool> {
    let n = self
      .conn
      .execute(
        "UPDATE sessions SET mobile = ?2 WHERE uuid = ?1",
        params![encode_uuid(session.uuid), session.mobile],
      )
      .db()?;
    Ok(n > 0)
  }

  fn delete_session(&mut self, uuid: Uuid) -> Result<bool> {
    let n = self
      .conn
      .execute("DELETE FROM sessions WHERE uuid = ?1", params![encode_uuid(uuid)])
      .db()?;
    Ok(n > 0)
  }

  // ── Refresh tokens ────────────────────────────────────────────────────────

  fn list_refresh_tokens(&mut self, user_uuid: Uuid) -> Result<Vec<RefreshToken>> {
    let mut stmt = self
      .conn
      .prepare("SELECT client_id, user_uuid, mobile FROM refresh_tokens WHERE user_uuid = ?1")
      .db()?;
    let raws = stmt
      .query_map(params![encode_uuid(user_uuid)], raw_token)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    raws.into_iter().map(RawRefreshToken::into_token).collect()
  }

  fn get_refresh_token(
    &mut self,
    client_id: &str,
    user_uuid: Uuid,
  ) -> Result<Option<RefreshToken>> {
    let raw = self
      .conn
      .query_row(
        "SELECT client_id, user_uuid, mobile FROM refresh_tokens
         WHERE client_id = ?1 AND user_uuid = ?2",
        params![client_id, encode_uuid(user_uuid)],
        raw_token,
      )
      .optional()
      .db()?;
    raw.map(RawRefreshToken::into_token).transpose()
  }

  fn insert_refresh_token(&mut self, token: &RefreshToken) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO refresh_tokens (client_id, user_uuid, mobile) VALUES (?1, ?2, ?3)",
        params![token.client_id, encode_uuid(token.user_uuid), token.mobile],
      )
      .db()?;
    Ok(())
  }

  fn delete_refresh_token(&mut self, client_id: &str, user_uuid: Uuid) -> Result<bool> {
    let n = self
      .conn
      .execute(
        "DELETE FROM refresh_tokens WHERE client_id = ?1 AND user_uuid = ?2",
        params![client_id, encode_uuid(user_uuid)],
      )
      .db()?;
    Ok(n > 0)
  }

  // ── Rooms ─────────────────────────────────────────────────────────────────

  fn get_room(&mut self, uuid: Uuid) -> Result<Option<Room>> {
    let raw = self
      .conn
      .query_row(
        "SELECT uuid, tenant_uuid, name FROM rooms WHERE uuid = ?1",
        params![encode_uuid(uuid)],
        raw_room,
      )
      .optional()
      .db()?;
    raw.map(|r| self.hydrate_room(r)).transpose()
  }

  fn list_rooms(
    &mut self,
    tenant_uuids: Option<&[Uuid]>,
    user_uuid: Option<Uuid>,
  ) -> Result<Vec<Room>> {
    let (filter, mut args) = tenant_filter("r.tenant_uuid", tenant_uuids);
    let mut sql = format!("SELECT r.uuid, r.tenant_uuid, r.name FROM rooms r WHERE {filter}");
    if let Some(user_uuid) = user_uuid {
      sql.push_str(
        " AND EXISTS (SELECT 1 FROM room_users ru WHERE ru.room_uuid = r.uuid AND ru.uuid = ?)",
      );
      args.push(encode_uuid(user_uuid));
    }
    sql.push_str(" ORDER BY r.rowid");

    let raws = {
      let mut stmt = self.conn.prepare(&sql).db()?;
      stmt
        .query_map(params_from_iter(args), raw_room)
        .db()?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db()?
    };
    raws.into_iter().map(|r| self.hydrate_room(r)).collect()
  }

  fn insert_room(&mut self, room: &Room) -> Result<()> {
    let room_uuid = encode_uuid(room.uuid);
    self
      .conn
      .execute(
        "INSERT INTO rooms (uuid, tenant_uuid, name) VALUES (?1, ?2, ?3)",
        params![room_uuid, encode_uuid(room.tenant_uuid), room.name],
      )
      .db()?;
    for user in &room.users {
      self
        .conn
        .execute(
          "INSERT INTO room_users (room_uuid, uuid, tenant_uuid) VALUES (?1, ?2, ?3)",
          params![room_uuid, encode_uuid(user.uuid), encode_uuid(user.tenant_uuid)],
        )
        .db()?;
    }
    Ok(())
  }

  fn insert_message(&mut self, message: &RoomMessage) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO room_messages (
           uuid, room_uuid, user_uuid, tenant_uuid, content, alias, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
          encode_uuid(message.uuid),
          encode_uuid(message.room_uuid),
          encode_uuid(message.user_uuid),
          encode_uuid(message.tenant_uuid),
          message.content,
          message.alias,
          encode_dt(message.created_at),
        ],
      )
      .db()?;
    Ok(())
  }

  fn list_messages(&mut self, room_uuid: Uuid) -> Result<Vec<RoomMessage>> {
    let mut stmt = self
      .conn
      .prepare(
        "SELECT uuid, room_uuid, user_uuid, tenant_uuid, content, alias, created_at
         FROM room_messages
         WHERE room_uuid = ?1
         ORDER BY created_at, rowid",
      )
      .db()?;
    let raws = stmt
      .query_map(params![encode_uuid(room_uuid)], |row| {
        Ok(RawMessage {
          uuid:        row.get(0)?,
          room_uuid:   row.get(1)?,
          user_uuid:   row.get(2)?,
          tenant_uuid: row.get(3)?,
          content:     row.get(4)?,
          alias:       row.get(5)?,
          created_at:  row.get(6)?,
        })
      })
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    raws.into_iter().map(RawMessage::into_message).collect()
  }
}
