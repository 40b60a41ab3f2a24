//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings. Timestamps are stored as
//! fixed-width RFC 3339 strings so that lexical order is chronological.

use chatd_core::{
  Error, Result,
  room::{RoomMessage, RoomUser},
  tenant::Tenant,
  user::{RefreshToken, Session, User},
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Uuid::parse_str(s).map_err(Error::backend) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(Error::backend)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub uuid:        String,
  pub tenant_uuid: String,
  pub state:       String,
  pub status:      Option<String>,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      uuid:        decode_uuid(&self.uuid)?,
      tenant_uuid: decode_uuid(&self.tenant_uuid)?,
      state:       self.state.parse()?,
      status:      self.status,
    })
  }
}

pub struct RawSession {
  pub uuid:      String,
  pub user_uuid: String,
  pub mobile:    bool,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      uuid:      decode_uuid(&self.uuid)?,
      user_uuid: decode_uuid(&self.user_uuid)?,
      mobile:    self.mobile,
    })
  }
}

pub struct RawRefreshToken {
  pub client_id: String,
  pub user_uuid: String,
  pub mobile:    bool,
}

impl RawRefreshToken {
  pub fn into_token(self) -> Result<RefreshToken> {
    Ok(RefreshToken {
      client_id: self.client_id,
      user_uuid: decode_uuid(&self.user_uuid)?,
      mobile:    self.mobile,
    })
  }
}

pub fn decode_tenant(uuid: &str) -> Result<Tenant> { Ok(Tenant::new(decode_uuid(uuid)?)) }

/// A `rooms` row, before members and messages are attached.
pub struct RawRoom {
  pub uuid:        String,
  pub tenant_uuid: String,
  pub name:        Option<String>,
}

pub struct RawRoomUser {
  pub uuid:        String,
  pub tenant_uuid: String,
}

impl RawRoomUser {
  pub fn into_room_user(self) -> Result<RoomUser> {
    Ok(RoomUser {
      uuid:        decode_uuid(&self.uuid)?,
      tenant_uuid: decode_uuid(&self.tenant_uuid)?,
    })
  }
}

pub struct RawMessage {
  pub uuid:        String,
  pub room_uuid:   String,
  pub user_uuid:   String,
  pub tenant_uuid: String,
  pub content:     String,
  pub alias:       Option<String>,
  pub created_at:  String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<RoomMessage> {
    Ok(RoomMessage {
      uuid:        decode_uuid(&self.uuid)?,
      room_uuid:   decode_uuid(&self.room_uuid)?,
      user_uuid:   decode_uuid(&self.user_uuid)?,
      tenant_uuid: decode_uuid(&self.tenant_uuid)?,
      content:     self.content,
      alias:       self.alias,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let late = early + chrono::Duration::microseconds(1500);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(encode_dt(early).len(), encode_dt(late).len());
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn bad_state_is_rejected() {
    let raw = RawUser {
      uuid:        encode_uuid(Uuid::new_v4()),
      tenant_uuid: encode_uuid(Uuid::new_v4()),
      state:       "away".into(),
      status:      None,
    };
    assert!(matches!(raw.into_user(), Err(Error::UnknownState(_))));
  }
}
