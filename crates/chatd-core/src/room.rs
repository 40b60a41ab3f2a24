//! Group-chat rooms. Rooms and messages are created by local writes only and
//! never reconciled against an external source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A room membership record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUser {
  pub uuid:        Uuid,
  pub tenant_uuid: Uuid,
}

/// A single message. Messages are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMessage {
  pub uuid:        Uuid,
  pub room_uuid:   Uuid,
  pub user_uuid:   Uuid,
  pub tenant_uuid: Uuid,
  pub content:     String,
  pub alias:       Option<String>,
  /// Server-assigned; defines message order within a room.
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
  pub uuid:        Uuid,
  pub tenant_uuid: Uuid,
  pub name:        Option<String>,
  pub users:       Vec<RoomUser>,
  /// Ordered by `created_at`, oldest first.
  pub messages:    Vec<RoomMessage>,
}

impl Room {
  pub fn has_member(&self, user_uuid: Uuid) -> bool {
    self.users.iter().any(|u| u.uuid == user_uuid)
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::PresenceStore::create_room`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
  pub tenant_uuid: Uuid,
  pub name:        Option<String>,
  pub users:       Vec<RoomUser>,
}

impl NewRoom {
  /// Build the room row with a fresh UUID. Duplicate members collapse to
  /// their first occurrence.
  pub fn into_room(self) -> Room {
    let mut users: Vec<RoomUser> = Vec::with_capacity(self.users.len());
    for user in self.users {
      if !users.iter().any(|u| u.uuid == user.uuid) {
        users.push(user);
      }
    }
    Room {
      uuid: Uuid::new_v4(),
      tenant_uuid: self.tenant_uuid,
      name: self.name,
      users,
      messages: Vec::new(),
    }
  }
}

/// Input to [`crate::store::PresenceStore::create_message`]. `created_at` is
/// always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
  pub user_uuid:   Uuid,
  pub tenant_uuid: Uuid,
  pub content:     String,
  pub alias:       Option<String>,
}

impl NewMessage {
  pub fn into_message(self, room_uuid: Uuid, created_at: DateTime<Utc>) -> RoomMessage {
    RoomMessage {
      uuid: Uuid::new_v4(),
      room_uuid,
      user_uuid: self.user_uuid,
      tenant_uuid: self.tenant_uuid,
      content: self.content,
      alias: self.alias,
      created_at,
    }
  }
}
