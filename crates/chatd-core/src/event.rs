//! Outbound domain events and the bus they are published on.
//!
//! Every event concerns exactly one user and is routed with a
//! `user_uuid:<uuid>` header, so transport-level fan-out can filter per
//! subscriber without the publisher knowing who listens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  room::{Room, RoomMessage},
  user::UserPresence,
};

/// Routing headers; a header is matched by key, the value is always `true`.
pub type Headers = BTreeMap<String, bool>;

/// The routing header key for one user.
pub fn user_header(user_uuid: Uuid) -> String { format!("user_uuid:{user_uuid}") }

/// Headers addressing a single user.
pub fn user_headers(user_uuid: Uuid) -> Headers {
  Headers::from([(user_header(user_uuid), true)])
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum Event {
  #[serde(rename = "chatd_user_room_created")]
  UserRoomCreated { user_uuid: Uuid, room: Room },

  #[serde(rename = "chatd_user_room_message_created")]
  UserRoomMessageCreated {
    user_uuid: Uuid,
    room_uuid: Uuid,
    message:   RoomMessage,
  },

  #[serde(rename = "chatd_presence_updated")]
  PresenceUpdated(UserPresence),

  /// A user became visible to the notification audience for the first time.
  #[serde(rename = "chatd_presence_created")]
  PresenceCreated(UserPresence),
}

impl Event {
  /// The bus event name. Must match the serde renames above.
  pub fn name(&self) -> &'static str {
    match self {
      Self::UserRoomCreated { .. } => "chatd_user_room_created",
      Self::UserRoomMessageCreated { .. } => "chatd_user_room_message_created",
      Self::PresenceUpdated(_) => "chatd_presence_updated",
      Self::PresenceCreated(_) => "chatd_presence_created",
    }
  }

  /// The user this event is addressed to.
  pub fn user_uuid(&self) -> Uuid {
    match self {
      Self::UserRoomCreated { user_uuid, .. }
      | Self::UserRoomMessageCreated { user_uuid, .. } => *user_uuid,
      Self::PresenceUpdated(p) | Self::PresenceCreated(p) => p.uuid,
    }
  }
}

// ─── Bus ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("bus is closed")]
  Closed,

  #[error("transport error: {0}")]
  Transport(String),
}

/// Fire-and-forget transport for outbound events. `publish` must not wait for
/// any acknowledgement from subscribers.
pub trait Bus: Send + Sync {
  fn publish(&self, event: Event, headers: Headers) -> Result<(), PublishError>;
}
