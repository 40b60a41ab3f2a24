//! [`EventNotifier`]: turns committed mutations into user-scoped events.
//!
//! Callers invoke the notifier only after their transaction has committed.
//! Publish failures are logged and swallowed: the committed state stands and
//! nothing is retried.

use std::sync::Arc;

use chatd_core::{
  event::{Bus, Event, user_headers},
  room::{Room, RoomMessage},
  user::UserPresence,
};

#[derive(Clone)]
pub struct EventNotifier {
  bus: Arc<dyn Bus>,
}

impl EventNotifier {
  pub fn new(bus: Arc<dyn Bus>) -> Self { Self { bus } }

  /// One `chatd_user_room_created` per member.
  pub fn room_created(&self, room: &Room) {
    for member in &room.users {
      self.publish(Event::UserRoomCreated {
        user_uuid: member.uuid,
        room:      room.clone(),
      });
    }
  }

  /// One `chatd_user_room_message_created` per current member, sender
  /// included, all carrying the same message.
  pub fn message_created(&self, room: &Room, message: &RoomMessage) {
    for member in &room.users {
      self.publish(Event::UserRoomMessageCreated {
        user_uuid: member.uuid,
        room_uuid: room.uuid,
        message:   message.clone(),
      });
    }
  }

  pub fn presence_updated(&self, presence: UserPresence) {
    self.publish(Event::PresenceUpdated(presence));
  }

  pub fn presence_created(&self, presence: UserPresence) {
    self.publish(Event::PresenceCreated(presence));
  }

  fn publish(&self, event: Event) {
    let name = event.name();
    let user_uuid = event.user_uuid();
    match self.bus.publish(event, user_headers(user_uuid)) {
      Ok(()) => tracing::debug!(event = name, user = %user_uuid, "event published"),
      Err(e) => tracing::warn!(event = name, user = %user_uuid, error = %e, "failed to publish event"),
    }
  }
}
