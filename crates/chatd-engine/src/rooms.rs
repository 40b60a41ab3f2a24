//! [`RoomService`]: local room and message writes, notified after commit.

use std::sync::Arc;

use chatd_core::{
  room::{NewMessage, NewRoom, Room, RoomMessage},
  store::PresenceStore,
};
use uuid::Uuid;

use crate::{Error, Result, notifier::EventNotifier};

pub struct RoomService<S> {
  store:    Arc<S>,
  notifier: EventNotifier,
}

impl<S> Clone for RoomService<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      notifier: self.notifier.clone(),
    }
  }
}

impl<S: PresenceStore> RoomService<S> {
  pub fn new(store: Arc<S>, notifier: EventNotifier) -> Self { Self { store, notifier } }

  pub async fn create_room(&self, room: NewRoom) -> Result<Room> {
    let room = self.store.create_room(room).await.map_err(Error::from_store)?;
    tracing::debug!(room = %room.uuid, members = room.users.len(), "room created");
    self.notifier.room_created(&room);
    Ok(room)
  }

  pub async fn create_message(&self, room_uuid: Uuid, message: NewMessage) -> Result<RoomMessage> {
    let (room, message) = self
      .store
      .create_message(room_uuid, message)
      .await
      .map_err(Error::from_store)?;
    tracing::debug!(room = %room_uuid, message = %message.uuid, "message created");
    self.notifier.message_created(&room, &message);
    Ok(message)
  }

  pub async fn get_room(&self, tenant_uuids: Option<Vec<Uuid>>, room_uuid: Uuid) -> Result<Room> {
    self.store.get_room(tenant_uuids, room_uuid).await.map_err(Error::from_store)
  }

  pub async fn list_rooms(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
    user_uuid: Option<Uuid>,
  ) -> Result<Vec<Room>> {
    self.store.list_rooms(tenant_uuids, user_uuid).await.map_err(Error::from_store)
  }

  /// Messages of a room visible within `tenant_uuids`, oldest first.
  pub async fn list_messages(
    &self,
    tenant_uuids: Option<Vec<Uuid>>,
    room_uuid: Uuid,
  ) -> Result<Vec<RoomMessage>> {
    Ok(self.get_room(tenant_uuids, room_uuid).await?.messages)
  }
}
