//! Handlers for `/rooms` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/rooms` | Body: [`NewRoom`]; 201 + room |
//! | `GET`  | `/rooms` | Optional `?user_uuid=` and `?tenant_uuid=` |
//! | `GET`  | `/rooms/{uuid}/messages` | Oldest first |
//! | `POST` | `/rooms/{uuid}/messages` | Body: [`NewMessage`]; 201 + message |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use chatd_core::{
  room::{NewMessage, NewRoom, Room, RoomMessage},
  store::PresenceStore,
};
use chatd_engine::Engine;
use serde::Deserialize;
use uuid::Uuid;

use crate::{Listing, TenantParams, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /rooms`
pub async fn create<S>(
  State(engine): State<Engine<S>>,
  body: Result<Json<NewRoom>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PresenceStore + 'static,
{
  let Json(room) = body?;
  let room = engine.rooms.create_room(room).await?;
  Ok((StatusCode::CREATED, Json(room)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user_uuid:   Option<Uuid>,
  pub tenant_uuid: Option<Uuid>,
}

/// `GET /rooms[?user_uuid=<uuid>][&tenant_uuid=<uuid>]`
pub async fn list<S>(
  State(engine): State<Engine<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Listing<Room>>, ApiError>
where
  S: PresenceStore + 'static,
{
  let Query(params) = params?;
  let scope = params.tenant_uuid.map(|t| vec![t]);
  let rooms = engine.rooms.list_rooms(scope, params.user_uuid).await?;
  Ok(Json(Listing::new(rooms)))
}

// ─── Messages ─────────────────────────────────────────────────────────────────

/// `GET /rooms/{uuid}/messages[?tenant_uuid=<uuid>]`
pub async fn list_messages<S>(
  State(engine): State<Engine<S>>,
  uuid: Result<Path<Uuid>, PathRejection>,
  params: Result<Query<TenantParams>, QueryRejection>,
) -> Result<Json<Listing<RoomMessage>>, ApiError>
where
  S: PresenceStore + 'static,
{
  let Path(uuid) = uuid?;
  let Query(params) = params?;
  let messages = engine.rooms.list_messages(params.scope(), uuid).await?;
  Ok(Json(Listing::new(messages)))
}

/// `POST /rooms/{uuid}/messages[?tenant_uuid=<uuid>]`
pub async fn create_message<S>(
  State(engine): State<Engine<S>>,
  uuid: Result<Path<Uuid>, PathRejection>,
  params: Result<Query<TenantParams>, QueryRejection>,
  body: Result<Json<NewMessage>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PresenceStore + 'static,
{
  let Path(uuid) = uuid?;
  let Query(params) = params?;
  let Json(message) = body?;
  engine.rooms.get_room(params.scope(), uuid).await?;
  let message = engine.rooms.create_message(uuid, message).await?;
  Ok((StatusCode::CREATED, Json(message)))
}
