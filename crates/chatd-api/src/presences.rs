//! Handlers for `/users/.../presences` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/presences` | Optional `?tenant_uuid=` |
//! | `GET`  | `/users/{uuid}/presences` | 404 if not found or out of tenant |
//! | `PUT`  | `/users/{uuid}/presences` | Body: `{"state":"available","status":"..."}`; 204 |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
};
use chatd_core::{store::PresenceStore, user::{PresenceState, UserPresence}};
use chatd_engine::Engine;
use serde::Deserialize;
use uuid::Uuid;

use crate::{Listing, TenantParams, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /users/presences[?tenant_uuid=<uuid>]`
pub async fn list<S>(
  State(engine): State<Engine<S>>,
  params: Result<Query<TenantParams>, QueryRejection>,
) -> Result<Json<Listing<UserPresence>>, ApiError>
where
  S: PresenceStore + 'static,
{
  let Query(params) = params?;
  let items = engine.tracker.list_presences(params.scope()).await?;
  Ok(Json(Listing::new(items)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /users/{uuid}/presences[?tenant_uuid=<uuid>]`
pub async fn get_one<S>(
  State(engine): State<Engine<S>>,
  uuid: Result<Path<Uuid>, PathRejection>,
  params: Result<Query<TenantParams>, QueryRejection>,
) -> Result<Json<UserPresence>, ApiError>
where
  S: PresenceStore + 'static,
{
  let Path(uuid) = uuid?;
  let Query(params) = params?;
  let presence = engine.tracker.presence(params.scope(), uuid).await?;
  Ok(Json(presence))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub state:  PresenceState,
  #[serde(default)]
  pub status: Option<String>,
}

/// `PUT /users/{uuid}/presences[?tenant_uuid=<uuid>]`
pub async fn update<S>(
  State(engine): State<Engine<S>>,
  uuid: Result<Path<Uuid>, PathRejection>,
  params: Result<Query<TenantParams>, QueryRejection>,
  body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
  S: PresenceStore + 'static,
{
  let Path(uuid) = uuid?;
  let Query(params) = params?;
  let Json(body) = body?;
  engine
    .tracker
    .update_presence(params.scope(), uuid, body.state, body.status)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}
