//! `POST /events`: ingress for live directory events.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
};
use chatd_core::store::PresenceStore;
use chatd_engine::{DirectoryEvent, Engine};

use crate::error::ApiError;

/// Body: a [`DirectoryEvent`], e.g.
/// `{"name":"session_deleted","data":{"uuid":"..."}}`. Returns 204.
pub async fn handler<S>(
  State(engine): State<Engine<S>>,
  body: Result<Json<DirectoryEvent>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
  S: PresenceStore + 'static,
{
  let Json(event) = body?;
  engine.handle(event).await?;
  Ok(StatusCode::NO_CONTENT)
}
