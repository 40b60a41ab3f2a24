//! Inbound directory events, as delivered by the identity services.

use chatd_core::user::NewSession;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A live change in the external directory.
///
/// Serialised as `{"name": "<snake_case variant>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "snake_case")]
pub enum DirectoryEvent {
  SessionCreated(NewSession),
  SessionDeleted {
    uuid: Uuid,
  },
  TenantCreated {
    uuid: Uuid,
  },
  TenantDeleted {
    uuid: Uuid,
  },
  UserCreated {
    uuid:        Uuid,
    tenant_uuid: Uuid,
  },
  UserDeleted {
    uuid: Uuid,
  },
  RefreshTokenCreated {
    client_id:   String,
    user_uuid:   Uuid,
    tenant_uuid: Uuid,
    #[serde(default)]
    mobile:      bool,
  },
  RefreshTokenDeleted {
    client_id: String,
    user_uuid: Uuid,
  },
}

impl DirectoryEvent {
  pub fn name(&self) -> &'static str {
    match self {
      Self::SessionCreated(_) => "session_created",
      Self::SessionDeleted { .. } => "session_deleted",
      Self::TenantCreated { .. } => "tenant_created",
      Self::TenantDeleted { .. } => "tenant_deleted",
      Self::UserCreated { .. } => "user_created",
      Self::UserDeleted { .. } => "user_deleted",
      Self::RefreshTokenCreated { .. } => "refresh_token_created",
      Self::RefreshTokenDeleted { .. } => "refresh_token_deleted",
    }
  }
}
