//! Point-in-time listings of the external directory, and the trait that
//! produces them.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTenant {
  pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotUser {
  pub uuid:        Uuid,
  pub tenant_uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSession {
  pub uuid:        Uuid,
  pub user_uuid:   Uuid,
  pub tenant_uuid: Uuid,
  #[serde(default)]
  pub mobile:      bool,
}

/// Everything the directory knows about, at one instant. Assumed internally
/// consistent, but [`crate::reconcile`] tolerates sessions and users whose
/// parents are missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  #[serde(default)]
  pub tenants:  Vec<SnapshotTenant>,
  #[serde(default)]
  pub users:    Vec<SnapshotUser>,
  #[serde(default)]
  pub sessions: Vec<SnapshotSession>,
}

impl Snapshot {
  pub fn is_empty(&self) -> bool {
    self.tenants.is_empty() && self.users.is_empty() && self.sessions.is_empty()
  }
}

/// Source of full directory snapshots.
///
/// Implementations fail with [`crate::Error::UpstreamUnavailable`] when the
/// external services cannot be reached.
pub trait SnapshotFetcher: Send + Sync {
  fn fetch_all(&self) -> impl Future<Output = Result<Snapshot>> + Send + '_;
}
