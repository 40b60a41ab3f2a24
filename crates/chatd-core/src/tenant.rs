//! Tenant: the isolation boundary grouping users.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant mirrored from the identity service. Identity is the only tracked
/// attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant {
  pub uuid: Uuid,
}

impl Tenant {
  pub fn new(uuid: Uuid) -> Self { Self { uuid } }
}
