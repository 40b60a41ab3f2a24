//! Users and the records that hang off them: sessions and refresh tokens.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── State ───────────────────────────────────────────────────────────────────

/// A user's availability classification.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PresenceState {
  Available,
  #[default]
  Unavailable,
  /// Manual override; session churn never clears it.
  Invisible,
}

impl PresenceState {
  /// The string stored in the `state` column and sent on the wire.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Available => "available",
      Self::Unavailable => "unavailable",
      Self::Invisible => "invisible",
    }
  }
}

impl fmt::Display for PresenceState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PresenceState {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "available" => Ok(Self::Available),
      "unavailable" => Ok(Self::Unavailable),
      "invisible" => Ok(Self::Invisible),
      other => Err(Error::UnknownState(other.to_owned())),
    }
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A user mirrored from the directory, with its local presence fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub uuid:        Uuid,
  /// Immutable after creation.
  pub tenant_uuid: Uuid,
  pub state:       PresenceState,
  pub status:      Option<String>,
}

impl User {
  /// A freshly discovered user: `unavailable`, no status.
  pub fn new(uuid: Uuid, tenant_uuid: Uuid) -> Self {
    Self {
      uuid,
      tenant_uuid,
      state: PresenceState::default(),
      status: None,
    }
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub uuid:      Uuid,
  pub user_uuid: Uuid,
  #[serde(default)]
  pub mobile:    bool,
}

/// A session as announced by the identity service: it names its owner's
/// tenant so a missing user can be created on the spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
  pub uuid:        Uuid,
  pub user_uuid:   Uuid,
  pub tenant_uuid: Uuid,
  #[serde(default)]
  pub mobile:      bool,
}

impl NewSession {
  pub fn session(&self) -> Session {
    Session {
      uuid:      self.uuid,
      user_uuid: self.user_uuid,
      mobile:    self.mobile,
    }
  }
}

// ─── Refresh token ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
  pub client_id: String,
  pub user_uuid: Uuid,
  #[serde(default)]
  pub mobile:    bool,
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// A session as shown inside a presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPresence {
  pub uuid:   Uuid,
  pub mobile: bool,
}

/// The presence of one user: state, status and active sessions. This is the
/// payload of presence events and of the presence HTTP endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresence {
  pub uuid:        Uuid,
  pub tenant_uuid: Uuid,
  pub state:       PresenceState,
  pub status:      Option<String>,
  pub sessions:    Vec<SessionPresence>,
}

impl UserPresence {
  pub fn new(user: &User, sessions: &[Session]) -> Self {
    Self {
      uuid:        user.uuid,
      tenant_uuid: user.tenant_uuid,
      state:       user.state,
      status:      user.status.clone(),
      sessions:    sessions
        .iter()
        .map(|s| SessionPresence { uuid: s.uuid, mobile: s.mobile })
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn state_round_trips_through_str() {
    for state in [
      PresenceState::Available,
      PresenceState::Unavailable,
      PresenceState::Invisible,
    ] {
      assert_eq!(state.as_str().parse::<PresenceState>().unwrap(), state);
    }
  }

  #[test]
  fn unknown_state_is_rejected() {
    let err = "away".parse::<PresenceState>().unwrap_err();
    assert!(matches!(err, Error::UnknownState(s) if s == "away"));
  }

  #[test]
  fn new_user_is_unavailable() {
    let user = User::new(Uuid::new_v4(), Uuid::new_v4());
    assert_eq!(user.state, PresenceState::Unavailable);
    assert!(user.status.is_none());
  }
}
