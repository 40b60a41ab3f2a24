//! Session tracking and derived presence state.
//!
//! A user's availability is re-derived only when its session set crosses the
//! empty/non-empty boundary. That boundary is modelled by [`Occupancy`], which
//! is kept apart from the three-valued [`PresenceState`] so that non-edge
//! churn (2 → 1 sessions, say) can never clobber a manual override.
//!
//! Every function here runs inside one store transaction and returns `None`
//! when the event was a no-op, so callers publish nothing for redeliveries.

use uuid::Uuid;

use crate::{
  Result,
  store::{StoreTx, ensure_user, has_mobile_token, scoped_user},
  user::{NewSession, PresenceState, RefreshToken, Session, User, UserPresence},
};

// ─── Occupancy machine ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
  NoSessions,
  HasSessions,
}

/// A transition of [`Occupancy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
  /// 0 → ≥1 sessions.
  Connected,
  /// ≥1 → 0 sessions.
  Disconnected,
}

impl Occupancy {
  pub fn from_count(count: usize) -> Self {
    if count == 0 { Self::NoSessions } else { Self::HasSessions }
  }

  /// The edge crossed going from `self` to `next`, if any.
  pub fn edge_to(self, next: Occupancy) -> Option<Edge> {
    match (self, next) {
      (Self::NoSessions, Self::HasSessions) => Some(Edge::Connected),
      (Self::HasSessions, Self::NoSessions) => Some(Edge::Disconnected),
      _ => None,
    }
  }
}

impl PresenceState {
  /// The state after crossing `edge`. `Invisible` survives every edge.
  pub fn on_edge(self, edge: Edge) -> Self {
    match (self, edge) {
      (Self::Invisible, _) => Self::Invisible,
      (_, Edge::Connected) => Self::Available,
      (_, Edge::Disconnected) => Self::Unavailable,
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What a committed presence mutation did to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
  /// The user after the mutation.
  pub user:         User,
  /// The user's sessions after the mutation.
  pub sessions:     Vec<Session>,
  /// The user did not exist and was created by this mutation.
  pub user_created: bool,
  pub edge:         Option<Edge>,
}

impl PresenceChange {
  pub fn presence(&self) -> UserPresence { UserPresence::new(&self.user, &self.sessions) }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Apply a session-added event. Creates the tenant and user first when
/// missing. Returns `None` if the session already exists.
pub fn add_session(
  tx: &mut dyn StoreTx,
  new: &NewSession,
) -> Result<Option<PresenceChange>> {
  if tx.get_session(new.uuid)?.is_some() {
    tracing::debug!(session = %new.uuid, "session already tracked");
    return Ok(None);
  }

  let (user, user_created) = ensure_user(tx, new.user_uuid, new.tenant_uuid)?;
  let before = Occupancy::from_count(tx.count_sessions(user.uuid)?);

  let mut session = new.session();
  session.mobile |= has_mobile_token(tx, user.uuid)?;
  tx.insert_session(&session)?;

  let change = rederive(tx, user, before, user_created)?;
  Ok(Some(change))
}

/// Apply a session-removed event. Returns `None` if the session is unknown.
pub fn remove_session(
  tx: &mut dyn StoreTx,
  uuid: Uuid,
) -> Result<Option<PresenceChange>> {
  let Some(session) = tx.get_session(uuid)? else {
    tracing::debug!(session = %uuid, "session already gone");
    return Ok(None);
  };
  let Some(user) = tx.get_user(session.user_uuid)? else {
    // Unreachable while foreign keys hold; drop the orphan regardless.
    tx.delete_session(uuid)?;
    return Ok(None);
  };

  let before = Occupancy::from_count(tx.count_sessions(user.uuid)?);
  tx.delete_session(uuid)?;

  let change = rederive(tx, user, before, false)?;
  Ok(Some(change))
}

/// Manually set a user's state and status, regardless of session count.
pub fn update_presence(
  tx: &mut dyn StoreTx,
  tenant_uuids: Option<&[Uuid]>,
  uuid: Uuid,
  state: PresenceState,
  status: Option<String>,
) -> Result<PresenceChange> {
  let mut user = scoped_user(tx, tenant_uuids, uuid)?;
  user.state = state;
  user.status = status;
  tx.update_user(&user)?;

  let sessions = tx.list_sessions(Some(uuid))?;
  Ok(PresenceChange { user, sessions, user_created: false, edge: None })
}

/// Record a refresh token. A mobile token marks every session of the user as
/// mobile. Returns `None` if the token already exists.
pub fn add_refresh_token(
  tx: &mut dyn StoreTx,
  token: &RefreshToken,
  tenant_uuid: Uuid,
) -> Result<Option<PresenceChange>> {
  if tx.get_refresh_token(&token.client_id, token.user_uuid)?.is_some() {
    return Ok(None);
  }

  let (user, user_created) = ensure_user(tx, token.user_uuid, tenant_uuid)?;
  tx.insert_refresh_token(token)?;
  if token.mobile {
    set_sessions_mobile(tx, user.uuid, true)?;
  }

  let sessions = tx.list_sessions(Some(user.uuid))?;
  Ok(Some(PresenceChange { user, sessions, user_created, edge: None }))
}

/// Forget a refresh token. Sessions lose their mobile flag once no mobile
/// token remains. Returns `None` if the token is unknown.
pub fn remove_refresh_token(
  tx: &mut dyn StoreTx,
  client_id: &str,
  user_uuid: Uuid,
) -> Result<Option<PresenceChange>> {
  let Some(token) = tx.get_refresh_token(client_id, user_uuid)? else {
    return Ok(None);
  };
  tx.delete_refresh_token(client_id, user_uuid)?;

  if token.mobile && !has_mobile_token(tx, user_uuid)? {
    set_sessions_mobile(tx, user_uuid, false)?;
  }

  let Some(user) = tx.get_user(user_uuid)? else {
    return Ok(None);
  };
  let sessions = tx.list_sessions(Some(user_uuid))?;
  Ok(Some(PresenceChange { user, sessions, user_created: false, edge: None }))
}

/// The presence of every user visible within `tenant_uuids`.
pub fn list_presences(
  tx: &mut dyn StoreTx,
  tenant_uuids: Option<&[Uuid]>,
) -> Result<Vec<UserPresence>> {
  let users = tx.list_users(tenant_uuids)?;
  users.iter().map(|user| user_presence(tx, user)).collect()
}

/// The presence of `user` as currently stored.
pub fn user_presence(tx: &mut dyn StoreTx, user: &User) -> Result<UserPresence> {
  let sessions = tx.list_sessions(Some(user.uuid))?;
  Ok(UserPresence::new(user, &sessions))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Recount sessions and apply the state rule if an occupancy edge was crossed.
fn rederive(
  tx: &mut dyn StoreTx,
  mut user: User,
  before: Occupancy,
  user_created: bool,
) -> Result<PresenceChange> {
  let sessions = tx.list_sessions(Some(user.uuid))?;
  let edge = before.edge_to(Occupancy::from_count(sessions.len()));

  if let Some(edge) = edge {
    let next = user.state.on_edge(edge);
    if next != user.state {
      tracing::debug!(user = %user.uuid, from = %user.state, to = %next, ?edge, "presence state derived");
      user.state = next;
      tx.update_user(&user)?;
    }
  }

  Ok(PresenceChange { user, sessions, user_created, edge })
}

fn set_sessions_mobile(tx: &mut dyn StoreTx, user_uuid: Uuid, mobile: bool) -> Result<()> {
  for mut session in tx.list_sessions(Some(user_uuid))? {
    if session.mobile != mobile {
      session.mobile = mobile;
      tx.update_session(&session)?;
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_boundary_crossings_are_edges() {
    use Occupancy::*;
    assert_eq!(NoSessions.edge_to(HasSessions), Some(Edge::Connected));
    assert_eq!(HasSessions.edge_to(NoSessions), Some(Edge::Disconnected));
    assert_eq!(HasSessions.edge_to(HasSessions), None);
    assert_eq!(NoSessions.edge_to(NoSessions), None);
  }

  #[test]
  fn occupancy_from_count() {
    assert_eq!(Occupancy::from_count(0), Occupancy::NoSessions);
    assert_eq!(Occupancy::from_count(1), Occupancy::HasSessions);
    assert_eq!(Occupancy::from_count(7), Occupancy::HasSessions);
  }

  #[test]
  fn connecting_makes_available() {
    assert_eq!(PresenceState::Unavailable.on_edge(Edge::Connected), PresenceState::Available);
    assert_eq!(PresenceState::Available.on_edge(Edge::Connected), PresenceState::Available);
  }

  #[test]
  fn disconnecting_makes_unavailable() {
    assert_eq!(PresenceState::Available.on_edge(Edge::Disconnected), PresenceState::Unavailable);
    assert_eq!(
      PresenceState::Unavailable.on_edge(Edge::Disconnected),
      PresenceState::Unavailable
    );
  }

  #[test]
  fn invisible_survives_every_edge() {
    assert_eq!(PresenceState::Invisible.on_edge(Edge::Connected), PresenceState::Invisible);
    assert_eq!(PresenceState::Invisible.on_edge(Edge::Disconnected), PresenceState::Invisible);
  }
}
