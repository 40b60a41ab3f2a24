//! Integration tests for `SqliteStore` against an in-memory database.

use chatd_core::{
  presence,
  reconcile::{self, reconcile},
  room::{NewMessage, NewRoom, RoomUser},
  snapshot::{Snapshot, SnapshotSession, SnapshotTenant, SnapshotUser},
  store::{PresenceStore, StoreError},
  tenant::Tenant,
  user::{NewSession, PresenceState, RefreshToken, Session, User},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store holding one tenant with one user.
async fn seeded() -> (SqliteStore, Uuid, Uuid) {
  let s = store().await;
  let tenant = Uuid::new_v4();
  let user = Uuid::new_v4();
  s.create_tenant(tenant).await.unwrap();
  s.create_user(User::new(user, tenant)).await.unwrap();
  (s, tenant, user)
}

fn core(err: Error) -> chatd_core::Error {
  err.into_core().expect("domain error")
}

// ─── Tenants ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_tenant() {
  let s = store().await;
  let uuid = Uuid::new_v4();

  let tenant = s.create_tenant(uuid).await.unwrap();
  assert_eq!(tenant, Tenant::new(uuid));
  assert_eq!(s.get_tenant(uuid).await.unwrap(), tenant);
  assert_eq!(s.list_tenants().await.unwrap(), vec![tenant]);
}

#[tokio::test]
async fn find_or_create_tenant_is_idempotent() {
  let s = store().await;
  let uuid = Uuid::new_v4();

  s.find_or_create_tenant(uuid).await.unwrap();
  s.find_or_create_tenant(uuid).await.unwrap();
  assert_eq!(s.list_tenants().await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_tenant_is_typed_not_found() {
  let s = store().await;
  let uuid = Uuid::new_v4();

  let err = core(s.get_tenant(uuid).await.unwrap_err());
  assert!(matches!(err, chatd_core::Error::UnknownTenant(id) if id == uuid));

  let err = core(s.delete_tenant(uuid).await.unwrap_err());
  assert!(err.is_not_found());
}

#[tokio::test]
async fn deleting_tenant_cascades_to_users_and_sessions() {
  let (s, tenant, user) = seeded().await;
  s.add_session(Session { uuid: Uuid::new_v4(), user_uuid: user, mobile: false })
    .await
    .unwrap();

  s.delete_tenant(tenant).await.unwrap();

  assert!(s.list_users(None).await.unwrap().is_empty());
  assert!(s.list_sessions(None).await.unwrap().is_empty());
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_user_requires_tenant() {
  let s = store().await;
  let tenant = Uuid::new_v4();

  let err = core(s.create_user(User::new(Uuid::new_v4(), tenant)).await.unwrap_err());
  assert!(matches!(err, chatd_core::Error::UnknownTenant(id) if id == tenant));
}

#[tokio::test]
async fn new_user_is_unavailable_without_status() {
  let (s, tenant, user) = seeded().await;

  let fetched = s.get_user(None, user).await.unwrap();
  assert_eq!(fetched.tenant_uuid, tenant);
  assert_eq!(fetched.state, PresenceState::Unavailable);
  assert_eq!(fetched.status, None);
}

#[tokio::test]
async fn users_are_scoped_by_tenant() {
  let (s, tenant, user) = seeded().await;
  let other = Uuid::new_v4();
  s.create_tenant(other).await.unwrap();
  s.create_user(User::new(Uuid::new_v4(), other)).await.unwrap();

  assert_eq!(s.list_users(None).await.unwrap().len(), 2);
  assert_eq!(s.count_users(None).await.unwrap(), 2);

  let scoped = s.list_users(Some(vec![tenant])).await.unwrap();
  assert_eq!(scoped.len(), 1);
  assert_eq!(scoped[0].uuid, user);
  assert_eq!(s.count_users(Some(vec![tenant])).await.unwrap(), 1);
  assert_eq!(s.count_users(Some(vec![])).await.unwrap(), 0);

  assert!(s.get_user(Some(vec![tenant]), user).await.is_ok());
  let err = core(s.get_user(Some(vec![other]), user).await.unwrap_err());
  assert!(matches!(err, chatd_core::Error::UnknownUser(id) if id == user));
}

#[tokio::test]
async fn update_user_keeps_tenant() {
  let (s, tenant, user) = seeded().await;

  let mut changed = User::new(user, Uuid::new_v4());
  changed.state = PresenceState::Invisible;
  changed.status = Some("out to lunch".into());
  let updated = s.update_user(changed).await.unwrap();

  assert_eq!(updated.tenant_uuid, tenant);
  let fetched = s.get_user(None, user).await.unwrap();
  assert_eq!(fetched, updated);
}

#[tokio::test]
async fn update_missing_user_fails() {
  let s = store().await;
  let err = core(s.update_user(User::new(Uuid::new_v4(), Uuid::new_v4())).await.unwrap_err());
  assert!(matches!(err, chatd_core::Error::UnknownUser(_)));
}

#[tokio::test]
async fn deleting_user_cascades_to_sessions_and_tokens() {
  let (s, _, user) = seeded().await;
  s.add_session(Session { uuid: Uuid::new_v4(), user_uuid: user, mobile: false })
    .await
    .unwrap();
  s.add_refresh_token(RefreshToken { client_id: "desk".into(), user_uuid: user, mobile: false })
    .await
    .unwrap();

  s.delete_user(user).await.unwrap();

  assert!(s.list_sessions(None).await.unwrap().is_empty());
  assert!(s.list_refresh_tokens(user).await.unwrap().is_empty());
  let err = core(s.delete_user(user).await.unwrap_err());
  assert!(matches!(err, chatd_core::Error::UnknownUser(id) if id == user));
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_session_is_idempotent() {
  let (s, _, user) = seeded().await;
  let session = Session { uuid: Uuid::new_v4(), user_uuid: user, mobile: true };

  s.add_session(session.clone()).await.unwrap();
  s.add_session(session.clone()).await.unwrap();

  assert_eq!(s.list_sessions(Some(user)).await.unwrap(), vec![session]);
}

#[tokio::test]
async fn add_session_for_unknown_user_fails() {
  let s = store().await;
  let user = Uuid::new_v4();
  let err = core(
    s.add_session(Session { uuid: Uuid::new_v4(), user_uuid: user, mobile: false })
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, chatd_core::Error::UnknownUser(id) if id == user));
}

#[tokio::test]
async fn remove_session_is_idempotent() {
  let (s, _, user) = seeded().await;
  let uuid = Uuid::new_v4();
  s.add_session(Session { uuid, user_uuid: user, mobile: false }).await.unwrap();

  s.remove_session(uuid).await.unwrap();
  s.remove_session(uuid).await.unwrap();
  assert!(s.list_sessions(Some(user)).await.unwrap().is_empty());
}

// ─── Refresh tokens ──────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_tokens_add_list_remove() {
  let (s, _, user) = seeded().await;
  let token = RefreshToken { client_id: "phone".into(), user_uuid: user, mobile: true };

  s.add_refresh_token(token.clone()).await.unwrap();
  s.add_refresh_token(token.clone()).await.unwrap();
  assert_eq!(s.list_refresh_tokens(user).await.unwrap(), vec![token]);

  s.remove_refresh_token("phone".into(), user).await.unwrap();
  let err = core(s.remove_refresh_token("phone".into(), user).await.unwrap_err());
  assert!(matches!(err, chatd_core::Error::UnknownRefreshToken(ref c) if c == "phone"));
}

// ─── Rooms ───────────────────────────────────────────────────────────────────

fn new_room(tenant_uuid: Uuid, members: &[Uuid]) -> NewRoom {
  NewRoom {
    tenant_uuid,
    name: Some("ops".into()),
    users: members.iter().map(|&uuid| RoomUser { uuid, tenant_uuid }).collect(),
  }
}

fn new_message(user_uuid: Uuid, tenant_uuid: Uuid, content: &str) -> NewMessage {
  NewMessage {
    user_uuid,
    tenant_uuid,
    content: content.into(),
    alias: None,
  }
}

#[tokio::test]
async fn create_room_requires_known_tenant() {
  let s = store().await;
  let tenant = Uuid::new_v4();
  let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

  let err = core(s.create_room(new_room(tenant, &[alice, bob])).await.unwrap_err());
  assert!(matches!(err, chatd_core::Error::UnknownTenant(id) if id == tenant));
  assert!(s.list_tenants().await.unwrap().is_empty());

  s.create_tenant(tenant).await.unwrap();
  let room = s.create_room(new_room(tenant, &[alice, bob])).await.unwrap();

  let fetched = s.get_room(None, room.uuid).await.unwrap();
  assert_eq!(fetched, room);
  assert!(fetched.has_member(alice) && fetched.has_member(bob));
}

#[tokio::test]
async fn rooms_are_listed_by_member_and_tenant() {
  let s = store().await;
  let tenant = Uuid::new_v4();
  let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  s.create_tenant(tenant).await.unwrap();

  let ab = s.create_room(new_room(tenant, &[alice, bob])).await.unwrap();
  let bc = s.create_room(new_room(tenant, &[bob, carol])).await.unwrap();

  let for_alice = s.list_rooms(None, Some(alice)).await.unwrap();
  assert_eq!(for_alice.iter().map(|r| r.uuid).collect::<Vec<_>>(), vec![ab.uuid]);

  let for_bob = s.list_rooms(Some(vec![tenant]), Some(bob)).await.unwrap();
  assert_eq!(for_bob.iter().map(|r| r.uuid).collect::<Vec<_>>(), vec![ab.uuid, bc.uuid]);

  assert!(s.list_rooms(Some(vec![Uuid::new_v4()]), Some(bob)).await.unwrap().is_empty());
  let err = core(s.get_room(Some(vec![Uuid::new_v4()]), ab.uuid).await.unwrap_err());
  assert!(matches!(err, chatd_core::Error::UnknownRoom(id) if id == ab.uuid));
}

#[tokio::test]
async fn messages_are_returned_oldest_first() {
  let s = store().await;
  let tenant = Uuid::new_v4();
  let alice = Uuid::new_v4();
  s.create_tenant(tenant).await.unwrap();
  let room = s.create_room(new_room(tenant, &[alice])).await.unwrap();

  let (_, first) = s.create_message(room.uuid, new_message(alice, tenant, "one")).await.unwrap();
  let (after, second) =
    s.create_message(room.uuid, new_message(alice, tenant, "two")).await.unwrap();

  assert!(first.created_at <= second.created_at);
  assert_eq!(after.messages, vec![first.clone(), second.clone()]);
  assert_eq!(s.list_messages(room.uuid).await.unwrap(), vec![first, second]);
}

#[tokio::test]
async fn message_to_missing_room_fails() {
  let s = store().await;
  let room = Uuid::new_v4();

  let err = core(
    s.create_message(room, new_message(Uuid::new_v4(), Uuid::new_v4(), "hi"))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, chatd_core::Error::UnknownRoom(id) if id == room));
  assert!(core(s.list_messages(room).await.unwrap_err()).is_not_found());
}

// ─── Transactions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_transaction_leaves_no_trace() {
  let s = store().await;
  let tenant = Uuid::new_v4();

  let result = s
    .transaction(move |tx| {
      tx.insert_tenant(&Tenant::new(tenant))?;
      // Violates the users → tenants foreign key.
      tx.insert_user(&User::new(Uuid::new_v4(), Uuid::new_v4()))
    })
    .await;

  assert!(result.is_err());
  assert!(s.list_tenants().await.unwrap().is_empty());
}

#[tokio::test]
async fn error_after_reconcile_rolls_back_everything() {
  let s = store().await;
  let snapshot = snapshot_of(Uuid::new_v4(), Uuid::new_v4(), &[Uuid::new_v4()]);

  let result = s
    .transaction(move |tx| {
      reconcile(tx, &snapshot)?;
      Err::<(), _>(chatd_core::Error::UpstreamUnavailable("aborted".into()))
    })
    .await;

  assert!(matches!(core(result.unwrap_err()), chatd_core::Error::UpstreamUnavailable(_)));
  assert!(s.list_tenants().await.unwrap().is_empty());
  assert!(s.list_users(None).await.unwrap().is_empty());
  assert!(s.list_sessions(None).await.unwrap().is_empty());
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

fn snapshot_of(tenant: Uuid, user: Uuid, sessions: &[Uuid]) -> Snapshot {
  Snapshot {
    tenants:  vec![SnapshotTenant { uuid: tenant }],
    users:    vec![SnapshotUser { uuid: user, tenant_uuid: tenant }],
    sessions: sessions
      .iter()
      .map(|&uuid| SnapshotSession { uuid, user_uuid: user, tenant_uuid: tenant, mobile: false })
      .collect(),
  }
}

async fn apply(s: &SqliteStore, snapshot: Snapshot) -> reconcile::AppliedChanges {
  s.transaction(move |tx| reconcile(tx, &snapshot)).await.unwrap()
}

#[tokio::test]
async fn reconcile_populates_empty_store() {
  let s = store().await;
  let (t1, u1, s1) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  let applied = apply(&s, snapshot_of(t1, u1, &[s1])).await;
  assert_eq!(applied.created_tenants, vec![t1]);
  assert_eq!(applied.created_users.len(), 1);
  assert_eq!(applied.created_sessions, vec![s1]);

  assert_eq!(s.list_tenants().await.unwrap(), vec![Tenant::new(t1)]);
  let user = s.get_user(None, u1).await.unwrap();
  assert_eq!(user.tenant_uuid, t1);
  assert_eq!(user.state, PresenceState::Unavailable);
  let sessions = s.list_sessions(Some(u1)).await.unwrap();
  assert_eq!(sessions.iter().map(|s| s.uuid).collect::<Vec<_>>(), vec![s1]);
}

#[tokio::test]
async fn reconcile_removes_stale_session_without_touching_state() {
  let s = store().await;
  let (t1, u1, s1, s2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  apply(&s, snapshot_of(t1, u1, &[s1, s2])).await;

  let mut user = s.get_user(None, u1).await.unwrap();
  user.state = PresenceState::Available;
  s.update_user(user).await.unwrap();

  let applied = apply(&s, snapshot_of(t1, u1, &[s1])).await;
  assert_eq!(applied.deleted_sessions, vec![s2]);
  assert_eq!(applied.total(), 1);

  let sessions = s.list_sessions(Some(u1)).await.unwrap();
  assert_eq!(sessions.iter().map(|s| s.uuid).collect::<Vec<_>>(), vec![s1]);
  assert_eq!(s.get_user(None, u1).await.unwrap().state, PresenceState::Available);
}

#[tokio::test]
async fn reconcile_converges() {
  let s = store().await;
  let (t1, u1) = (Uuid::new_v4(), Uuid::new_v4());
  let snapshot = snapshot_of(t1, u1, &[Uuid::new_v4(), Uuid::new_v4()]);

  assert!(!apply(&s, snapshot.clone()).await.is_empty());
  assert!(apply(&s, snapshot).await.is_empty());
}

#[tokio::test]
async fn reconcile_deletes_vanished_tenant_with_its_users() {
  let s = store().await;
  let (t1, u1) = (Uuid::new_v4(), Uuid::new_v4());
  let (t2, u2) = (Uuid::new_v4(), Uuid::new_v4());
  apply(&s, snapshot_of(t1, u1, &[Uuid::new_v4()])).await;
  apply(&s, {
    let mut both = snapshot_of(t1, u1, &[]);
    both.tenants.push(SnapshotTenant { uuid: t2 });
    both.users.push(SnapshotUser { uuid: u2, tenant_uuid: t2 });
    both
  })
  .await;

  let applied = apply(&s, snapshot_of(t2, u2, &[])).await;
  assert_eq!(applied.deleted_tenants, vec![t1]);

  assert_eq!(s.list_tenants().await.unwrap(), vec![Tenant::new(t2)]);
  let users = s.list_users(None).await.unwrap();
  assert_eq!(users.iter().map(|u| u.uuid).collect::<Vec<_>>(), vec![u2]);
}

#[tokio::test]
async fn reconcile_recreates_user_that_changed_tenant() {
  let s = store().await;
  let (t1, t2, u1) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  apply(&s, snapshot_of(t1, u1, &[])).await;

  let mut user = s.get_user(None, u1).await.unwrap();
  user.state = PresenceState::Invisible;
  s.update_user(user).await.unwrap();

  let mut moved = snapshot_of(t2, u1, &[]);
  moved.tenants.push(SnapshotTenant { uuid: t1 });
  let applied = apply(&s, moved).await;
  assert_eq!(applied.recreated_users.len(), 1);

  let user = s.get_user(None, u1).await.unwrap();
  assert_eq!(user.tenant_uuid, t2);
  assert_eq!(user.state, PresenceState::Unavailable);
}

#[tokio::test]
async fn reconcile_corrects_mobile_flag_in_place() {
  let s = store().await;
  let (t1, u1, s1) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  apply(&s, snapshot_of(t1, u1, &[s1])).await;

  let mut mobile = snapshot_of(t1, u1, &[s1]);
  mobile.sessions[0].mobile = true;
  let applied = apply(&s, mobile).await;

  assert_eq!(applied.updated_sessions, vec![s1]);
  assert!(s.list_sessions(Some(u1)).await.unwrap()[0].mobile);
}

#[tokio::test]
async fn reconcile_recreates_session_that_changed_owner() {
  let s = store().await;
  let (t1, u1, u2, s1) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  apply(&s, snapshot_of(t1, u1, &[s1])).await;

  let moved = Snapshot {
    tenants:  vec![SnapshotTenant { uuid: t1 }],
    users:    vec![
      SnapshotUser { uuid: u1, tenant_uuid: t1 },
      SnapshotUser { uuid: u2, tenant_uuid: t1 },
    ],
    sessions: vec![SnapshotSession { uuid: s1, user_uuid: u2, tenant_uuid: t1, mobile: false }],
  };
  let applied = apply(&s, moved).await;

  assert_eq!(applied.recreated_sessions, vec![s1]);
  assert!(applied.created_sessions.is_empty());
  assert!(applied.deleted_sessions.is_empty());
  assert!(s.list_sessions(Some(u1)).await.unwrap().is_empty());
  let owned = s.list_sessions(Some(u2)).await.unwrap();
  assert_eq!(owned.len(), 1);
  assert_eq!(owned[0].uuid, s1);
}

#[tokio::test]
async fn reconcile_empty_snapshot_clears_store() {
  let s = store().await;
  apply(&s, snapshot_of(Uuid::new_v4(), Uuid::new_v4(), &[Uuid::new_v4()])).await;

  apply(&s, Snapshot::default()).await;
  assert!(s.list_tenants().await.unwrap().is_empty());
  assert!(s.list_users(None).await.unwrap().is_empty());
  assert!(s.list_sessions(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn incremental_user_created_recreates_on_tenant_change() {
  let (s, tenant, user) = seeded().await;

  let same = s
    .transaction(move |tx| reconcile::user_created(tx, user, tenant))
    .await
    .unwrap();
  assert!(same.is_none());

  let other = Uuid::new_v4();
  let moved = s
    .transaction(move |tx| reconcile::user_created(tx, user, other))
    .await
    .unwrap();
  assert_eq!(moved.map(|u| u.tenant_uuid), Some(other));
  assert!(s.get_tenant(other).await.is_ok());
}

// ─── Presence derivation ─────────────────────────────────────────────────────

fn new_session(user_uuid: Uuid, tenant_uuid: Uuid) -> NewSession {
  NewSession { uuid: Uuid::new_v4(), user_uuid, tenant_uuid, mobile: false }
}

#[tokio::test]
async fn first_session_makes_user_available_and_last_makes_unavailable() {
  let (s, tenant, user) = seeded().await;
  let first = new_session(user, tenant);
  let second = new_session(user, tenant);

  let added = first.clone();
  let change = s
    .transaction(move |tx| presence::add_session(tx, &added))
    .await
    .unwrap()
    .expect("new session");
  assert_eq!(change.user.state, PresenceState::Available);
  assert_eq!(change.edge, Some(presence::Edge::Connected));

  let change = s
    .transaction(move |tx| presence::add_session(tx, &second))
    .await
    .unwrap()
    .expect("new session");
  assert_eq!(change.edge, None);
  assert_eq!(change.sessions.len(), 2);

  let second_uuid = change.sessions.iter().map(|s| s.uuid).find(|&u| u != first.uuid).unwrap();
  let change = s
    .transaction(move |tx| presence::remove_session(tx, second_uuid))
    .await
    .unwrap()
    .expect("known session");
  assert_eq!(change.user.state, PresenceState::Available);

  let first_uuid = first.uuid;
  let change = s
    .transaction(move |tx| presence::remove_session(tx, first_uuid))
    .await
    .unwrap()
    .expect("known session");
  assert_eq!(change.edge, Some(presence::Edge::Disconnected));
  assert_eq!(s.get_user(None, user).await.unwrap().state, PresenceState::Unavailable);
}

#[tokio::test]
async fn redelivered_session_events_are_no_ops() {
  let (s, tenant, user) = seeded().await;
  let session = new_session(user, tenant);
  let uuid = session.uuid;

  let again = session.clone();
  s.transaction(move |tx| presence::add_session(tx, &session)).await.unwrap();
  let dup = s.transaction(move |tx| presence::add_session(tx, &again)).await.unwrap();
  assert!(dup.is_none());

  s.transaction(move |tx| presence::remove_session(tx, uuid)).await.unwrap();
  let dup = s.transaction(move |tx| presence::remove_session(tx, uuid)).await.unwrap();
  assert!(dup.is_none());
}

#[tokio::test]
async fn invisible_survives_session_churn() {
  let (s, tenant, user) = seeded().await;
  s.transaction(move |tx| {
    presence::update_presence(tx, None, user, PresenceState::Invisible, None)
  })
  .await
  .unwrap();

  let session = new_session(user, tenant);
  let uuid = session.uuid;
  let change = s
    .transaction(move |tx| presence::add_session(tx, &session))
    .await
    .unwrap()
    .expect("new session");
  assert_eq!(change.user.state, PresenceState::Invisible);

  s.transaction(move |tx| presence::remove_session(tx, uuid)).await.unwrap();
  assert_eq!(s.get_user(None, user).await.unwrap().state, PresenceState::Invisible);
}

#[tokio::test]
async fn session_for_unknown_user_creates_user_and_tenant() {
  let s = store().await;
  let (tenant, user) = (Uuid::new_v4(), Uuid::new_v4());
  let session = new_session(user, tenant);

  let change = s
    .transaction(move |tx| presence::add_session(tx, &session))
    .await
    .unwrap()
    .expect("new session");
  assert!(change.user_created);
  assert_eq!(change.user.state, PresenceState::Available);
  assert!(s.get_tenant(tenant).await.is_ok());
}

#[tokio::test]
async fn update_presence_respects_tenant_scope() {
  let (s, _, user) = seeded().await;
  let other = Uuid::new_v4();

  let result = s
    .transaction(move |tx| {
      presence::update_presence(tx, Some(&[other][..]), user, PresenceState::Available, None)
    })
    .await;
  assert!(matches!(core(result.unwrap_err()), chatd_core::Error::UnknownUser(id) if id == user));
}

#[tokio::test]
async fn mobile_refresh_token_marks_sessions_mobile() {
  let (s, tenant, user) = seeded().await;
  let session = new_session(user, tenant);
  s.transaction(move |tx| presence::add_session(tx, &session)).await.unwrap();

  let token = RefreshToken { client_id: "phone".into(), user_uuid: user, mobile: true };
  let change = s
    .transaction(move |tx| presence::add_refresh_token(tx, &token, tenant))
    .await
    .unwrap()
    .expect("new token");
  assert!(change.sessions.iter().all(|s| s.mobile));

  // New sessions inherit the flag while the token lives.
  let later = new_session(user, tenant);
  let change = s
    .transaction(move |tx| presence::add_session(tx, &later))
    .await
    .unwrap()
    .expect("new session");
  assert!(change.sessions.iter().all(|s| s.mobile));

  let change = s
    .transaction(move |tx| presence::remove_refresh_token(tx, "phone", user))
    .await
    .unwrap()
    .expect("known token");
  assert!(change.sessions.iter().all(|s| !s.mobile));
}
