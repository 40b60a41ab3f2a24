//! SQL schema for the chatd SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Ownership cascades (tenant → users, rooms; user → sessions, refresh tokens;
/// room → memberships, messages) are expressed as `ON DELETE CASCADE`, so
/// callers never delete children by hand.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tenants (
    uuid TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS users (
    uuid        TEXT PRIMARY KEY,
    tenant_uuid TEXT NOT NULL REFERENCES tenants(uuid) ON DELETE CASCADE,
    state       TEXT NOT NULL DEFAULT 'unavailable'
                CHECK (state IN ('available', 'unavailable', 'invisible')),
    status      TEXT
);

CREATE TABLE IF NOT EXISTS sessions (
    uuid      TEXT PRIMARY KEY,
    user_uuid TEXT NOT NULL REFERENCES users(uuid) ON DELETE CASCADE,
    mobile    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS refresh_tokens (
    client_id TEXT NOT NULL,
    user_uuid TEXT NOT NULL REFERENCES users(uuid) ON DELETE CASCADE,
    mobile    INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (client_id, user_uuid)
);

CREATE TABLE IF NOT EXISTS rooms (
    uuid        TEXT PRIMARY KEY,
    tenant_uuid TEXT NOT NULL REFERENCES tenants(uuid) ON DELETE CASCADE,
    name        TEXT
);

-- Members are not tied to the users table: a room outlives a member's
-- local presence record.
CREATE TABLE IF NOT EXISTS room_users (
    room_uuid   TEXT NOT NULL REFERENCES rooms(uuid) ON DELETE CASCADE,
    uuid        TEXT NOT NULL,
    tenant_uuid TEXT NOT NULL,
    PRIMARY KEY (room_uuid, uuid)
);

-- Append-only.
CREATE TABLE IF NOT EXISTS room_messages (
    uuid        TEXT PRIMARY KEY,
    room_uuid   TEXT NOT NULL REFERENCES rooms(uuid) ON DELETE CASCADE,
    user_uuid   TEXT NOT NULL,
    tenant_uuid TEXT NOT NULL,
    content     TEXT NOT NULL,
    alias       TEXT,
    created_at  TEXT NOT NULL   -- RFC 3339 UTC, fixed width; server-assigned
);

CREATE INDEX IF NOT EXISTS users_tenant_idx          ON users(tenant_uuid);
CREATE INDEX IF NOT EXISTS sessions_user_idx         ON sessions(user_uuid);
CREATE INDEX IF NOT EXISTS refresh_tokens_user_idx   ON refresh_tokens(user_uuid);
CREATE INDEX IF NOT EXISTS rooms_tenant_idx          ON rooms(tenant_uuid);
CREATE INDEX IF NOT EXISTS room_users_user_idx       ON room_users(uuid);
CREATE INDEX IF NOT EXISTS room_messages_created_idx ON room_messages(room_uuid, created_at);

PRAGMA user_version = 1;
";
