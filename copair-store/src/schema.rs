//! SQL schema for the local mirror database

/// Database schema version
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the mirror database.
///
/// Each entity table stores the canonical JSON document plus the columns
/// the engine filters on. `dirty` marks rows written while offline that
/// still await reconciliation with the remote store.
pub const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    role TEXT NOT NULL,
    doc TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
CREATE INDEX IF NOT EXISTS idx_users_dirty ON users(dirty) WHERE dirty = 1;

CREATE TABLE IF NOT EXISTS assignments (
    id TEXT PRIMARY KEY,
    guardian_id TEXT NOT NULL,
    tutor_id TEXT NOT NULL,
    status TEXT NOT NULL,
    doc TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assignments_pair ON assignments(guardian_id, tutor_id);
CREATE INDEX IF NOT EXISTS idx_assignments_status ON assignments(status);

CREATE TABLE IF NOT EXISTS relations (
    id TEXT PRIMARY KEY,
    guardian_id TEXT NOT NULL,
    tutor_id TEXT NOT NULL,
    status TEXT NOT NULL,
    doc TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relations_pair ON relations(guardian_id, tutor_id);
CREATE INDEX IF NOT EXISTS idx_relations_status ON relations(status);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    sender_id TEXT NOT NULL,
    recipient_id TEXT NOT NULL,
    doc TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id);
CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient_id);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    doc TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
"#;
